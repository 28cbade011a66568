//! Callable values: host‑provided natives and user‑defined functions.
//!
//! A [`LoxFunction`] pairs a declaration with the environment that was active
//! when the declaration executed — its closure.  Method lookup produces a
//! fresh *bound* copy per access via [`LoxFunction::bind`]; bound methods are
//! never cached on the instance.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::parser::FunctionDecl;
use crate::value::Value;

/// A host‑provided function injected into the global scope.  The function
/// pointer receives the interpreter so natives like `print` can reach the
/// output sink; it must never unwind a guest `return` across this boundary.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&mut Interpreter, &[Value]) -> Result<Value, String>,
}

/// A user‑defined function or method.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure is extended with a `this`
    /// binding for `instance`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction::new(self.declaration.clone(), environment, self.is_initializer)
    }

    /// Invoke the function: bind parameters in a fresh environment parented
    /// at the closure, run the body, and catch the return signal here — it
    /// unwinds exactly to this frame and no further.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> IResult<Value> {
        debug!(
            "Calling <fn {}> with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment
                .borrow_mut()
                .define(&param.lexeme, argument.clone());
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(InterpretError::Return(value)) => {
                if self.is_initializer {
                    // the resolver rejects `return <expr>` in initializers;
                    // a bare `return` still yields the instance
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }

            Err(error) => Err(error),
        }
    }

    fn bound_this(&self) -> Value {
        self.closure
            .borrow()
            .get_at(0, "this")
            .expect("initializer closure always binds 'this'")
    }
}
