//! Tree‑walking evaluator.
//!
//! Executes a resolved statement sequence against a fresh global environment
//! pre‑populated with the native callables (`clock`, `print`).  Variable
//! references resolved as locals jump exactly `distance` parents up the
//! active scope chain via the side table the resolver filled in; everything
//! else is a global and goes straight to the outermost environment.
//!
//! The only non‑local control transfer is the return signal: a distinguished
//! [`InterpretError::Return`] variant flowing back through `Result`, checked
//! and propagated by every statement executor and caught exactly at the
//! enclosing function invocation.  It never crosses a native boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::process;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

use crate::callable::NativeFunction;
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Result carrier for statement execution and expression evaluation.
/// `Return` is not a failure: it is the early‑exit signal a function call
/// frame consumes.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Error(#[from] LoxError),

    #[error("return {0}")]
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

/// Coerce an `exit` operand to a process exit code.  A number rounds to the
/// nearest integer when that integer fits an `i32`; anything else — a
/// non-number value, NaN, an infinity, or an out-of-range number — falls
/// back to -1.
pub fn exit_code(value: &Value) -> i32 {
    match value {
        Value::Number(n) => {
            let rounded = n.round();

            if rounded.is_finite() && rounded >= i32::MIN as f64 && rounded <= i32::MAX as f64 {
                rounded as i32
            } else {
                -1
            }
        }

        _ => -1,
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    /// Creates a new Interpreter writing `print` output to `output`, with
    /// the native functions bound in the fresh global scope.
    pub fn new(output: Rc<RefCell<dyn Write>>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: |_interpreter, _arguments| {
                    Ok(Value::Number(Utc::now().timestamp_micros() as f64 / 1000.0))
                },
            })),
        );

        globals.borrow_mut().define(
            "print",
            Value::Native(Rc::new(NativeFunction {
                name: "print",
                arity: 1,
                func: |interpreter, arguments| {
                    interpreter
                        .write_line(&arguments[0])
                        .map_err(|e| format!("Output error: {}", e))?;

                    Ok(Value::Nil)
                },
            })),
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a resolved local: `id` reads/writes the environment exactly
    /// `depth` parent links up from the active one.  Called by the resolver;
    /// a distance, once recorded, is never recomputed.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error aborts the remainder of the run.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(InterpretError::Error(error)) => return Err(error),

                // the resolver rejects top-level `return`; if this pass ran
                // unresolved, treat the signal as end of program
                Err(InterpretError::Return(_)) => return Ok(()),
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// One line to the injected output sink.
    pub(crate) fn write_line(&self, value: &Value) -> io::Result<()> {
        writeln!(self.output.borrow_mut(), "{}", value)
    }

    // ───────────────────────── statements ─────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.write_line(&value).map_err(LoxError::from)?;
                Ok(())
            }

            Stmt::Exit(expr) => {
                let value = self.evaluate(expr)?;

                info!("Exit statement evaluated to {:?}", value);

                // deliberate, unconditional process termination
                process::exit(exit_code(&value))
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {:?}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // capture the environment active *now* as the closure
                let function = crate::callable::LoxFunction::new(
                    declaration.clone(),
                    self.environment.clone(),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(InterpretError::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` with `environment` active, restoring the previous
    /// environment on *every* exit path — including a return signal or a
    /// runtime error unwinding through here.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::parser::FunctionDecl>],
    ) -> IResult<()> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(
                        LoxError::runtime(name.line, "Superclass must be a class.").into(),
                    );
                }
            },
            None => None,
        };

        // pre-declare so methods can refer to the class by name
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // with a superclass, methods close over an extra scope binding `super`
        let mut class_environment = self.environment.clone();
        if let Some(superclass) = &superclass_value {
            class_environment = Rc::new(RefCell::new(Environment::with_enclosing(
                class_environment,
            )));
            class_environment
                .borrow_mut()
                .define("super", Value::Class(superclass.clone()));
        }

        let mut method_table = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = crate::callable::LoxFunction::new(
                method.clone(),
                class_environment.clone(),
                is_initializer,
            );

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        debug!("Defined {:?}", class);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ───────────────────────── expressions ────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // short-circuit: the left value itself is the result
                match operator.token_type {
                    TokenType::OR if left_value.is_truthy() => Ok(left_value),
                    TokenType::OR => self.evaluate(right),
                    _ if !left_value.is_truthy() => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { name, id } => self.look_up_variable(name, *id),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(self.undefined_variable(name));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.call_value(callee_value, &argument_values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, &name.lexeme)
                    .ok_or_else(|| {
                        LoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        )
                        .into()
                    }),

                _ => Err(
                    LoxError::runtime(name.line, "Only instances have properties.").into(),
                ),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(&name.lexeme, value.clone());
                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
            },

            Expr::This { keyword, id } => self.look_up_variable(keyword, *id),

            Expr::Super { keyword, method, id } => self.evaluate_super(keyword, method, *id),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(
                    LoxError::runtime(operator.line, "Operand must be a number.").into(),
                ),
            },

            TokenType::BANG => Ok(Value::Bool(!right_value.is_truthy())),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        let numbers_required =
            || LoxError::runtime(operator.line, "Operands must be numbers.").into();

        match operator.token_type {
            // `+` on a mixed operand pair quietly yields nil instead of a
            // type error; a long-standing quirk of the language, kept as is.
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Ok(Value::Nil),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(numbers_required()),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(numbers_required()),
            },

            // IEEE-754 division; x/0 is an infinity, not an error
            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(numbers_required()),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(numbers_required()),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(numbers_required()),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(numbers_required()),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(numbers_required()),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value.equals(&right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left_value.equals(&right_value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    /// Variable read: resolved locals jump to their recorded distance,
    /// everything else is a global.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| self.undefined_variable(name))
    }

    fn undefined_variable(&self, name: &Token) -> InterpretError {
        LoxError::runtime(
            name.line,
            format!("Undefined variable '{}'.", name.lexeme),
        )
        .into()
    }

    /// Dispatch a call on any callable value, enforcing exact arity.
    fn call_value(&mut self, callee: Value, arguments: &[Value], paren: &Token) -> IResult<Value> {
        let arity = match &callee {
            Value::Native(native) => native.arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                )
                .into());
            }
        };

        if arguments.len() != arity {
            return Err(LoxError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    arity,
                    arguments.len()
                ),
            )
            .into());
        }

        match callee {
            Value::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(self, arguments)
                    .map_err(|message| LoxError::runtime(paren.line, message).into())
            }

            Value::Function(function) => function.call(self, arguments),

            Value::Class(class) => LoxClass::call(&class, self, arguments),

            _ => unreachable!("arity dispatch already rejected non-callables"),
        }
    }

    /// `super.method` binds the *statically enclosing* class's superclass
    /// method to the current `this` — `"super"` lives at the recorded
    /// distance, `"this"` one environment nearer.
    fn evaluate_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> IResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .ok_or_else(|| self.undefined_variable(keyword))?;

        let superclass = self.environment.borrow().get_at(distance, "super");
        let object = self.environment.borrow().get_at(distance - 1, "this");

        match (superclass, object) {
            (Some(Value::Class(superclass)), Some(Value::Instance(instance))) => {
                let resolved = superclass.find_method(&method.lexeme).ok_or_else(|| {
                    InterpretError::from(LoxError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    ))
                })?;

                Ok(Value::Function(Rc::new(resolved.bind(instance))))
            }

            _ => Err(self.undefined_variable(keyword)),
        }
    }
}
