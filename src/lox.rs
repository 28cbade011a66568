//! The `Run` driver: one entry point tying the four passes together.
//!
//! `Lox` owns two injected sinks — program output (`print`) and diagnostics —
//! and runs scan → parse → resolve → interpret with the staged abort policy:
//! lexical and syntax errors are accumulated while both stages run to
//! completion, then abort the run before resolution; resolution errors abort
//! before evaluation; the first runtime error ends the run.  Static errors
//! therefore never execute a statement, and a runtime error leaves every
//! prior `print` visible.
//!
//! A fresh [`Diagnostics`] value and a fresh interpreter (token list, AST,
//! resolution table, global environment) are constructed per `run` call; no
//! state survives across runs.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// How a single `run` ended.  The CLI maps these onto process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every statement executed.
    Success,

    /// Lexical, syntax, or resolution errors; nothing was executed.
    StaticError,

    /// Evaluation aborted mid-program.
    RuntimeError,
}

/// Per‑run error accumulator writing to the injected error sink.
pub struct Diagnostics {
    sink: Rc<RefCell<dyn Write>>,
    had_error: bool,
}

impl Diagnostics {
    pub fn new(sink: Rc<RefCell<dyn Write>>) -> Self {
        Self {
            sink,
            had_error: false,
        }
    }

    /// Report one diagnostic line and raise the error flag.  A failing
    /// error sink is not itself reported anywhere.
    pub fn report(&mut self, error: &LoxError) {
        debug!("Diagnostic: {}", error);

        let _ = writeln!(self.sink.borrow_mut(), "{}", error);
        self.had_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }
}

/// The interpreter front door.
pub struct Lox {
    out: Rc<RefCell<dyn Write>>,
    err: Rc<RefCell<dyn Write>>,
}

impl Lox {
    pub fn new(out: Rc<RefCell<dyn Write>>, err: Rc<RefCell<dyn Write>>) -> Self {
        Self { out, err }
    }

    /// Convenience constructor wiring both sinks to the process streams.
    pub fn stdio() -> Self {
        Self::new(
            Rc::new(RefCell::new(io::stdout())),
            Rc::new(RefCell::new(io::stderr())),
        )
    }

    /// Run `source` as a complete Lox program.
    pub fn run(&mut self, source: &[u8]) -> RunOutcome {
        info!("Running {} bytes of source", source.len());

        let mut diagnostics = Diagnostics::new(self.err.clone());

        // 1. lex — errors are collected, scanning always reaches EOF
        let mut tokens: Vec<Token> = Vec::new();
        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => diagnostics.report(&error),
            }
        }

        // 2. parse — synchronizes past bad statements, keeps the good ones
        let (statements, errors) = Parser::new(&tokens).parse();
        for error in &errors {
            diagnostics.report(error);
        }

        if diagnostics.had_error() {
            return RunOutcome::StaticError;
        }

        // 3. resolve — fills the interpreter's distance table
        let mut interpreter = Interpreter::new(self.out.clone());
        let errors = Resolver::new(&mut interpreter).resolve(&statements);
        for error in &errors {
            diagnostics.report(error);
        }

        if diagnostics.had_error() {
            return RunOutcome::StaticError;
        }

        // 4. evaluate
        match interpreter.interpret(&statements) {
            Ok(()) => RunOutcome::Success,

            Err(error) => {
                diagnostics.report(&error);
                RunOutcome::RuntimeError
            }
        }
    }
}
