#[cfg(test)]
mod resolver_tests {
    use loxide as lox;

    use std::cell::RefCell;
    use std::rc::Rc;

    use lox::lox::{Lox, RunOutcome};

    /// Runs a program with captured sinks and returns the outcome plus the
    /// diagnostics text.
    fn run(source: &str) -> (RunOutcome, String, String) {
        let out = Rc::new(RefCell::new(Vec::<u8>::new()));
        let err = Rc::new(RefCell::new(Vec::<u8>::new()));

        let mut lox = Lox::new(out.clone(), err.clone());
        let outcome = lox.run(source.as_bytes());

        let stdout = String::from_utf8(out.borrow().clone()).expect("utf-8 output");
        let stderr = String::from_utf8(err.borrow().clone()).expect("utf-8 output");

        (outcome, stdout, stderr)
    }

    fn static_error(source: &str) -> String {
        let (outcome, stdout, stderr) = run(source);

        assert_eq!(outcome, RunOutcome::StaticError);
        assert!(stdout.is_empty(), "static errors must not execute anything");

        stderr
    }

    #[test]
    fn test_read_local_in_its_own_initializer() {
        let stderr = static_error("var a = 1; { var a = a; }");
        assert!(stderr.contains("Cannot read local variable in its own initializer"));
        assert!(stderr.contains("at 'a'"));
    }

    #[test]
    fn test_redeclaration_in_same_local_scope() {
        let stderr = static_error("{ var a = 1; var a = 2; }");
        assert!(stderr.contains("Variable already declared in this scope"));
    }

    #[test]
    fn test_redeclaration_of_global_is_allowed() {
        let (outcome, stdout, _) = run("var a = 1; var a = 2; print a;");
        assert_eq!(outcome, RunOutcome::Success);
        assert_eq!(stdout, "2\n");
    }

    #[test]
    fn test_return_from_top_level() {
        let stderr = static_error("return 1;");
        assert!(stderr.contains("Cannot return from top-level code"));
        assert!(stderr.contains("at 'return'"));
    }

    #[test]
    fn test_return_value_from_initializer() {
        let stderr = static_error("class A { init() { return 1; } }");
        assert!(stderr.contains("Cannot return a value from an initializer"));
    }

    #[test]
    fn test_bare_return_from_initializer_is_allowed() {
        let (outcome, _, _) = run("class A { init() { return; } } A();");
        assert_eq!(outcome, RunOutcome::Success);
    }

    #[test]
    fn test_this_outside_a_class() {
        let stderr = static_error("print this;");
        assert!(stderr.contains("Cannot use 'this' outside of a class"));
    }

    #[test]
    fn test_this_in_a_free_function() {
        let stderr = static_error("fun f() { return this; }");
        assert!(stderr.contains("Cannot use 'this' outside of a class"));
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        let stderr = static_error("class A < A {}");
        assert!(stderr.contains("A class cannot inherit from itself"));
    }

    #[test]
    fn test_super_outside_a_class() {
        let stderr = static_error("print super.m;");
        assert!(stderr.contains("Cannot use 'super' outside of a class"));
    }

    #[test]
    fn test_super_in_a_class_with_no_superclass() {
        let stderr = static_error("class A { m() { return super.m; } }");
        assert!(stderr.contains("Cannot use 'super' in a class with no superclass"));
    }

    #[test]
    fn test_all_errors_are_reported_in_one_pass() {
        let stderr = static_error("return 1; print this;");
        assert!(stderr.contains("Cannot return from top-level code"));
        assert!(stderr.contains("Cannot use 'this' outside of a class"));
    }
}
