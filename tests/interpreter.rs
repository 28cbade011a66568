#[cfg(test)]
mod interpreter_tests {
    use loxide as lox;

    use std::cell::RefCell;
    use std::rc::Rc;

    use lox::interpreter::{exit_code, Interpreter};
    use lox::lox::{Lox, RunOutcome};
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;
    use lox::value::Value;

    /// Runs a program with captured sinks and returns the outcome together
    /// with everything written to the output and error channels.
    fn run(source: &str) -> (RunOutcome, String, String) {
        let out = Rc::new(RefCell::new(Vec::<u8>::new()));
        let err = Rc::new(RefCell::new(Vec::<u8>::new()));

        let mut lox = Lox::new(out.clone(), err.clone());
        let outcome = lox.run(source.as_bytes());

        let stdout = String::from_utf8(out.borrow().clone()).expect("utf-8 output");
        let stderr = String::from_utf8(err.borrow().clone()).expect("utf-8 output");

        (outcome, stdout, stderr)
    }

    fn run_ok(source: &str) -> String {
        let (outcome, stdout, stderr) = run(source);

        assert_eq!(outcome, RunOutcome::Success, "stderr: {}", stderr);
        assert!(stderr.is_empty());

        stdout
    }

    fn run_runtime_error(source: &str) -> (String, String) {
        let (outcome, stdout, stderr) = run(source);

        assert_eq!(outcome, RunOutcome::RuntimeError);

        (stdout, stderr)
    }

    // ───────────────────────── basics ─────────────────────────

    #[test]
    fn test_print_statement() {
        assert_eq!(run_ok("print \"hello world\";"), "hello world\n");
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run_ok("print 1 + 2;"), "3\n");
        assert_eq!(run_ok("print (5 - (3 - 1)) + -1;"), "2\n");
        assert_eq!(run_ok("print 3 * 4 / 2;"), "6\n");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(run_ok("print 3.0;"), "3\n");
        assert_eq!(run_ok("print 3.5;"), "3.5\n");
        assert_eq!(run_ok("print 0.25 + 0.25;"), "0.5\n");
    }

    #[test]
    fn test_division_by_zero_is_an_infinity() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
        assert_eq!(run_ok("print -1 / 0;"), "-inf\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_plus_on_mixed_operands_yields_nil() {
        // mixed `+` is not a type error in this dialect
        assert_eq!(run_ok("print 1 + \"a\";"), "nil\n");
        assert_eq!(run_ok("print \"a\" + nil;"), "nil\n");
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(run_ok("print !nil;"), "true\n");
        assert_eq!(run_ok("print !0;"), "false\n");
        assert_eq!(run_ok("print !\"\";"), "false\n");
    }

    #[test]
    fn test_equality_semantics() {
        assert_eq!(run_ok("print 1 == 1;"), "true\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
        assert_eq!(run_ok("print nil != false;"), "true\n");
    }

    #[test]
    fn test_logical_operators_return_operand_values() {
        assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
        assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
        assert_eq!(run_ok("print nil and 2;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
    }

    // ─────────────────── variables and control flow ───────────────────

    #[test]
    fn test_variable_declaration_and_assignment() {
        assert_eq!(run_ok("var a = 1; a = a + 1; print a;"), "2\n");
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_assignment_is_an_expression() {
        assert_eq!(run_ok("var a; var b; a = b = 2; print a; print b;"), "2\n2\n");
    }

    #[test]
    fn test_block_scoping_shadows_and_restores() {
        let source = "\
var a = \"outer\";
{
  var a = \"inner\";
  print a;
}
print a;
";
        assert_eq!(run_ok(source), "inner\nouter\n");
    }

    #[test]
    fn test_if_else() {
        assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    // ───────────────────── functions and closures ─────────────────────

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add(1, 2);"),
            "3\n"
        );
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
        assert_eq!(run_ok("fun f() { return; } print f();"), "nil\n");
    }

    #[test]
    fn test_function_display() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    }

    #[test]
    fn test_recursion() {
        let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
";
        assert_eq!(run_ok(source), "55\n");
    }

    #[test]
    fn test_closure_outlives_creating_frame() {
        let source = "\
fun makeCounter() {
  var count = 0;
  fun increment() {
    count = count + 1;
    return count;
  }
  return increment;
}
var counter = makeCounter();
print counter();
print counter();
";
        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_closure_binding_is_frozen_at_declaration() {
        // the function keeps seeing the binding that was visible when it was
        // declared, not the shadowing declaration that follows it
        let source = "\
var a = \"global\";
{
  fun showA() {
    print a;
  }
  showA();
  var a = \"block\";
  showA();
}
";
        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_clock_native_is_callable() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    // ───────────────────── classes and inheritance ─────────────────────

    #[test]
    fn test_class_and_instance_display() {
        assert_eq!(run_ok("class Foo {} print Foo;"), "Foo\n");
        assert_eq!(run_ok("class Foo {} print Foo();"), "Foo instance\n");
    }

    #[test]
    fn test_initializer_and_method() {
        let source = "\
class Box {
  init(v) {
    this.v = v;
  }
  get() {
    return this.v;
  }
}
print Box(5).get();
";
        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = "\
class A {
  name() { return \"method\"; }
}
var a = A();
a.name = \"field\";
print a.name;
";
        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_bound_method_retains_this() {
        let source = "\
class Greeter {
  init(who) { this.who = who; }
  greet() { print this.who; }
}
var m = Greeter(\"alice\").greet;
m();
";
        assert_eq!(run_ok(source), "alice\n");
    }

    #[test]
    fn test_instance_created_inside_initializer() {
        let source = "\
class Bar {
  init() { this.value = \"bar\"; }
}
class Foo {
  init() { this.bar = Bar(); }
}
print Foo().bar.value;
";
        assert_eq!(run_ok(source), "bar\n");
    }

    #[test]
    fn test_inherited_method() {
        let source = "\
class A {
  method() { print \"A\"; }
}
class B < A {}
B().method();
";
        assert_eq!(run_ok(source), "A\n");
    }

    #[test]
    fn test_super_skips_past_the_overriding_class() {
        let source = "\
class A {
  method() { print \"Method A\"; }
}
class B < A {
  method() { print \"Method B\"; }
  test() { super.method(); }
}
class C < B {}
C().test();
";
        assert_eq!(run_ok(source), "Method A\n");
    }

    #[test]
    fn test_inherited_initializer() {
        let source = "\
class A {
  init(v) { this.v = v; }
}
class B < A {}
print B(7).v;
";
        assert_eq!(run_ok(source), "7\n");
    }

    // ───────────────────────── runtime errors ─────────────────────────

    #[test]
    fn test_undefined_variable() {
        let (_, stderr) = run_runtime_error("print missing;");
        assert!(stderr.contains("Undefined variable 'missing'."));
        assert!(stderr.contains("[line 1]"));
    }

    #[test]
    fn test_assignment_to_undefined_variable() {
        let (_, stderr) = run_runtime_error("missing = 1;");
        assert!(stderr.contains("Undefined variable 'missing'."));
    }

    #[test]
    fn test_operand_type_errors() {
        let (_, stderr) = run_runtime_error("print -\"a\";");
        assert!(stderr.contains("Operand must be a number."));

        let (_, stderr) = run_runtime_error("print 1 < \"a\";");
        assert!(stderr.contains("Operands must be numbers."));
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, stderr) = run_runtime_error("\"not a function\"();");
        assert!(stderr.contains("Can only call functions and classes."));
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, stderr) = run_runtime_error("fun f(a, b) {} f(1);");
        assert!(stderr.contains("Expected 2 arguments but got 1."));
    }

    #[test]
    fn test_class_arity_follows_initializer() {
        let (_, stderr) = run_runtime_error("class A { init(v) {} } A();");
        assert!(stderr.contains("Expected 1 arguments but got 0."));
    }

    #[test]
    fn test_undefined_property() {
        let (_, stderr) = run_runtime_error("class A {} print A().missing;");
        assert!(stderr.contains("Undefined property 'missing'."));
    }

    #[test]
    fn test_property_access_on_non_instance() {
        let (_, stderr) = run_runtime_error("print 1.foo;");
        assert!(stderr.contains("Only instances have properties."));

        let (_, stderr) = run_runtime_error("1.foo = 2;");
        assert!(stderr.contains("Only instances have fields."));
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, stderr) = run_runtime_error("var NotAClass = 1; class A < NotAClass {}");
        assert!(stderr.contains("Superclass must be a class."));
    }

    #[test]
    fn test_runtime_error_keeps_prior_output() {
        let (stdout, stderr) = run_runtime_error("print \"first\"; print missing;");
        assert_eq!(stdout, "first\n");
        assert!(stderr.contains("Undefined variable 'missing'."));
    }

    #[test]
    fn test_static_error_executes_nothing() {
        let (outcome, stdout, stderr) = run("print \"never\"; var = 1;");
        assert_eq!(outcome, RunOutcome::StaticError);
        assert!(stdout.is_empty());
        assert!(stderr.contains("Expected variable name"));
    }

    // ───────────────────────── exit coercion ─────────────────────────

    #[test]
    fn test_exit_code_from_numbers() {
        assert_eq!(exit_code(&Value::Number(0.0)), 0);
        assert_eq!(exit_code(&Value::Number(65.0)), 65);
        assert_eq!(exit_code(&Value::Number(64.6)), 65);
        assert_eq!(exit_code(&Value::Number(-2.0)), -2);
    }

    #[test]
    fn test_exit_code_from_non_finite_numbers() {
        // 0/0 inside the language produces a NaN operand; it must not
        // round into a success code
        assert_eq!(exit_code(&Value::Number(f64::NAN)), -1);
        assert_eq!(exit_code(&Value::Number(f64::INFINITY)), -1);
        assert_eq!(exit_code(&Value::Number(f64::NEG_INFINITY)), -1);
    }

    #[test]
    fn test_exit_code_out_of_range_falls_back() {
        assert_eq!(exit_code(&Value::Number(1e12)), -1);
        assert_eq!(exit_code(&Value::Number(-1e12)), -1);
        assert_eq!(exit_code(&Value::Number(i32::MAX as f64)), i32::MAX);
    }

    #[test]
    fn test_exit_code_from_non_numbers_falls_back() {
        assert_eq!(exit_code(&Value::Nil), -1);
        assert_eq!(exit_code(&Value::Bool(true)), -1);
        assert_eq!(exit_code(&Value::String("3".to_string())), -1);
    }

    // ──────────────────────── pipeline reuse ────────────────────────

    #[test]
    fn test_one_ast_interprets_identically_in_fresh_interpreters() {
        let source = "var a = 1; { var a = 2; print a; } print a;";

        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("test source lexes cleanly");
        let (statements, errors) = Parser::new(&tokens).parse();
        assert!(errors.is_empty());

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
            let mut interpreter = Interpreter::new(sink.clone());

            let errors = Resolver::new(&mut interpreter).resolve(&statements);
            assert!(errors.is_empty());

            interpreter.interpret(&statements).expect("program runs clean");
            outputs.push(String::from_utf8(sink.borrow().clone()).expect("utf-8 output"));
        }

        assert_eq!(outputs[0], "2\n1\n");
        assert_eq!(outputs[0], outputs[1]);
    }
}
