use std::collections::HashMap;

use crate::ast::{
    BinaryOperator, ClassDef, Expression, FunctionDef, Program, Statement, UnaryOperator,
};

pub mod error;
pub mod scope;

pub use error::RuntimeError;
pub use scope::ScopeStack;

/// Upper bound on simultaneously active function-call frames, so runaway
/// recursion fails with a reported error instead of a native stack fault.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Control-flow marker threaded through statement execution: either the
/// statement produced a value and evaluation continues, or a `return`
/// short-circuits the enclosing blocks with the call's result.
enum ExecResult {
    Continue(f64),
    Return(f64),
}

/// One evaluation session: definition tables, scope stack, and recursion
/// counter. The tables borrow the program, so the AST must outlive the
/// session consuming it.
pub struct Interpreter<'p> {
    functions: HashMap<&'p str, &'p FunctionDef>,
    classes: HashMap<&'p str, &'p ClassDef>,
    scopes: ScopeStack,
    call_depth: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            classes: HashMap::new(),
            scopes: ScopeStack::new(),
            call_depth: 0,
        }
    }

    /// Walks the top-level statements and returns the last one's value
    /// (`0.0` for an empty program). Top-level assignments stay visible in
    /// the scope store afterwards, so a caller can evaluate further units
    /// against the same session.
    pub fn evaluate(&mut self, program: &'p Program) -> Result<f64, RuntimeError> {
        self.call_depth = 0;
        match self.exec_block(&program.statements)? {
            ExecResult::Continue(value) => Ok(value),
            ExecResult::Return(_) => Err(RuntimeError::ReturnOutsideFunction),
        }
    }

    /// Current value of a variable, innermost scope first. After a
    /// completed evaluation only the global frame remains.
    pub fn variable(&self, name: &str) -> Option<f64> {
        self.scopes.get(name)
    }

    fn exec_block(&mut self, body: &'p [Statement]) -> Result<ExecResult, RuntimeError> {
        let mut last = 0.0;
        for statement in body {
            match self.exec_statement(statement)? {
                ExecResult::Continue(value) => last = value,
                ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
            }
        }
        Ok(ExecResult::Continue(last))
    }

    fn exec_statement(&mut self, statement: &'p Statement) -> Result<ExecResult, RuntimeError> {
        match statement {
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                self.scopes.set(name, value);
                Ok(ExecResult::Continue(value))
            }
            Statement::FunctionDef(function) => {
                // Redefinition silently replaces the earlier entry.
                self.functions.insert(function.name.as_str(), function);
                Ok(ExecResult::Continue(0.0))
            }
            Statement::ClassDef(class) => {
                // Registered but never invoked; methods are inert.
                self.classes.insert(class.name.as_str(), class);
                Ok(ExecResult::Continue(0.0))
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value)?;
                Ok(ExecResult::Return(value))
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval_expression(condition)?;
                if condition != 0.0 {
                    self.exec_block(then_body)
                } else if let Some(else_body) = else_body {
                    self.exec_block(else_body)
                } else {
                    Ok(ExecResult::Continue(0.0))
                }
            }
            Statement::Expr(expr) => Ok(ExecResult::Continue(self.eval_expression(expr)?)),
            Statement::NoOp => Ok(ExecResult::Continue(0.0)),
        }
    }

    fn eval_expression(&mut self, expr: &'p Expression) -> Result<f64, RuntimeError> {
        match expr {
            Expression::Number(value) => Ok(*value),
            Expression::Variable(name) => {
                self.scopes
                    .get(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() })
            }
            Expression::Unary { op, operand } => {
                let value = self.eval_expression(operand)?;
                match op {
                    UnaryOperator::Plus => Ok(value),
                    UnaryOperator::Minus => Ok(-value),
                }
            }
            Expression::Binary { left, op, right } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                self.eval_binary(left, *op, right)
            }
            Expression::Call { name, args } => self.eval_call(name, args),
        }
    }

    fn eval_binary(&self, left: f64, op: BinaryOperator, right: f64) -> Result<f64, RuntimeError> {
        match op {
            BinaryOperator::Add => Ok(left + right),
            BinaryOperator::Sub => Ok(left - right),
            BinaryOperator::Mul => Ok(left * right),
            BinaryOperator::Div => {
                if right == 0.0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(left / right)
                }
            }
            // f64 remainder carries the dividend's sign.
            BinaryOperator::Rem => Ok(left % right),
            BinaryOperator::Pow => Ok(left.powf(right)),
            BinaryOperator::Eq => Ok(bool_value(left == right)),
            BinaryOperator::NotEq => Ok(bool_value(left != right)),
            BinaryOperator::Less => Ok(bool_value(left < right)),
            BinaryOperator::Greater => Ok(bool_value(left > right)),
            BinaryOperator::LessEq => Ok(bool_value(left <= right)),
            BinaryOperator::GreaterEq => Ok(bool_value(left >= right)),
        }
    }

    fn eval_call(&mut self, name: &str, args: &'p [Expression]) -> Result<f64, RuntimeError> {
        let function =
            self.functions
                .get(name)
                .copied()
                .ok_or_else(|| RuntimeError::UndefinedFunction {
                    name: name.to_string(),
                })?;
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: function.name.clone(),
                expected: function.params.len(),
                found: args.len(),
            });
        }

        // Arguments are evaluated in the caller's scope, before the callee
        // frame exists.
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(self.eval_expression(arg)?);
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::RecursionLimitExceeded {
                limit: MAX_CALL_DEPTH,
            });
        }
        self.call_depth += 1;
        self.scopes.enter_scope();
        for (param, value) in function.params.iter().zip(arguments) {
            self.scopes.set(param, value);
        }

        // Frame pop and counter decrement run on every exit path, so a
        // failed call leaves the session balanced for the next unit.
        let outcome = self.exec_block(&function.body);
        self.scopes.leave_scope();
        self.call_depth -= 1;

        match outcome? {
            ExecResult::Return(value) => Ok(value),
            ExecResult::Continue(_) => Ok(0.0),
        }
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn bool_value(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn eval(source: &str) -> Result<f64, RuntimeError> {
        let program = parse(source).expect("parse failed");
        Interpreter::new().evaluate(&program)
    }

    fn eval_ok(source: &str) -> f64 {
        eval(source).expect("evaluation failed")
    }

    #[test]
    fn evaluates_operator_precedence() {
        assert_eq!(eval_ok("3 + 5 * 2;"), 13.0);
        assert_eq!(eval_ok("(3 + 5) * 2;"), 16.0);
    }

    #[test]
    fn assignment_yields_value_and_binds() {
        assert_eq!(eval_ok("a = 5; a + 2;"), 7.0);
    }

    #[test]
    fn sequential_assignments_update() {
        assert_eq!(eval_ok("x = 10; y = x + 5; z = y * 2; z;"), 30.0);
    }

    #[test]
    fn unary_operators_apply_to_operand() {
        assert_eq!(eval_ok("-5 + 3;"), -2.0);
        assert_eq!(eval_ok("+5 - 2;"), 3.0);
    }

    #[test]
    fn empty_program_yields_zero() {
        assert_eq!(eval_ok(""), 0.0);
        assert_eq!(eval_ok(";"), 0.0);
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(eval("5 / 0;"), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn undefined_variable_fails() {
        assert_eq!(
            eval("a + 2;"),
            Err(RuntimeError::UndefinedVariable {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn undefined_function_fails() {
        assert_eq!(
            eval("f(1);"),
            Err(RuntimeError::UndefinedFunction {
                name: "f".to_string()
            })
        );
    }

    #[test]
    fn arity_mismatch_fails() {
        let source = "function add(a, b) { return a + b; } add(1);";
        assert_eq!(
            eval(source),
            Err(RuntimeError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn power_operator_edge_cases() {
        assert_eq!(eval_ok("2 ^ 0;"), 1.0);
        assert_eq!(eval_ok("0 ^ 0;"), 1.0);
        assert_eq!(eval_ok("(-2) ^ 3;"), -8.0);
        assert_eq!(eval_ok("2 ^ (-3);"), 0.125);
    }

    #[test]
    fn remainder_sign_follows_dividend() {
        assert_eq!(eval_ok("-10 % 3;"), -1.0);
        assert_eq!(eval_ok("10 % -3;"), 1.0);
        assert_eq!(eval_ok("-10 % -3;"), -1.0);
    }

    #[test]
    fn comparisons_yield_one_or_zero() {
        // The grammar only admits comparisons as `if` conditions, but the
        // evaluator gives them numeric results; pin those down directly.
        let comparison = Program {
            statements: vec![Statement::Expr(Expression::Binary {
                left: Box::new(Expression::Number(2.0)),
                op: BinaryOperator::LessEq,
                right: Box::new(Expression::Number(2.0)),
            })],
        };
        assert_eq!(Interpreter::new().evaluate(&comparison), Ok(1.0));

        let comparison = Program {
            statements: vec![Statement::Expr(Expression::Binary {
                left: Box::new(Expression::Number(2.0)),
                op: BinaryOperator::NotEq,
                right: Box::new(Expression::Number(2.0)),
            })],
        };
        assert_eq!(Interpreter::new().evaluate(&comparison), Ok(0.0));
    }

    #[test]
    fn if_chooses_branch_by_nonzero_condition() {
        assert_eq!(eval_ok("if (1 == 1) { 5; }"), 5.0);
        assert_eq!(eval_ok("if (1 == 2) { 5; }"), 0.0);
        assert_eq!(eval_ok("if (1 == 2) { 5; } else { 7; }"), 7.0);
    }

    #[test]
    fn function_call_binds_parameters_positionally() {
        let input = indoc! {"
            function sub(a, b) {
                return a - b;
            }
            sub(10, 4);
        "};
        assert_eq!(eval_ok(input), 6.0);
    }

    #[test]
    fn body_without_return_yields_zero() {
        let input = indoc! {"
            function touch(x) {
                x + 1;
            }
            touch(5);
        "};
        assert_eq!(eval_ok(input), 0.0);
    }

    #[test]
    fn return_short_circuits_remaining_statements() {
        let input = indoc! {"
            function pick(n) {
                if (n > 0) {
                    return 1;
                }
                return 2;
            }
            pick(5);
        "};
        assert_eq!(eval_ok(input), 1.0);
    }

    #[test]
    fn recursion_computes_factorial() {
        let input = indoc! {"
            function factorial(n) {
                if (n == 0) {
                    return 1;
                } else {
                    return n * factorial(n - 1);
                }
            }
            factorial(5);
        "};
        assert_eq!(eval_ok(input), 120.0);
    }

    #[test]
    fn mutual_recursion_terminates() {
        let input = indoc! {"
            function isEven(n) {
                if (n == 0) {
                    return 1;
                }
                return isOdd(n - 1);
            }
            function isOdd(n) {
                if (n == 0) {
                    return 0;
                }
                return isEven(n - 1);
            }
            isEven(10);
        "};
        assert_eq!(eval_ok(input), 1.0);
    }

    #[test]
    fn assignment_in_call_shadows_instead_of_mutating() {
        let program = parse(indoc! {"
            a = 10;
            function f() {
                a = 5;
                return a;
            }
            r = f();
            a;
        "})
        .expect("parse failed");
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.evaluate(&program), Ok(10.0));
        assert_eq!(interpreter.variable("r"), Some(5.0));
        assert_eq!(interpreter.variable("a"), Some(10.0));
    }

    // Reaching the call-depth limit takes ~1000 nested evaluator frames,
    // which needs more stack than the default test thread provides.
    fn on_roomy_stack(test: fn()) {
        std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(test)
            .expect("spawn test thread")
            .join()
            .expect("join test thread");
    }

    #[test]
    fn unbounded_recursion_hits_the_limit() {
        on_roomy_stack(|| {
            let input = "function inf() { return inf(); } inf();";
            assert_eq!(
                eval(input),
                Err(RuntimeError::RecursionLimitExceeded {
                    limit: MAX_CALL_DEPTH
                })
            );
        });
    }

    #[test]
    fn top_level_return_fails() {
        assert_eq!(eval("return 5;"), Err(RuntimeError::ReturnOutsideFunction));
    }

    #[test]
    fn function_redefinition_replaces_the_entry() {
        let input = indoc! {"
            function f() { return 1; }
            function f() { return 2; }
            f();
        "};
        assert_eq!(eval_ok(input), 2.0);
    }

    #[test]
    fn class_definition_registers_without_running() {
        let input = indoc! {"
            class MyClass {
                function greet() {
                    return boom();
                }
            }
            7;
        "};
        assert_eq!(eval_ok(input), 7.0);
    }

    #[test]
    fn definitions_persist_across_units_in_one_session() {
        let first = parse("function double(n) { return n * 2; } base = 4;").expect("parse failed");
        let second = parse("double(base + 1);").expect("parse failed");
        let mut interpreter = Interpreter::new();
        interpreter.evaluate(&first).expect("first unit failed");
        assert_eq!(interpreter.evaluate(&second), Ok(10.0));
    }

    #[test]
    fn session_stays_balanced_after_an_error() {
        let failing = parse(indoc! {"
            function f(n) {
                g = 1 / 0;
                return g;
            }
            f(1);
        "})
        .expect("parse failed");
        let next = parse("x = 2; x + 1;").expect("parse failed");

        let mut interpreter = Interpreter::new();
        assert_eq!(
            interpreter.evaluate(&failing),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(interpreter.evaluate(&next), Ok(3.0));
        assert_eq!(interpreter.variable("x"), Some(2.0));
    }

    #[test]
    fn recursion_limit_error_leaves_scopes_clean() {
        on_roomy_stack(|| {
            let failing = parse("function inf() { return inf(); } inf();").expect("parse failed");
            let next = parse("1 + 1;").expect("parse failed");
            let mut interpreter = Interpreter::new();
            assert!(interpreter.evaluate(&failing).is_err());
            assert_eq!(interpreter.evaluate(&next), Ok(2.0));
        });
    }
}
