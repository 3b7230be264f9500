use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Less
                | BinaryOperator::Greater
                | BinaryOperator::LessEq
                | BinaryOperator::GreaterEq
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub methods: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        name: String,
        value: Expression,
    },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Return(Expression),
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },
    Expr(Expression),
    NoOp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Pow => "^",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEq => "<=",
            BinaryOperator::GreaterEq => ">=",
        };
        write!(f, "{symbol}")
    }
}

// Expressions print fully parenthesized so the printed form re-parses to an
// equivalent tree regardless of operator precedence.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(value) => write!(f, "{value}"),
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::Unary { op, operand } => write!(f, "({op}{operand})"),
            Expression::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Expression::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, body: &[Statement]) -> fmt::Result {
    write!(f, "{{")?;
    for statement in body {
        write!(f, " {statement}")?;
    }
    write!(f, " }}")
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {} {{", self.name)?;
        for method in &self.methods {
            write!(f, " {method}")?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { name, value } => write!(f, "{name} = {value};"),
            Statement::FunctionDef(function) => write!(f, "{function}"),
            Statement::ClassDef(class) => write!(f, "{class}"),
            Statement::Return(value) => write!(f, "return {value};"),
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                // The condition grammar is a bare `expr cmp expr`, so a
                // comparison prints without its usual outer parentheses.
                match condition {
                    Expression::Binary { left, op, right } if op.is_comparison() => {
                        write!(f, "if ({left} {op} {right}) ")?;
                    }
                    other => write!(f, "if ({other}) ")?,
                }
                write_block(f, then_body)?;
                if let Some(else_body) = else_body {
                    write!(f, " else ")?;
                    write_block(f, else_body)?;
                }
                Ok(())
            }
            Statement::Expr(expr) => write!(f, "{expr};"),
            Statement::NoOp => write!(f, ";"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}
