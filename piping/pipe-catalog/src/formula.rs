//! Constrained arithmetic for parametric connection templates.
//!
//! A [`Formula`] is parsed once into a small expression tree and evaluated
//! against [`Bindings`]. The grammar admits only numbers, the two bound
//! variables and the four arithmetic operators:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | VARIABLE | '(' expr ')'
//! VARIABLE := dn | size | nominal_size | pn | class | pressure_class
//! ```
//!
//! Breakpoint tables (bolt count by size) are expressed as
//! [`StepFunction`] data rather than conditional syntax.
//!
//! # Example
//!
//! ```
//! use pipe_catalog::formula::{Bindings, Formula};
//!
//! let pcd = Formula::parse("125 + (dn - 50) * 1.1").unwrap();
//! let value = pcd.eval(Bindings::new(100.0, 16.0)).unwrap();
//! assert!((value - 180.0).abs() < 1e-9);
//! ```

use std::fmt;

use pipe_types::{PipingError, PipingResult};

/// Maximum nesting depth of parentheses and unary minus.
const MAX_DEPTH: usize = 32;

/// Maximum source length accepted by the parser.
const MAX_LEN: usize = 256;

/// Values of the variables a formula may reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bindings {
    /// Nominal size (DN).
    pub size: f64,
    /// Pressure class (PN).
    pub class: f64,
}

impl Bindings {
    /// Creates bindings.
    #[must_use]
    pub const fn new(size: f64, class: f64) -> Self {
        Self { size, class }
    }
}

/// A bound variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Nominal size.
    Size,
    /// Pressure class.
    Class,
}

impl Variable {
    fn lookup(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dn" | "size" | "nominal_size" => Some(Self::Size),
            "pn" | "class" | "pressure_class" => Some(Self::Class),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Var(Variable),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Var(Variable::Size) => f.write_str("dn"),
            Self::Var(Variable::Class) => f.write_str("pn"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> PipingResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = pos;
                let mut end = pos;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &input[start..end];
                let value = text.parse::<f64>().map_err(|_| {
                    PipingError::formula(input, format!("invalid number '{text}' at {start}"))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                let mut end = pos;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &input[start..end];
                let var = Variable::lookup(name).ok_or_else(|| {
                    PipingError::formula(input, format!("unknown variable '{name}' at {start}"))
                })?;
                tokens.push(Token::Var(var));
            }
            other => {
                return Err(PipingError::formula(
                    input,
                    format!("unexpected character '{other}' at {pos}"),
                ));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> PipingError {
        PipingError::formula(self.source, message)
    }

    fn enter(&mut self) -> PipingResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn parse(mut self) -> PipingResult<Expr> {
        let expr = self.expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.error(format!("unexpected '{token}' after expression"))),
        }
    }

    fn expr(&mut self) -> PipingResult<Expr> {
        let mut lhs = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(Op::Add),
            Some(Token::Minus) => Some(Op::Sub),
            _ => None,
        } {
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> PipingResult<Expr> {
        let mut lhs = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(Op::Mul),
            Some(Token::Slash) => Some(Op::Div),
            _ => None,
        } {
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PipingResult<Expr> {
        if self.peek() == Some(Token::Minus) {
            self.advance();
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> PipingResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Var(v)) => Ok(Expr::Var(v)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expr()?;
                if self.advance() != Some(Token::RParen) {
                    return Err(self.error("missing ')'"));
                }
                self.depth -= 1;
                Ok(inner)
            }
            Some(token) => Err(self.error(format!("unexpected '{token}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

impl Expr {
    fn eval(&self, bindings: Bindings) -> Result<f64, &'static str> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Var(Variable::Size) => bindings.size,
            Self::Var(Variable::Class) => bindings.class,
            Self::Neg(inner) => -inner.eval(bindings)?,
            Self::Binary(op, lhs, rhs) => {
                let a = lhs.eval(bindings)?;
                let b = rhs.eval(bindings)?;
                match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => {
                        if b.abs() <= f64::EPSILON {
                            return Err("division by zero");
                        }
                        a / b
                    }
                }
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err("non-finite result")
        }
    }
}

/// A parsed arithmetic formula.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parses a formula.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::Formula`] for unknown variables, characters
    /// outside the grammar, malformed expressions, or input that is too long
    /// or nested too deeply.
    pub fn parse(source: &str) -> PipingResult<Self> {
        if source.len() > MAX_LEN {
            let head: String = source.chars().take(32).collect();
            return Err(PipingError::formula(
                format!("{head}..."),
                format!("formula longer than {MAX_LEN} bytes"),
            ));
        }
        let tokens = tokenize(source)?;
        let expr = Parser::new(source, tokens).parse()?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Evaluates the formula.
    ///
    /// # Errors
    ///
    /// Returns [`PipingError::Formula`] on division by zero or a non-finite
    /// result.
    pub fn eval(&self, bindings: Bindings) -> PipingResult<f64> {
        self.expr
            .eval(bindings)
            .map_err(|message| PipingError::formula(&self.source, message))
    }

    /// Returns the source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for Formula {
    type Error = PipingError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::parse(&source)
    }
}

impl From<Formula> for String {
    fn from(formula: Formula) -> Self {
        formula.source
    }
}

/// A piecewise-constant function of one variable.
///
/// Returns the value of the first step whose upper bound is at or above
/// the input, or `otherwise` past the last step.
///
/// # Example
///
/// ```
/// use pipe_catalog::formula::{StepFunction, Variable};
///
/// let bolts = StepFunction::new(Variable::Size, 20.0)
///     .step(50.0, 4.0)
///     .step(150.0, 8.0);
/// assert_eq!(bolts.value_at(50.0), 4.0);
/// assert_eq!(bolts.value_at(80.0), 8.0);
/// assert_eq!(bolts.value_at(600.0), 20.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepFunction {
    variable: VariableName,
    steps: Vec<(f64, f64)>,
    otherwise: f64,
}

/// Serializable name of a [`Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
enum VariableName {
    Size,
    Class,
}

impl StepFunction {
    /// Creates a step function with only a fallback value.
    #[must_use]
    pub const fn new(variable: Variable, otherwise: f64) -> Self {
        let variable = match variable {
            Variable::Size => VariableName::Size,
            Variable::Class => VariableName::Class,
        };
        Self {
            variable,
            steps: Vec::new(),
            otherwise,
        }
    }

    /// Adds a step `x <= upto -> value`. Steps are kept sorted by bound.
    #[must_use]
    pub fn step(mut self, upto: f64, value: f64) -> Self {
        let index = self.steps.partition_point(|(bound, _)| *bound <= upto);
        self.steps.insert(index, (upto, value));
        self
    }

    /// Evaluates the function at `x`.
    #[must_use]
    pub fn value_at(&self, x: f64) -> f64 {
        self.steps
            .iter()
            .find(|(bound, _)| x <= *bound)
            .map_or(self.otherwise, |(_, value)| *value)
    }

    /// Evaluates the function against bindings.
    #[must_use]
    pub fn eval(&self, bindings: Bindings) -> f64 {
        match self.variable {
            VariableName::Size => self.value_at(bindings.size),
            VariableName::Class => self.value_at(bindings.class),
        }
    }
}

/// A numeric quantity that is either a formula or a step table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Quantity {
    /// A constant.
    Fixed(f64),
    /// An arithmetic formula.
    Formula(Formula),
    /// A step table.
    Steps(StepFunction),
}

impl Quantity {
    /// Evaluates the quantity.
    ///
    /// # Errors
    ///
    /// Propagates formula evaluation errors.
    pub fn eval(&self, bindings: Bindings) -> PipingResult<f64> {
        match self {
            Self::Fixed(v) => Ok(*v),
            Self::Formula(f) => f.eval(bindings),
            Self::Steps(s) => Ok(s.eval(bindings)),
        }
    }
}
