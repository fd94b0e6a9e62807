//! Expression evaluator with per-user variables.
//!
//! Input is either an expression (`2 * (3 + x)`) or an assignment (`x = 4^2`).
//! Every successful evaluation binds `ans`. Failed evaluations leave the user's
//! variables untouched.

use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Longest expression accepted.
pub const MAX_INPUT_LEN: usize = 256;

/// Name bound to the last result.
pub const ANSWER: &str = "ans";

/// Evaluation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// Character outside the grammar
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    /// Input ended mid-expression
    #[error("the expression ends too early")]
    UnexpectedEnd,
    /// Token in the wrong place
    #[error("unexpected `{0}`")]
    UnexpectedToken(String),
    /// Variable was never assigned
    #[error("`{0}` is not defined")]
    UnknownVariable(String),
    /// Function name not supported
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// Constant or function name used as an assignment target
    #[error("`{0}` cannot be reassigned")]
    Reserved(String),
    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Result is NaN or infinite
    #[error("the result is not a finite number")]
    NotFinite,
    /// Input longer than [`MAX_INPUT_LEN`]
    #[error("expressions are limited to {MAX_INPUT_LEN} characters")]
    TooLong,
}

type CalcResult<T> = std::result::Result<T, CalcError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Assign,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Ident(s) => s.clone(),
            Self::Op(c) => c.to_string(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::Assign => "=".to_string(),
        }
    }
}

fn tokenize(input: &str) -> CalcResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '×' => {
                tokens.push(Token::Op('*'));
                chars.next();
            }
            '÷' => {
                tokens.push(Token::Op('/'));
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '=' => {
                tokens.push(Token::Assign);
                chars.next();
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        _ => None,
    }
}

fn apply_function(name: &str, arg: f64) -> CalcResult<f64> {
    Ok(match name {
        "sqrt" => arg.sqrt(),
        "abs" => arg.abs(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "ln" => arg.ln(),
        "log" => arg.log10(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        _ => return Err(CalcError::UnknownFunction(name.to_string())),
    })
}

const FUNCTIONS: &[&str] = &[
    "sqrt", "abs", "sin", "cos", "tan", "ln", "log", "floor", "ceil", "round",
];

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    vars: &'a HashMap<String, f64>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect_rparen(&mut self) -> CalcResult<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> CalcResult<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> CalcResult<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // unary := '-' unary | '+' unary | power
    fn unary(&mut self) -> CalcResult<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?   (right-associative, binds tighter than unary minus on the left)
    fn power(&mut self) -> CalcResult<f64> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> CalcResult<f64> {
        let vars = self.vars;
        match self.next().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    return apply_function(&name, arg);
                }
                constant(&name)
                    .or_else(|| vars.get(&name).copied())
                    .ok_or(CalcError::UnknownVariable(name))
            }
            Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Variable assigned, if the input was an assignment
    pub assigned: Option<String>,
    /// Computed value
    pub value: f64,
}

/// Evaluates `input` against `vars`, binding the result on success.
pub fn evaluate(input: &str, vars: &mut HashMap<String, f64>) -> CalcResult<Evaluation> {
    if input.chars().count() > MAX_INPUT_LEN {
        return Err(CalcError::TooLong);
    }
    let tokens = tokenize(input)?;

    let (target, body) = match tokens.as_slice() {
        [Token::Ident(name), Token::Assign, rest @ ..] => (Some(name.clone()), rest),
        all => (None, all),
    };
    if let Some(name) = &target {
        if constant(name).is_some() || FUNCTIONS.contains(&name.as_str()) {
            return Err(CalcError::Reserved(name.clone()));
        }
    }

    let mut parser = Parser {
        tokens: body,
        pos: 0,
        vars,
    };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(CalcError::UnexpectedToken(extra.describe()));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }

    if let Some(name) = &target {
        vars.insert(name.clone(), value);
    }
    vars.insert(ANSWER.to_string(), value);

    Ok(Evaluation {
        assigned: target,
        value,
    })
}

/// Formats a result without trailing zeros.
#[must_use]
pub fn format_number(value: f64) -> String {
    let rounded = format!("{value:.10}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Variables of every user, kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct CalculatorState {
    users: RwLock<HashMap<u64, HashMap<String, f64>>>,
}

impl CalculatorState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `input` with the user's variables.
    pub async fn evaluate(&self, user_id: u64, input: &str) -> CalcResult<Evaluation> {
        let mut users = self.users.write().await;
        let vars = users.entry(user_id).or_default();
        // Evaluate against a copy so a failure cannot leave partial bindings
        let mut scratch = vars.clone();
        let evaluation = evaluate(input, &mut scratch)?;
        *vars = scratch;
        Ok(evaluation)
    }

    /// The user's variables, sorted by name.
    pub async fn variables(&self, user_id: u64) -> Vec<(String, f64)> {
        let mut vars: Vec<_> = self
            .users
            .read()
            .await
            .get(&user_id)
            .map(|v| v.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        vars.sort_by(|a, b| a.0.cmp(&b.0));
        vars
    }

    /// Forgets the user's variables. Returns how many were bound.
    pub async fn clear(&self, user_id: u64) -> usize {
        self.users
            .write()
            .await
            .remove(&user_id)
            .map_or(0, |v| v.len())
    }
}
