//! A small, side-effect-free expression grammar compiled once per rule at
//! install time and evaluated by a direct tree-walk with no allocation on
//! the hot path (§4.5, §9). There is no loop, no IO and no recursion
//! unbounded by the expression's own (finite, parsed-once) structure, so
//! evaluation is always bounded.
//!
//! Grammar (highest to lowest precedence):
//!   atom       := IDENT | IDENT "(" args ")" | STRING | INT | "(" expr ")"
//!   comparison := atom [ ("==" | "!=" | "<" | ">" | "<=" | ">=") atom ]
//!   unary      := "!" unary | comparison
//!   and_expr   := unary ( "&&" unary )*
//!   or_expr    := and_expr ( "||" and_expr )*
//!   expr       := or_expr

use super::context::{Context, FieldValue};
use crate::errors::DomainError;
use crate::subnet::ip_in_cidr;
use fancy_regex::Regex;

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    DomainMatches,
    DomainEndsWith,
    DomainStartsWith,
    IpInCidr,
    InTimeRange,
    DomainRegex,
}

impl Helper {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "DomainMatches" => Helper::DomainMatches,
            "DomainEndsWith" => Helper::DomainEndsWith,
            "DomainStartsWith" => Helper::DomainStartsWith,
            "IPInCIDR" => Helper::IpInCidr,
            "InTimeRange" => Helper::InTimeRange,
            "DomainRegex" => Helper::DomainRegex,
            _ => return None,
        })
    }

    fn arity(&self) -> usize {
        match self {
            Helper::DomainMatches | Helper::DomainEndsWith | Helper::DomainStartsWith => 2,
            Helper::IpInCidr | Helper::DomainRegex => 2,
            Helper::InTimeRange => 6,
        }
    }
}

/// A single compiled expression node. The tree is built once at compile
/// time; `eval` never allocates except for helper calls that must own a
/// `String` result (none currently do — all helpers return `bool`).
#[derive(Debug, Clone)]
enum Expr {
    Literal(Literal),
    Field(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Call(Helper, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Expr {
    fn eval(&self, ctx: &Context) -> Result<Value, String> {
        match self {
            Expr::Literal(Literal::Str(s)) => Ok(Value::Str(s.clone())),
            Expr::Literal(Literal::Int(i)) => Ok(Value::Int(*i)),
            Expr::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
            Expr::Field(name) => match ctx.field(name) {
                Some(FieldValue::Str(s)) => Ok(Value::Str(s.to_string())),
                Some(FieldValue::ClientIp(ip)) => Ok(Value::Str(ip.to_string())),
                Some(FieldValue::Int(i)) => Ok(Value::Int(i)),
                None => Err(format!("unknown field '{name}'")),
            },
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(ctx)?.truthy()?)),
            Expr::And(lhs, rhs) => {
                if !lhs.eval(ctx)?.truthy()? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(rhs.eval(ctx)?.truthy()?))
            }
            Expr::Or(lhs, rhs) => {
                if lhs.eval(ctx)?.truthy()? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(rhs.eval(ctx)?.truthy()?))
            }
            Expr::Cmp(op, lhs, rhs) => {
                let l = lhs.eval(ctx)?;
                let r = rhs.eval(ctx)?;
                Ok(Value::Bool(compare(*op, &l, &r)?))
            }
            Expr::Call(helper, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                eval_helper(*helper, &values)
            }
        }
    }
}

impl Value {
    fn truthy(&self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(format!("expected bool, got {other:?}")),
        }
    }

    fn as_str(&self) -> Result<&str, String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(format!("expected string, got {other:?}")),
        }
    }

    fn as_int(&self) -> Result<i64, String> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(format!("expected int, got {other:?}")),
        }
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool, String> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => return Err("ordering comparisons require int operands".into()),
        }),
        (Value::Bool(a), Value::Bool(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => return Err("ordering comparisons require int operands".into()),
        }),
        (Value::Int(a), Value::Int(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        }),
        _ => Err(format!("type mismatch comparing {l:?} and {r:?}")),
    }
}

fn eval_helper(helper: Helper, args: &[Value]) -> Result<Value, String> {
    if args.len() != helper.arity() {
        return Err(format!(
            "{helper:?} expects {} arguments, got {}",
            helper.arity(),
            args.len()
        ));
    }
    let result = match helper {
        Helper::DomainMatches => args[0].as_str()?.contains(args[1].as_str()?),
        Helper::DomainEndsWith => args[0].as_str()?.ends_with(args[1].as_str()?),
        Helper::DomainStartsWith => args[0].as_str()?.starts_with(args[1].as_str()?),
        Helper::IpInCidr => ip_in_cidr(args[0].as_str()?, args[1].as_str()?),
        Helper::DomainRegex => {
            let re = Regex::new(args[1].as_str()?).map_err(|e| e.to_string())?;
            re.is_match(args[0].as_str()?).unwrap_or(false)
        }
        Helper::InTimeRange => {
            let hour = args[0].as_int()?;
            let minute = args[1].as_int()?;
            let start_h = args[2].as_int()?;
            let start_m = args[3].as_int()?;
            let end_h = args[4].as_int()?;
            let end_m = args[5].as_int()?;
            let now = hour * 60 + minute;
            let start = start_h * 60 + start_m;
            let end = end_h * 60 + end_m;
            if start <= end {
                now >= start && now <= end
            } else {
                // wraps past midnight
                now >= start || now <= end
            }
        }
    };
    Ok(Value::Bool(result))
}

// ---------------------------------------------------------------------
// Tokenizer + recursive-descent parser
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err("unterminated string literal".into());
                }
                tokens.push(Token::Str(chars[start..i].iter().collect()));
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| format!("invalid integer literal '{text}'"))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(tok) if &tok == expected => Ok(()),
            other => Err(format!("expected {expected:?}, found {other:?}")),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_atom()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_atom()?;
        Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Literal::Int(i))),
            Some(Token::Ident(name)) => {
                if name == "true" {
                    return Ok(Expr::Literal(Literal::Bool(true)));
                }
                if name == "false" {
                    return Ok(Expr::Literal(Literal::Bool(false)));
                }
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    let helper = Helper::from_name(&name)
                        .ok_or_else(|| format!("unknown helper function '{name}'"))?;
                    return Ok(Expr::Call(helper, args));
                }
                Ok(Expr::Field(name))
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// A compiled, type-checked policy rule expression. Immutable once built;
/// safe to evaluate concurrently from any number of readers.
#[derive(Debug, Clone)]
pub struct CompiledExpr(Expr);

impl CompiledExpr {
    /// Parses and (lightly) type-checks `source` against the context
    /// environment. Type errors that can only be detected with concrete
    /// values (e.g. comparing a string field to an int literal) are caught
    /// at evaluation time instead, per §4.5: "expressions that error at
    /// evaluation are logged and treated as non-matching".
    pub fn compile(source: &str) -> Result<Self, DomainError> {
        let tokens = tokenize(source).map_err(DomainError::ConfigError)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expr().map_err(DomainError::ConfigError)?;
        if parser.pos != parser.tokens.len() {
            return Err(DomainError::ConfigError(format!(
                "trailing tokens after expression '{source}'"
            )));
        }
        validate_field_refs(&expr).map_err(DomainError::ConfigError)?;
        Ok(Self(expr))
    }

    pub fn evaluate(&self, ctx: &Context) -> Result<bool, String> {
        self.0.eval(ctx)?.truthy()
    }
}

/// Rejects references to fields the `Context` does not expose, at compile
/// time rather than on every evaluation.
fn validate_field_refs(expr: &Expr) -> Result<(), String> {
    const KNOWN: &[&str] = &["Domain", "ClientIP", "QueryType", "Hour", "Minute", "Day", "Month", "Weekday"];
    match expr {
        Expr::Field(name) if !KNOWN.contains(&name.as_str()) => {
            Err(format!("unknown context field '{name}'"))
        }
        Expr::Not(inner) => validate_field_refs(inner),
        Expr::And(l, r) | Expr::Or(l, r) | Expr::Cmp(_, l, r) => {
            validate_field_refs(l)?;
            validate_field_refs(r)
        }
        Expr::Call(_, args) => args.iter().try_for_each(validate_field_refs),
        _ => Ok(()),
    }
}
