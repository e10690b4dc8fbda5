use mixdown::RuntimeError;

use super::{BinaryOperator, Expr, UnaryOperator};

/// Nesting bound for parenthesized and bracketed sub-expressions.
const MAX_NESTING: usize = 256;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse expression code into an AST.
pub fn parse(code: &str) -> Result<Expr, RuntimeError> {
    let tokens = tokenize(code)?;
    let mut parser = ExprParser::new(tokens);
    let expr = parser.parse_expr(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(syntax(format!("unexpected {}", token.describe()))),
    }
}

fn syntax(message: impl Into<String>) -> RuntimeError {
    RuntimeError::Syntax(message.into())
}

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    Str(String),
    True,
    False,
    Null,

    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,       // ==
    EqEqEq,     // ===
    BangEq,     // !=
    BangEqEq,   // !==
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,     // &&
    PipePipe,   // ||
    Bang,       // !
    Question,   // ?
    Colon,      // :
    Comma,
    Dot,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(_) => "string".to_string(),
            Token::Ident(name) => format!("identifier '{}'", name),
            other => format!("{:?}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn tokenize(code: &str) -> Result<Vec<Token>, RuntimeError> {
    let chars: Vec<char> = code.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    // Longest operator first.
    const OPERATORS: &[(&str, Token)] = &[
        ("===", Token::EqEqEq),
        ("!==", Token::BangEqEq),
        ("==", Token::EqEq),
        ("!=", Token::BangEq),
        (">=", Token::GtEq),
        ("<=", Token::LtEq),
        ("&&", Token::AmpAmp),
        ("||", Token::PipePipe),
        ("+", Token::Plus),
        ("-", Token::Minus),
        ("*", Token::Star),
        ("/", Token::Slash),
        ("%", Token::Percent),
        (">", Token::Gt),
        ("<", Token::Lt),
        ("!", Token::Bang),
        ("?", Token::Question),
        (":", Token::Colon),
        (",", Token::Comma),
        (".", Token::Dot),
        ("(", Token::LParen),
        (")", Token::RParen),
        ("[", Token::LBracket),
        ("]", Token::RBracket),
        ("{", Token::LBrace),
        ("}", Token::RBrace),
    ];

    'outer: while i < len {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }

            // String literal
            '"' | '\'' => {
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(syntax("unterminated string literal")),
                        Some(&q) if q == c => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| syntax("unterminated string literal"))?;
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '0' => '\0',
                                other => *other,
                            });
                            i += 2;
                        }
                        Some(&other) => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }

            // Numbers
            '0'..='9' => {
                let start = i;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
                // A dot only belongs to the number when a digit follows it.
                if i + 1 < len && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < len && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < len && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < len && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < len && chars[j].is_ascii_digit() {
                        while j < len && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" | "undefined" => Token::Null,
                    _ => Token::Ident(ident),
                });
            }

            _ => {
                for (text, token) in OPERATORS {
                    let end = i + text.chars().count();
                    if end <= len && chars[i..end].iter().copied().eq(text.chars()) {
                        tokens.push(token.clone());
                        i = end;
                        continue 'outer;
                    }
                }
                return Err(syntax(format!("unexpected character '{}'", c)));
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2;   // ? :
const BP_OR: u8 = 4;            // ||
const BP_AND: u8 = 6;           // &&
const BP_EQUALITY: u8 = 8;      // == != === !==
const BP_COMPARISON: u8 = 10;   // < > <= >=
const BP_ADDITIVE: u8 = 12;     // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16;        // ! -

impl ExprParser {
    fn new(tokens: Vec<Token>) -> Self {
        ExprParser { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), RuntimeError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(syntax(format!(
                "expected {:?}, found {}",
                expected,
                token.describe()
            ))),
            None => Err(syntax(format!("expected {:?}, found end of expression", expected))),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, RuntimeError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(RuntimeError::StackOverflow);
        }
        let result = self.parse_expr_inner(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expr_inner(&mut self, min_bp: u8) -> Result<Expr, RuntimeError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token) else { break };

            if l_bp < min_bp {
                break;
            }

            // Conditional operator: right-associative, both branches required
            if *token == Token::Question {
                self.advance();
                let then = self.parse_expr(0)?;
                self.expect(Token::Colon)?;
                let otherwise = self.parse_expr(r_bp)?;
                left = Expr::Conditional {
                    condition: Box::new(left),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                };
                continue;
            }

            let operator = match self.advance() {
                Some(Token::Plus) => BinaryOperator::Addition,
                Some(Token::Minus) => BinaryOperator::Subtraction,
                Some(Token::Star) => BinaryOperator::Multiplication,
                Some(Token::Slash) => BinaryOperator::Division,
                Some(Token::Percent) => BinaryOperator::Modulo,
                Some(Token::EqEq) => BinaryOperator::Equality,
                Some(Token::BangEq) => BinaryOperator::Inequality,
                Some(Token::EqEqEq) => BinaryOperator::StrictEquality,
                Some(Token::BangEqEq) => BinaryOperator::StrictInequality,
                Some(Token::Gt) => BinaryOperator::GreaterThan,
                Some(Token::Lt) => BinaryOperator::LessThan,
                Some(Token::GtEq) => BinaryOperator::GreaterThanOrEqual,
                Some(Token::LtEq) => BinaryOperator::LessThanOrEqual,
                Some(Token::AmpAmp) => BinaryOperator::LogicalAnd,
                Some(Token::PipePipe) => BinaryOperator::LogicalOr,
                _ => return Err(syntax("unexpected infix operator")),
            };
            let right = self.parse_expr(r_bp)?;

            left = Expr::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, RuntimeError> {
        let token = self
            .advance()
            .ok_or_else(|| syntax("unexpected end of expression"))?;

        let primary = match token {
            // Unary operators
            Token::Bang => {
                let operand = self.parse_expr(BP_UNARY)?;
                return Ok(Expr::Unary {
                    operator: UnaryOperator::LogicalNot,
                    operand: Box::new(operand),
                });
            }
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                return Ok(Expr::Unary {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                });
            }
            Token::Plus => return self.parse_expr(BP_UNARY),

            // Literals
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::String(s),
            Token::True => Expr::Boolean(true),
            Token::False => Expr::Boolean(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => Expr::Identifier(name),

            // Parenthesized expression
            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                expr
            }

            Token::LBracket => Expr::Array(self.parse_list(Token::RBracket)?),
            Token::LBrace => self.parse_object()?,

            other => return Err(syntax(format!("unexpected {}", other.describe()))),
        };

        self.parse_postfix(primary)
    }

    /// Member access, indexing and calls, left to right.
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, RuntimeError> {
        loop {
            if self.eat(&Token::Dot) {
                let property = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    // Keywords are valid property names.
                    Some(Token::True) => "true".to_string(),
                    Some(Token::False) => "false".to_string(),
                    Some(Token::Null) => "null".to_string(),
                    _ => return Err(syntax("expected a property name after '.'")),
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr(0)?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::LParen) {
                let arguments = self.parse_list(Token::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`. A trailing comma is allowed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, RuntimeError> {
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(items);
            }
            items.push(self.parse_expr(0)?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    /// `{ key: value, "quoted": value, shorthand }`
    fn parse_object(&mut self) -> Result<Expr, RuntimeError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }

            let key = match self.advance() {
                Some(Token::Ident(name)) => name,
                Some(Token::Str(s)) => s,
                Some(Token::Number(n)) => mixdown::RuntimeValue::Number(n).to_string(),
                _ => return Err(syntax("expected a property name in object literal")),
            };

            let value = if self.eat(&Token::Colon) {
                self.parse_expr(0)?
            } else {
                Expr::Identifier(key.clone())
            };
            entries.push((key, value));

            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace)?;
                return Ok(Expr::Object(entries));
            }
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Question => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::PipePipe => Some((BP_OR, BP_OR + 1)),
        Token::AmpAmp => Some((BP_AND, BP_AND + 1)),
        Token::EqEq | Token::BangEq | Token::EqEqEq | Token::BangEqEq => {
            Some((BP_EQUALITY, BP_EQUALITY + 1))
        }
        Token::Gt | Token::Lt | Token::GtEq | Token::LtEq => {
            Some((BP_COMPARISON, BP_COMPARISON + 1))
        }
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        _ => None,
    }
}
