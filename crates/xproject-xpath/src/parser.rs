//! XPath lexer and recursive-descent parser.

use thiserror::Error;

use crate::functions::check_arity;
use crate::types::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unclosed string literal at offset {0}")]
    UnclosedString(usize),
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
    #[error("unknown axis {0:?}")]
    UnknownAxis(String),
    #[error("unknown function {0}()")]
    UnknownFunction(String),
    #[error("{name}() does not accept {got} argument(s)")]
    Arity { name: String, got: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Plus,
    Minus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    DoubleColon,
    /// `*` as a name test.
    Star,
    /// `*` as the multiplication operator.
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    Name(String),
}

impl Token {
    /// Whether a `*` or NCName following this token is an operator
    /// (XPath 1.0 §3.7 disambiguation rule).
    fn precedes_operator(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Equal
                | Token::NotEqual
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual
                | Token::Multiply
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
        )
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    tokens: Vec<(Token, usize)>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn operator_context(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|(token, _)| token.precedes_operator())
    }

    fn run(mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let start = self.offset();
            let token = match c {
                '/' if self.peek_at(1) == Some('/') => {
                    self.pos += 2;
                    Token::DoubleSlash
                }
                '/' => self.single(Token::Slash),
                '.' if self.peek_at(1) == Some('.') => {
                    self.pos += 2;
                    Token::DotDot
                }
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                '.' => self.single(Token::Dot),
                '@' => self.single(Token::At),
                ',' => self.single(Token::Comma),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '|' => self.single(Token::Pipe),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '=' => self.single(Token::Equal),
                '!' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::NotEqual
                }
                '<' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::LessEqual
                }
                '<' => self.single(Token::Less),
                '>' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::GreaterEqual
                }
                '>' => self.single(Token::Greater),
                ':' if self.peek_at(1) == Some(':') => {
                    self.pos += 2;
                    Token::DoubleColon
                }
                '*' => {
                    if self.operator_context() {
                        self.single(Token::Multiply)
                    } else {
                        self.single(Token::Star)
                    }
                }
                '"' | '\'' => self.literal(c)?,
                '0'..='9' => self.number()?,
                c if is_name_start(c) => self.name(),
                other => return Err(ParseError::UnexpectedChar(other, start)),
            };
            self.tokens.push((token, start));
        }
        Ok(self.tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn literal(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.offset();
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Token::Literal(value));
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
                None => return Err(ParseError::UnclosedString(start)),
            }
        }
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let start = self.offset();
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot && self.peek_at(1) != Some('.') {
                seen_dot = true;
                text.push(c);
            } else {
                break;
            }
            self.pos += 1;
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ParseError::InvalidNumber(start))
    }

    fn name(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                name.push(c);
                self.pos += 1;
            } else if c == ':' && self.peek_at(1) != Some(':') {
                // prefix:local or prefix:*
                name.push(c);
                self.pos += 1;
                if self.peek() == Some('*') {
                    name.push('*');
                    self.pos += 1;
                    break;
                }
            } else {
                break;
            }
        }
        if self.operator_context() {
            match name.as_str() {
                "and" => return Token::And,
                "or" => return Token::Or,
                "div" => return Token::Div,
                "mod" => return Token::Mod,
                _ => {}
            }
        }
        Token::Name(name)
    }
}

const NODE_TYPES: &[&str] = &["node", "text", "comment"];

/// XPath parser.
pub struct XPathParser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl XPathParser {
    /// Parse an XPath expression.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        let tokens = Lexer::new(input).run()?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let mut parser = Self {
            tokens,
            pos: 0,
            end: input.len(),
        };
        let expr = parser.parse_or()?;
        if parser.pos < parser.tokens.len() {
            return Err(ParseError::UnexpectedToken(parser.offset()));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, o)| *o)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
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

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        if self.pos >= self.tokens.len() {
            ParseError::UnexpectedEnd
        } else {
            ParseError::UnexpectedToken(self.offset())
        }
    }

    fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Self::binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = Self::binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Equal) => BinaryOperator::Equal,
                Some(Token::NotEqual) => BinaryOperator::NotEqual,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_relational()?;
            left = Self::binary(operator, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Less) => BinaryOperator::Less,
                Some(Token::LessEqual) => BinaryOperator::LessEqual,
                Some(Token::Greater) => BinaryOperator::Greater,
                Some(Token::GreaterEqual) => BinaryOperator::GreaterEqual,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Self::binary(operator, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Self::binary(operator, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Multiply) => BinaryOperator::Multiply,
                Some(Token::Div) => BinaryOperator::Divide,
                Some(Token::Mod) => BinaryOperator::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Self::binary(operator, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_expr()?;
            left = Self::binary(BinaryOperator::Union, left, right);
        }
        Ok(left)
    }

    fn starts_filter_expr(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !NODE_TYPES.contains(&name.as_str())
            }
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.starts_filter_expr() {
            return Ok(Expr::Path(self.parse_location_path()?));
        }
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        if matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            self.parse_relative_steps(&mut steps, true)?;
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, ParseError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.starts_step() {
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };
        steps.push(self.parse_step()?);
        self.parse_relative_steps(&mut steps, false)?;
        Ok(LocationPath { absolute, steps })
    }

    /// Parses `(/ step | // step)*`; with `leading` at least one separator
    /// is required.
    fn parse_relative_steps(&mut self, steps: &mut Vec<Step>, leading: bool) -> Result<(), ParseError> {
        let mut required = leading;
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ if required => return Err(self.unexpected()),
                _ => return Ok(()),
            }
            required = false;
            steps.push(self.parse_step()?);
        }
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }
        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) = (self.peek(), self.peek_at(1)) {
            let axis = Axis::from_name(name).ok_or_else(|| ParseError::UnknownAxis(name.clone()))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };
        let test = self.parse_node_test()?;
        let mut step = Step::new(axis, test);
        step.predicates = self.parse_predicates()?;
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, ParseError> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Wildcard),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) && NODE_TYPES.contains(&name.as_str()) {
                    self.pos += 1;
                    self.expect(&Token::RParen)?;
                    return Ok(match name.as_str() {
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        _ => NodeTest::Node,
                    });
                }
                Ok(NodeTest::Name(name))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Name(name)) => {
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                check_arity(&name, args.len())?;
                Ok(Expr::Function { name, args })
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(input: &str) -> LocationPath {
        match XPathParser::parse(input).unwrap() {
            Expr::Path(path) => path,
            other => panic!("expected location path for {input}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_absolute_path() {
        let p = path("/a/b");
        assert!(p.absolute);
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[1].test, NodeTest::Name("b".to_string()));
    }

    #[test]
    fn test_parse_root_only() {
        let p = path("/");
        assert!(p.absolute);
        assert!(p.steps.is_empty());
    }

    #[test]
    fn test_parse_double_slash_expands() {
        let p = path("//a");
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(p.steps[1].axis, Axis::Child);
    }

    #[test]
    fn test_parse_attribute_and_axes() {
        let p = path("ancestor::x/@id");
        assert_eq!(p.steps[0].axis, Axis::Ancestor);
        assert_eq!(p.steps[1].axis, Axis::Attribute);
        assert!(matches!(
            XPathParser::parse("bogus::x"),
            Err(ParseError::UnknownAxis(_))
        ));
    }

    #[test]
    fn test_star_disambiguation() {
        let p = path("/*");
        assert_eq!(p.steps[0].test, NodeTest::Wildcard);
        let expr = XPathParser::parse("2 * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                operator: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_operator_names_are_contextual() {
        // `and` is a plain element name at the start of a step.
        let p = path("/and/or");
        assert_eq!(p.steps[0].test, NodeTest::Name("and".to_string()));
        let expr = XPathParser::parse("a and b").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                operator: BinaryOperator::And,
                ..
            }
        ));
    }

    #[test]
    fn test_predicates_and_functions() {
        let p = path(r#"/a/b[@name="x"][2]"#);
        assert_eq!(p.steps[1].predicates.len(), 2);
        let expr = XPathParser::parse("count(/a/b)").unwrap();
        assert!(matches!(expr, Expr::Function { .. }));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(
            XPathParser::parse("frobnicate()"),
            Err(ParseError::UnknownFunction("frobnicate".to_string()))
        );
        assert!(matches!(
            XPathParser::parse("count()"),
            Err(ParseError::Arity { .. })
        ));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(XPathParser::parse(""), Err(ParseError::Empty));
        assert_eq!(XPathParser::parse("/a/"), Err(ParseError::UnexpectedEnd));
        assert!(XPathParser::parse("/a[").is_err());
        assert!(XPathParser::parse("'open").is_err());
        assert!(XPathParser::parse("/a b").is_err());
        assert!(XPathParser::parse("#").is_err());
    }

    #[test]
    fn test_filter_expression_with_steps() {
        let expr = XPathParser::parse("(/a | /b)[1]/c").unwrap();
        match expr {
            Expr::Filter {
                predicates, steps, ..
            } => {
                assert_eq!(predicates.len(), 1);
                assert_eq!(steps.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
