use thiserror::Error;

use crate::ast::{
    AstBuilder, BinaryExpression, BinaryOp, CallExpression, Expression, ExpressionKind,
    Identifier, IndexExpression, Literal, SelectorExpression, SourceSpan, UnaryExpression,
    UnaryOp,
};
use crate::lexer::{LexError, Lexer, Token, TokenKind};

/// A syntax failure inside guard text, positioned in unit coordinates.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        Self {
            message: error.message,
            line: error.line,
            column: error.column,
        }
    }
}

/// Go binary-operator precedence, lowest first.
#[derive(Copy, Clone, PartialEq, PartialOrd)]
enum Precedence {
    Lowest = 0,
    Or,
    And,
    Comparison,
    Term,
    Factor,
}

impl Precedence {
    fn of(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::PipePipe => Some(Precedence::Or),
            TokenKind::AmpersandAmpersand => Some(Precedence::And),
            TokenKind::DoubleEqual
            | TokenKind::BangEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => Some(Precedence::Comparison),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Pipe | TokenKind::Caret => {
                Some(Precedence::Term)
            }
            TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Shl
            | TokenKind::Shr
            | TokenKind::Ampersand => Some(Precedence::Factor),
            _ => None,
        }
    }
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PipePipe => Some(BinaryOp::Or),
        TokenKind::AmpersandAmpersand => Some(BinaryOp::And),
        TokenKind::DoubleEqual => Some(BinaryOp::Eq),
        TokenKind::BangEqual => Some(BinaryOp::NotEq),
        TokenKind::Greater => Some(BinaryOp::Greater),
        TokenKind::GreaterEqual => Some(BinaryOp::GreaterEq),
        TokenKind::Less => Some(BinaryOp::Less),
        TokenKind::LessEqual => Some(BinaryOp::LessEq),
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Pipe => Some(BinaryOp::BitOr),
        TokenKind::Caret => Some(BinaryOp::BitXor),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Rem),
        TokenKind::Shl => Some(BinaryOp::Shl),
        TokenKind::Shr => Some(BinaryOp::Shr),
        TokenKind::Ampersand => Some(BinaryOp::BitAnd),
        _ => None,
    }
}

/// Parses guard text as a single Go expression. The guard's original
/// position seeds the lexer so every node and error lands on the right
/// spot in the unit. Anything but one complete expression is an error;
/// the caller reports it and drops the arm.
pub fn parse_guard_expression(
    text: &str,
    base_line: usize,
    base_column: usize,
    builder: &mut AstBuilder,
) -> Result<Expression, ParseError> {
    let tokens = Lexer::new(text, base_line, base_column).tokenize()?;
    let mut parser = GuardParser::new(tokens, builder);
    let expression = parser.parse_expression(Precedence::Lowest)?;
    parser.expect_eof()?;
    Ok(expression)
}

struct GuardParser<'a> {
    tokens: Vec<Token>,
    current: usize,
    builder: &'a mut AstBuilder,
}

impl<'a> GuardParser<'a> {
    fn new(tokens: Vec<Token>, builder: &'a mut AstBuilder) -> Self {
        Self {
            tokens,
            current: 0,
            builder,
        }
    }

    fn span_from_token(token: &Token) -> SourceSpan {
        let len = token.lexeme.chars().count().max(1);
        SourceSpan::new(
            token.line,
            token.column,
            token.line,
            token.column + len.saturating_sub(1),
        )
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some(next) = Precedence::of(self.peek_kind()) {
            if next <= precedence {
                break;
            }
            let operator_token = self.advance().clone();
            let operator = binary_operator(&operator_token.kind)
                .ok_or_else(|| self.error_for(&operator_token, "expected binary operator"))?;
            let right = self.parse_expression(next)?;
            let span = SourceSpan::union(&left.span, &right.span);
            left = self.builder.expr(
                span,
                ExpressionKind::Binary(BinaryExpression {
                    op: operator,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Star => Some(UnaryOp::Deref),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance().clone();
            let operand = self.parse_unary()?;
            let span = SourceSpan::union(&Self::span_from_token(&token), &operand.span);
            return Ok(self.builder.expr(
                span,
                ExpressionKind::Unary(UnaryExpression {
                    op,
                    operand: Box::new(operand),
                }),
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expression = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance().clone();
                    if token.kind != TokenKind::Identifier {
                        return Err(self.error_for(&token, "expected field name after '.'"));
                    }
                    let span = SourceSpan::union(&expression.span, &Self::span_from_token(&token));
                    expression = self.builder.expr(
                        span,
                        ExpressionKind::Selector(SelectorExpression {
                            object: Box::new(expression),
                            field: token.lexeme,
                        }),
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek_kind() != &TokenKind::RParen {
                        loop {
                            args.push(self.parse_expression(Precedence::Lowest)?);
                            if self.peek_kind() == &TokenKind::Comma {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    let closing = self.advance().clone();
                    if closing.kind != TokenKind::RParen {
                        return Err(self.error_for(&closing, "expected ')' after call arguments"));
                    }
                    let span = SourceSpan::union(&expression.span, &Self::span_from_token(&closing));
                    expression = self.builder.expr(
                        span,
                        ExpressionKind::Call(CallExpression {
                            callee: Box::new(expression),
                            args,
                        }),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression(Precedence::Lowest)?;
                    let closing = self.advance().clone();
                    if closing.kind != TokenKind::RBracket {
                        return Err(self.error_for(&closing, "expected ']' after index"));
                    }
                    let span = SourceSpan::union(&expression.span, &Self::span_from_token(&closing));
                    expression = self.builder.expr(
                        span,
                        ExpressionKind::Index(IndexExpression {
                            object: Box::new(expression),
                            index: Box::new(index),
                        }),
                    );
                }
                _ => break,
            }
        }

        Ok(expression)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance().clone();
        let span = Self::span_from_token(&token);
        match token.kind {
            TokenKind::Identifier => {
                if token.lexeme == "nil" {
                    return Ok(self.builder.expr(span, ExpressionKind::Literal(Literal::Nil)));
                }
                Ok(self.builder.expr(
                    span,
                    ExpressionKind::Identifier(Identifier { name: token.lexeme }),
                ))
            }
            TokenKind::IntLiteral(value) => {
                Ok(self.builder.expr(span, ExpressionKind::Literal(Literal::Int(value))))
            }
            TokenKind::FloatLiteral(value) => {
                Ok(self
                    .builder
                    .expr(span, ExpressionKind::Literal(Literal::Float(value))))
            }
            TokenKind::StringLiteral(value) => {
                Ok(self
                    .builder
                    .expr(span, ExpressionKind::Literal(Literal::Str(value))))
            }
            TokenKind::RuneLiteral(value) => {
                Ok(self
                    .builder
                    .expr(span, ExpressionKind::Literal(Literal::Rune(value))))
            }
            TokenKind::LParen => {
                let inner = self.parse_expression(Precedence::Lowest)?;
                let closing = self.advance().clone();
                if closing.kind != TokenKind::RParen {
                    return Err(self.error_for(&closing, "expected ')' to close grouping"));
                }
                let span = SourceSpan::union(&span, &Self::span_from_token(&closing));
                Ok(self
                    .builder
                    .expr(span, ExpressionKind::Grouping(Box::new(inner))))
            }
            TokenKind::Eof => Err(self.error_for(&token, "guard expression is incomplete")),
            _ => Err(self.error_for(
                &token,
                format!("unexpected token '{}' in guard expression", token.lexeme),
            )),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        let token = self.advance().clone();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error_for(
                &token,
                format!("unexpected trailing token '{}' after guard expression", token.lexeme),
            ))
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current.min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> &Token {
        let index = self.current.min(self.tokens.len() - 1);
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        &self.tokens[index]
    }

    fn error_for(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }
}
