use std::{error::Error, fmt, rc::Rc};

use crate::{
    ast::{Expr, FnExpr, LambdaAst, Stmt},
    lex::{Simple, Sp, Span, Token},
    num::Tower,
    primitive::Registry,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Unexpected(String),
    Unbalanced(char),
    ExpectedExpr,
    DanglingOperator(char),
    IllegalPhrase(String),
    BadNumber(String),
    BadAssignTarget,
    GuardOutsideLambda,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unexpected(t) => write!(f, "unexpected `{t}`"),
            ParseError::Unbalanced(c) => write!(f, "unbalanced `{c}`"),
            ParseError::ExpectedExpr => write!(f, "expected expression"),
            ParseError::DanglingOperator(c) => write!(f, "operator `{c}` needs a function"),
            ParseError::IllegalPhrase(m) => write!(f, "illegal phrase: {m}"),
            ParseError::BadNumber(s) => write!(f, "cannot parse number `{s}`"),
            ParseError::BadAssignTarget => write!(f, "cannot assign to this"),
            ParseError::GuardOutsideLambda => write!(f, "guard outside lambda"),
        }
    }
}

impl Error for ParseError {}

pub type ParseResult<T = ()> = Result<T, Sp<ParseError>>;

/// Parse a token stream into statements
///
/// The registry classifies glyphs as primitives or operators; the tower
/// interprets numeric lexemes.
pub fn parse(tokens: Vec<Sp<Token>>, reg: &Registry, tower: &Tower) -> ParseResult<Vec<Stmt>> {
    let mut parser = Parser {
        tokens,
        index: 0,
        reg,
        tower,
    };
    parser.stmts(false)
}

/// A classified phrase item
enum Item {
    Value(Sp<Expr>),
    Func(Sp<FnExpr>),
}

/// A folded phrase: a value expression, or a lone (derived) function
enum Folded {
    Value(Sp<Expr>),
    Func(Sp<FnExpr>),
}

/// What a phrase may run up against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Statement,
    Paren,
    Index,
    Axis,
}

/// The token that ended a phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    End,
    Diamond,
    Colon,
    Semicolon,
    CloseBracket,
    CloseParen,
    CloseCurly,
}

struct Parser<'a> {
    tokens: Vec<Sp<Token>>,
    index: usize,
    reg: &'a Registry,
    tower: &'a Tower,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Sp<Token>> {
        self.tokens.get(self.index)
    }
    fn next(&mut self) -> Option<Sp<Token>> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }
    fn last_span(&self) -> Span {
        self.tokens
            .get(self.index.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.span.clone())
            .unwrap_or(Span::Builtin)
    }
    fn err<T>(&self, e: ParseError) -> ParseResult<T> {
        Err(self.last_span().sp(e))
    }

    fn stmts(&mut self, in_lambda: bool) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            if in_lambda
                && matches!(
                    self.peek().map(|t| &t.value),
                    Some(Token::Simple(Simple::CloseCurly))
                )
            {
                break;
            }
            if self.peek().is_none() {
                break;
            }
            let (items, term) = self.items(in_lambda, Stop::Statement)?;
            let term = if let Term::Colon = term {
                if items.is_empty() {
                    return self.err(ParseError::ExpectedExpr);
                }
                let cond = fold_value(items)?;
                let (eitems, eterm) = self.items(in_lambda, Stop::Statement)?;
                if matches!(eterm, Term::Colon) {
                    return self.err(ParseError::Unexpected(":".into()));
                }
                if eitems.is_empty() {
                    return self.err(ParseError::ExpectedExpr);
                }
                let expr = fold_value(eitems)?;
                body.push(Stmt::Guard { cond, expr });
                eterm
            } else {
                if !items.is_empty() {
                    body.push(Stmt::Expr(fold_value(items)?));
                }
                term
            };
            match term {
                Term::Diamond => continue,
                Term::End | Term::CloseCurly => break,
                _ => unreachable!(),
            }
        }
        Ok(body)
    }

    /// Collect the classified items of one phrase
    ///
    /// Operators fold into derived functions as they arrive, since they
    /// bind tighter than function application.
    fn items(&mut self, in_lambda: bool, stop: Stop) -> ParseResult<(Vec<Item>, Term)> {
        let mut items: Vec<Item> = Vec::new();
        // A dyadic operator waiting for its right operand
        let mut pending: Option<(Sp<char>, Sp<FnExpr>)> = None;
        macro_rules! push_func {
            ($f:expr) => {{
                let f: Sp<FnExpr> = $f;
                if let Some((op, left)) = pending.take() {
                    let span = left.span.clone().merge(f.span.clone());
                    items.push(Item::Func(span.sp(FnExpr::Derived {
                        op: op.value,
                        f: Box::new(left.value),
                        g: Some(Box::new(f.value)),
                    })));
                } else {
                    items.push(Item::Func(f));
                }
            }};
        }
        let term = loop {
            let Some(token) = self.peek().cloned() else {
                match stop {
                    Stop::Statement => break Term::End,
                    Stop::Paren => return self.err(ParseError::Unbalanced('(')),
                    Stop::Index | Stop::Axis => return self.err(ParseError::Unbalanced('[')),
                }
            };
            let span = token.span.clone();
            match token.value {
                Token::Simple(Simple::Diamond) => match stop {
                    Stop::Statement => {
                        self.next();
                        break Term::Diamond;
                    }
                    _ => return self.err(ParseError::Unexpected("⋄".into())),
                },
                Token::Simple(Simple::Colon) => match stop {
                    Stop::Statement if in_lambda => {
                        self.next();
                        break Term::Colon;
                    }
                    Stop::Statement => return self.err(ParseError::GuardOutsideLambda),
                    _ => return self.err(ParseError::Unexpected(":".into())),
                },
                Token::Simple(Simple::Semicolon) => match stop {
                    Stop::Index => {
                        self.next();
                        break Term::Semicolon;
                    }
                    _ => return self.err(ParseError::Unexpected(";".into())),
                },
                Token::Simple(Simple::CloseParen) => match stop {
                    Stop::Paren => {
                        self.next();
                        break Term::CloseParen;
                    }
                    _ => return self.err(ParseError::Unbalanced(')')),
                },
                Token::Simple(Simple::CloseBracket) => match stop {
                    Stop::Index | Stop::Axis => {
                        self.next();
                        break Term::CloseBracket;
                    }
                    _ => return self.err(ParseError::Unbalanced(']')),
                },
                Token::Simple(Simple::CloseCurly) => match stop {
                    // Left for the lambda parser to consume
                    Stop::Statement if in_lambda => break Term::CloseCurly,
                    _ => return self.err(ParseError::Unbalanced('}')),
                },
                Token::Number(lexeme) => {
                    self.next();
                    let Some(n) = self.tower.parse(&lexeme) else {
                        return Err(span.sp(ParseError::BadNumber(lexeme)));
                    };
                    items.push(Item::Value(span.sp(Expr::Num(n))));
                }
                Token::Str(s) => {
                    self.next();
                    items.push(Item::Value(span.sp(Expr::Str(s.into()))));
                }
                Token::Ident(id) => {
                    self.next();
                    if id.is_function_name() {
                        push_func!(span.sp(FnExpr::Ident(id)));
                    } else {
                        items.push(Item::Value(span.sp(Expr::Ident(id))));
                    }
                }
                Token::Symbol(c) => {
                    self.next();
                    if c == '⍺' || c == '⍵' {
                        items.push(Item::Value(span.sp(Expr::Ident(c.to_string().into()))));
                    } else if self.reg.is_operator(c) {
                        let Some(Item::Func(f)) = items.pop() else {
                            return Err(span.sp(ParseError::DanglingOperator(c)));
                        };
                        if pending.is_some() {
                            return Err(span.sp(ParseError::DanglingOperator(c)));
                        }
                        if self.reg.operator_arity(c) == 2 {
                            pending = Some((span.sp(c), f));
                        } else {
                            let dspan = f.span.clone().merge(span);
                            items.push(Item::Func(dspan.sp(FnExpr::Derived {
                                op: c,
                                f: Box::new(f.value),
                                g: None,
                            })));
                        }
                    } else if self.reg.is_primitive(c) {
                        push_func!(span.sp(FnExpr::Prim(c)));
                    } else {
                        return Err(span.sp(ParseError::Unexpected(c.to_string())));
                    }
                }
                Token::Simple(Simple::SelfRef) => {
                    self.next();
                    if !in_lambda {
                        return Err(span.sp(ParseError::Unexpected("∇".into())));
                    }
                    push_func!(span.sp(FnExpr::SelfRef));
                }
                Token::Simple(Simple::OpenParen) => {
                    self.next();
                    let (inner, _) = self.items(in_lambda, Stop::Paren)?;
                    if inner.is_empty() {
                        return self.err(ParseError::ExpectedExpr);
                    }
                    match fold(inner)? {
                        Folded::Value(v) => items.push(Item::Value(v)),
                        Folded::Func(f) => push_func!(f),
                    }
                }
                Token::Simple(Simple::OpenCurly) => {
                    self.next();
                    let body = self.stmts(true)?;
                    match self.next().map(|t| t.value) {
                        Some(Token::Simple(Simple::CloseCurly)) => {}
                        _ => return self.err(ParseError::Unbalanced('{')),
                    }
                    push_func!(span.sp(FnExpr::Lambda(Rc::new(LambdaAst { body }))));
                }
                Token::Simple(Simple::OpenBracket) => {
                    self.next();
                    match items.pop() {
                        Some(Item::Value(value)) => {
                            let mut groups = Vec::new();
                            loop {
                                let (gitems, gterm) = self.items(in_lambda, Stop::Index)?;
                                let group = if gitems.is_empty() {
                                    None
                                } else {
                                    Some(fold_value(gitems)?)
                                };
                                groups.push(group);
                                match gterm {
                                    Term::Semicolon => continue,
                                    Term::CloseBracket => break,
                                    _ => unreachable!(),
                                }
                            }
                            let vspan = value.span.clone().merge(span);
                            items.push(Item::Value(vspan.sp(Expr::Index {
                                value: Box::new(value),
                                groups,
                            })));
                        }
                        Some(Item::Func(f)) => {
                            let (aitems, _) = self.items(in_lambda, Stop::Axis)?;
                            if aitems.is_empty() {
                                return self.err(ParseError::ExpectedExpr);
                            }
                            let axis = fold_value(aitems)?;
                            let fspan = f.span.clone().merge(span);
                            items.push(Item::Func(fspan.sp(FnExpr::Axis {
                                f: Box::new(f.value),
                                axis: Box::new(axis),
                            })));
                        }
                        None => return Err(span.sp(ParseError::Unexpected("[".into()))),
                    }
                }
                Token::Simple(Simple::Assign) => {
                    self.next();
                    let name = match items.pop() {
                        Some(Item::Value(Sp {
                            value: Expr::Ident(name),
                            ..
                        })) => name,
                        Some(Item::Func(Sp {
                            value: FnExpr::Ident(name),
                            ..
                        })) => name,
                        _ => return Err(span.sp(ParseError::BadAssignTarget)),
                    };
                    let (rest, rterm) = self.items(in_lambda, stop)?;
                    if rest.is_empty() {
                        return self.err(ParseError::ExpectedExpr);
                    }
                    let expr = match fold(rest)? {
                        Folded::Value(v) => v,
                        Folded::Func(f) => f.map(Expr::Fn),
                    };
                    let aspan = span.merge(expr.span.clone());
                    items.push(Item::Value(aspan.sp(Expr::Assign {
                        name,
                        expr: Box::new(expr),
                    })));
                    break rterm;
                }
            }
        };
        if pending.is_some() {
            return self.err(ParseError::ExpectedExpr);
        }
        Ok((items, term))
    }
}

fn fold_value(items: Vec<Item>) -> ParseResult<Sp<Expr>> {
    Ok(match fold(items)? {
        Folded::Value(v) => v,
        // Functions are first-class: a lone function phrase is its value
        Folded::Func(f) => f.map(Expr::Fn),
    })
}

/// Fold a phrase right to left
///
/// Consecutive values strand into a vector first; then, walking from the
/// right, a function is dyadic exactly when a value sits directly on its
/// left.
fn fold(items: Vec<Item>) -> ParseResult<Folded> {
    // Strand adjacent values
    let mut grouped: Vec<Item> = Vec::new();
    let mut strand: Vec<Sp<Expr>> = Vec::new();
    for item in items {
        match item {
            Item::Value(v) => strand.push(v),
            func => {
                flush_strand(&mut grouped, &mut strand);
                grouped.push(func);
            }
        }
    }
    flush_strand(&mut grouped, &mut strand);

    let mut items = grouped;
    let mut acc = match items.pop() {
        None => return Err(Span::Builtin.sp(ParseError::ExpectedExpr)),
        Some(Item::Value(v)) => v,
        Some(Item::Func(f)) => {
            return if items.is_empty() {
                Ok(Folded::Func(f))
            } else {
                Err(f.span.sp(ParseError::IllegalPhrase(
                    "function is missing its right argument".into(),
                )))
            };
        }
    };
    while let Some(item) = items.pop() {
        match item {
            Item::Func(f) => {
                let left = match items.last() {
                    Some(Item::Value(_)) => match items.pop() {
                        Some(Item::Value(v)) => Some(Box::new(v)),
                        _ => unreachable!(),
                    },
                    _ => None,
                };
                let mut span = f.span.clone().merge(acc.span.clone());
                if let Some(l) = &left {
                    span = span.merge(l.span.clone());
                }
                acc = span.sp(Expr::Apply {
                    f: f.value,
                    left,
                    right: Box::new(acc),
                });
            }
            Item::Value(v) => {
                return Err(v.span.sp(ParseError::IllegalPhrase(
                    "two values with nothing between them".into(),
                )));
            }
        }
    }
    Ok(Folded::Value(acc))
}

fn flush_strand(grouped: &mut Vec<Item>, strand: &mut Vec<Sp<Expr>>) {
    match strand.len() {
        0 => {}
        1 => grouped.push(Item::Value(strand.pop().unwrap())),
        _ => {
            let elems: Vec<Sp<Expr>> = std::mem::take(strand);
            let span = elems
                .first()
                .unwrap()
                .span
                .clone()
                .merge(elems.last().unwrap().span.clone());
            grouped.push(Item::Value(span.sp(Expr::Vector(elems))));
        }
    }
}
