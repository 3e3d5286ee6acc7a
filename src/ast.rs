use std::rc::Rc;

use ecow::EcoString;

use crate::{lex::Sp, num::Num, Ident};

/// A statement of a program or lambda body
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Sp<Expr>),
    /// `cond : expr` inside a lambda; fires and returns early when the
    /// condition is a nonzero number
    Guard { cond: Sp<Expr>, expr: Sp<Expr> },
}

/// A value-producing expression
///
/// The parser emits a right-heavy tree: evaluating arguments right to
/// left in post order is the APL reading.
#[derive(Debug, Clone)]
pub enum Expr {
    Num(Num),
    Str(EcoString),
    Ident(Ident),
    /// A strand of juxtaposed values
    Vector(Vec<Sp<Expr>>),
    Apply {
        f: FnExpr,
        left: Option<Box<Sp<Expr>>>,
        right: Box<Sp<Expr>>,
    },
    Assign {
        name: Ident,
        expr: Box<Sp<Expr>>,
    },
    Index {
        value: Box<Sp<Expr>>,
        /// One group per axis; an empty group selects the whole axis
        groups: Vec<Option<Sp<Expr>>>,
    },
    /// A function used as a value, e.g. the right side of `f←+`
    Fn(FnExpr),
}

/// A function-position expression
#[derive(Debug, Clone)]
pub enum FnExpr {
    Prim(char),
    Ident(Ident),
    Lambda(Rc<LambdaAst>),
    /// `∇`, the enclosing lambda
    SelfRef,
    Derived {
        op: char,
        f: Box<FnExpr>,
        g: Option<Box<FnExpr>>,
    },
    Axis {
        f: Box<FnExpr>,
        axis: Box<Sp<Expr>>,
    },
}

#[derive(Debug, Clone)]
pub struct LambdaAst {
    pub body: Vec<Stmt>,
}
