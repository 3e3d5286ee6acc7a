use std::{fmt, rc::Rc};

use crate::{ast::LambdaAst, env::ScopeWeak, eval::Aplite, value::Value, AplResult};

/// A callable: a primitive reference, a user lambda with its closure
/// environment, an operator-derived function, or a host-registered native
#[derive(Clone)]
pub enum Function {
    Primitive(char),
    Lambda(Rc<Lambda>),
    Derived(Rc<Derived>),
    Native(Rc<Native>),
}

/// A function provided by the host, such as a data-loading primitive
pub struct Native {
    pub name: String,
    #[allow(clippy::type_complexity)]
    pub f: Box<dyn Fn(&mut Aplite, Option<Value>, Value) -> AplResult<Value>>,
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub ast: Rc<LambdaAst>,
    /// The scope the lambda was created in; reads through it fail once
    /// that scope has returned
    pub scope: ScopeWeak,
}

#[derive(Debug, Clone)]
pub struct Derived {
    pub op: char,
    pub f: Function,
    pub g: Option<Function>,
    pub axis: Option<i64>,
}

impl Function {
    /// The primitive glyph, if this is a plain primitive
    pub fn glyph(&self) -> Option<char> {
        match self {
            Function::Primitive(c) => Some(*c),
            _ => None,
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Primitive(a), Function::Primitive(b)) => a == b,
            (Function::Lambda(a), Function::Lambda(b)) => Rc::ptr_eq(a, b),
            (Function::Derived(a), Function::Derived(b)) => Rc::ptr_eq(a, b),
            (Function::Native(a), Function::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Primitive(c) => write!(f, "{c}"),
            Function::Lambda(_) => write!(f, "{{…}}"),
            Function::Native(n) => write!(f, "{}", n.name),
            Function::Derived(d) => {
                write!(f, "{}", d.f)?;
                if let Some(g) = &d.g {
                    write!(f, "{}{}", d.op, g)
                } else {
                    write!(f, "{}", d.op)
                }
            }
        }
    }
}
