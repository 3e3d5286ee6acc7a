use std::fmt;

use ecow::{EcoString, EcoVec};

use crate::{
    array::Array,
    format,
    function::Function,
    num::{num_eq, Num, NumKind},
    object::Dict,
};

/// Everything the evaluator handles
#[derive(Debug, Clone)]
pub enum Value {
    Num(Num),
    Char(char),
    Str(EcoString),
    Array(Array),
    List(List),
    Dict(Dict),
    Func(Function),
}

/// A nested sequence, as produced by the ingestion subsystem
///
/// Lists print as `(e1;e2;)`, every element followed by a semicolon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct List(pub EcoVec<Value>);

impl List {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

/// The stable kind labels of the closed value sum
///
/// These double as the dispatch keys of the registry and as the type
/// identifiers `⎕PP` format maps select on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Ratio,
    Float,
    Complex,
    Char,
    Str,
    Array,
    List,
    Dict,
    Func,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Int => "integer",
            Kind::Ratio => "rational",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::Char => "character",
            Kind::Str => "string",
            Kind::Array => "array",
            Kind::List => "list",
            Kind::Dict => "dict",
            Kind::Func => "function",
        };
        write!(f, "{name}")
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Num(n) => match n.kind() {
                NumKind::Int => Kind::Int,
                NumKind::Ratio => Kind::Ratio,
                NumKind::Float => Kind::Float,
                NumKind::Complex => Kind::Complex,
            },
            Value::Char(_) => Kind::Char,
            Value::Str(_) => Kind::Str,
            Value::Array(_) => Kind::Array,
            Value::List(_) => Kind::List,
            Value::Dict(_) => Kind::Dict,
            Value::Func(_) => Kind::Func,
        }
    }
    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }
    /// Interpret as an index or count
    pub fn as_index(&self) -> Option<i64> {
        self.as_num().and_then(|n| n.as_index())
    }
    /// A guard condition: a nonzero number
    pub fn is_true(&self) -> Option<bool> {
        self.as_num().map(|n| !n.is_zero())
    }
    /// Whether the value broadcasts as a scalar under pervasion
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Numeric equality is kind-blind: 2 equals 2.0
            (Value::Num(a), Value::Num(b)) => num_eq(*a, *b, 0.0),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format::format_value(self, &Default::default()) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

impl From<Num> for Value {
    fn from(n: Num) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Num(Num::Int(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Num(Num::Float(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Num(Num::Int(b as i64))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Func(f)
    }
}
