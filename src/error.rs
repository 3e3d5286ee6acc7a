use std::{error::Error, fmt};

use colored::*;

use crate::{
    lex::{LexError, Sp},
    parse::ParseError,
};

/// An error produced while scanning, parsing or evaluating a line
#[derive(Debug, Clone)]
#[must_use]
pub enum AplError {
    Lex(Sp<LexError>),
    Parse(Sp<ParseError>),
    /// Unbound identifier, or assignment to a read-only system variable
    Name(String),
    /// Operation applied to an array of the wrong rank
    Rank(String),
    /// Mismatched shapes in an elementwise operation
    Length(String),
    /// Value outside a primitive's domain, or unsatisfiable dispatch
    Domain(String),
    /// Out-of-bounds subscript
    Index(String),
    /// Internal invariant violation
    Run(String),
}

/// The engine's result type
pub type AplResult<T = ()> = Result<T, AplError>;

impl AplError {
    pub(crate) fn name(msg: impl Into<String>) -> Self {
        Self::Name(msg.into())
    }
    pub(crate) fn rank(msg: impl Into<String>) -> Self {
        Self::Rank(msg.into())
    }
    pub(crate) fn length(msg: impl Into<String>) -> Self {
        Self::Length(msg.into())
    }
    pub(crate) fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }
    pub(crate) fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }
    pub(crate) fn run(msg: impl Into<String>) -> Self {
        Self::Run(msg.into())
    }
    /// The taxonomy name of the error
    pub fn kind(&self) -> &'static str {
        match self {
            AplError::Lex(_) => "lex error",
            AplError::Parse(_) => "parse error",
            AplError::Name(_) => "name error",
            AplError::Rank(_) => "rank error",
            AplError::Length(_) => "length error",
            AplError::Domain(_) => "domain error",
            AplError::Index(_) => "index error",
            AplError::Run(_) => "runtime error",
        }
    }
    /// A colored, human-facing rendering of the error
    pub fn report(&self) -> String {
        format!("{}: {}", self.kind().red().bold(), self.message())
    }
    fn message(&self) -> String {
        match self {
            AplError::Lex(e) => e.to_string(),
            AplError::Parse(e) => e.to_string(),
            AplError::Name(m)
            | AplError::Rank(m)
            | AplError::Length(m)
            | AplError::Domain(m)
            | AplError::Index(m)
            | AplError::Run(m) => m.clone(),
        }
    }
}

impl fmt::Display for AplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl Error for AplError {}

impl From<Sp<LexError>> for AplError {
    fn from(e: Sp<LexError>) -> Self {
        Self::Lex(e)
    }
}

impl From<Sp<ParseError>> for AplError {
    fn from(e: Sp<ParseError>) -> Self {
        Self::Parse(e)
    }
}
