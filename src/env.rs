use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{value::Value, AplError, AplResult, Ident};

pub type ScopeRef = Rc<RefCell<Frame>>;
pub type ScopeWeak = Weak<RefCell<Frame>>;

/// One lexical scope
///
/// The parent link is weak: a lambda holds on to the scope it was created
/// in only abstractly, and reading through a scope that has returned is a
/// name error rather than an extension of its lifetime.
#[derive(Debug, Default)]
pub struct Frame {
    pub vars: IndexMap<Ident, Value>,
    pub parent: Option<ScopeWeak>,
}

/// The stack of scopes the evaluator runs against
#[derive(Debug)]
pub struct Env {
    stack: Vec<ScopeRef>,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            stack: vec![Rc::new(RefCell::new(Frame::default()))],
        }
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }
    /// The root scope holding top-level bindings
    pub fn root(&self) -> &ScopeRef {
        &self.stack[0]
    }
    /// The innermost scope
    pub fn current(&self) -> &ScopeRef {
        self.stack.last().unwrap()
    }
    /// A weak handle to the innermost scope, for lambdas to capture
    pub fn capture(&self) -> ScopeWeak {
        Rc::downgrade(self.current())
    }
    /// Enter a fresh frame whose lexical parent is the given scope
    pub fn push(&mut self, parent: ScopeWeak) {
        self.stack.push(Rc::new(RefCell::new(Frame {
            vars: IndexMap::new(),
            parent: Some(parent),
        })));
    }
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "cannot pop the root scope");
        self.stack.pop();
    }
    /// Resolve a name through the lexical chain
    pub fn lookup(&self, name: &Ident) -> AplResult<Option<Value>> {
        let mut frame = self.current().clone();
        loop {
            if let Some(v) = frame.borrow().vars.get(name) {
                return Ok(Some(v.clone()));
            }
            let parent = frame.borrow().parent.clone();
            match parent {
                None => return Ok(None),
                Some(weak) => match weak.upgrade() {
                    Some(p) => frame = p,
                    None => {
                        return Err(AplError::name(format!("unbound variable: {name}")));
                    }
                },
            }
        }
    }
    /// Bind a name in the innermost scope
    ///
    /// A write inside a lambda therefore always localizes, even when the
    /// name exists further out.
    pub fn assign(&mut self, name: Ident, value: Value) {
        self.current().borrow_mut().vars.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_writes_localize() {
        let mut env = Env::new();
        env.assign("X".into(), Value::from(1i64));
        let captured = env.capture();
        env.push(captured);
        env.assign("X".into(), Value::from(2i64));
        assert_eq!(env.lookup(&"X".into()).unwrap(), Some(Value::from(2i64)));
        env.pop();
        assert_eq!(env.lookup(&"X".into()).unwrap(), Some(Value::from(1i64)));
    }

    #[test]
    fn dead_scope_read_fails() {
        let mut env = Env::new();
        // A frame that has already returned
        let dead = Rc::downgrade(&Rc::new(RefCell::new(Frame::default())));
        env.push(dead);
        assert!(env.lookup(&"X".into()).is_err());
        env.pop();
    }
}
