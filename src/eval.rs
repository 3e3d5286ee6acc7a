use std::{
    io::{BufRead, Write},
    rc::Rc,
};

use crate::{
    array::Array,
    ast::{Expr, FnExpr, Stmt},
    env::Env,
    format::{self, FmtConfig},
    function::{Derived, Function, Lambda},
    lex::{lex, Sp},
    num::Tower,
    parse::parse,
    primitive::{OpCall, Registry},
    value::Value,
    AplError, AplResult, Ident,
};

/// An interpreter instance bound to an output sink
///
/// Hosts construct one, register a tower and the primitive and operator
/// sets, then feed lines to [`Aplite::parse_and_eval`].
pub struct Aplite {
    registry: Registry,
    tower: Tower,
    env: Env,
    fmt: FmtConfig,
    origin: i64,
    ct: f64,
    out: Box<dyn Write>,
    stdin: Option<Box<dyn BufRead>>,
    lambda_stack: Vec<Function>,
}

impl Aplite {
    /// Construct an interpreter writing to the given sink
    pub fn new(sink: impl Write + 'static) -> Self {
        Aplite {
            registry: Registry::default(),
            tower: Tower::default(),
            env: Env::new(),
            fmt: FmtConfig::default(),
            origin: 1,
            ct: 1e-13,
            out: Box::new(sink),
            stdin: None,
            lambda_stack: Vec::new(),
        }
    }
    /// Replace the number tower
    pub fn register_tower(&mut self, tower: Tower) {
        self.tower = tower;
    }
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
    pub fn tower(&self) -> &Tower {
        &self.tower
    }
    /// The index origin `⎕IO`
    pub fn index_origin(&self) -> i64 {
        self.origin
    }
    /// The comparison tolerance `⎕CT`
    pub fn comparison_tolerance(&self) -> f64 {
        self.ct
    }
    /// Bind the reader data primitives consume
    pub fn set_stdin(&mut self, reader: impl BufRead + 'static) {
        self.stdin = Some(Box::new(reader));
    }
    /// Replace the output sink
    pub fn set_stdout(&mut self, sink: impl Write + 'static) {
        self.out = Box::new(sink);
    }
    pub(crate) fn read_stdin_line(&mut self) -> AplResult<Option<String>> {
        let Some(stdin) = &mut self.stdin else {
            return Err(AplError::domain("no input is bound"));
        };
        let mut line = String::new();
        let n = stdin
            .read_line(&mut line)
            .map_err(|e| AplError::run(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
    /// Read a top-level binding, for host inspection between evaluations
    pub fn var(&self, name: &str) -> Option<Value> {
        self.env.root().borrow().vars.get(&Ident::from(name)).cloned()
    }
    /// Write a top-level binding
    pub fn set_var(&mut self, name: &str, value: Value) {
        self.env
            .root()
            .borrow_mut()
            .vars
            .insert(Ident::from(name), value);
    }

    /// Scan, parse and evaluate one line
    ///
    /// Statements run left to right; the first error aborts the line, and
    /// effects of already completed statements persist.
    pub fn parse_and_eval(&mut self, line: &str) -> AplResult {
        let tokens = lex(line, &self.registry.symbols())?;
        let stmts = parse(tokens, &self.registry, &self.tower)?;
        for stmt in &stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> AplResult {
        match stmt {
            Stmt::Expr(e) => {
                let suppress = matches!(e.value, Expr::Assign { .. });
                let value = self.eval_expr(e)?;
                if !suppress {
                    if let Some(v) = value {
                        self.print_value(&v)?;
                    }
                }
                Ok(())
            }
            Stmt::Guard { .. } => Err(AplError::run("guard outside a lambda body")),
        }
    }

    fn print_value(&mut self, v: &Value) -> AplResult {
        let s = format::format_value(v, &self.fmt)?;
        writeln!(self.out, "{s}").map_err(|e| AplError::run(e.to_string()))
    }

    fn print_raw(&mut self, s: &str) -> AplResult {
        write!(self.out, "{s}").map_err(|e| AplError::run(e.to_string()))
    }

    /// Evaluate an expression; `None` is the Silent value of an empty
    /// lambda body
    fn eval_expr(&mut self, e: &Sp<Expr>) -> AplResult<Option<Value>> {
        Ok(match &e.value {
            Expr::Num(n) => Some(Value::Num(*n)),
            Expr::Str(s) => Some(Value::Str(s.clone())),
            Expr::Ident(name) => Some(self.read_name(name)?),
            Expr::Vector(elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for el in elems.iter().rev() {
                    values.push(need(self.eval_expr(el)?)?);
                }
                values.reverse();
                Some(Value::Array(Array::from(values)))
            }
            Expr::Apply { f, left, right } => {
                let right = need(self.eval_expr(right)?)?;
                let left = match left {
                    Some(l) => Some(need(self.eval_expr(l)?)?),
                    None => None,
                };
                let func = self.eval_fn_expr(f)?;
                self.apply(&func, left, right)?
            }
            Expr::Assign { name, expr } => {
                let v = need(self.eval_expr(expr)?)?;
                self.assign(name, v.clone())?;
                Some(v)
            }
            Expr::Index { value, groups } => {
                let mut evaluated: Vec<Option<Value>> = Vec::with_capacity(groups.len());
                for g in groups.iter().rev() {
                    evaluated.push(match g {
                        Some(e) => Some(need(self.eval_expr(e)?)?),
                        None => None,
                    });
                }
                evaluated.reverse();
                let v = need(self.eval_expr(value)?)?;
                Some(self.index_value(v, evaluated)?)
            }
            Expr::Fn(f) => Some(Value::Func(self.eval_fn_expr(f)?)),
        })
    }

    /// Resolve a value-position name, including the system variables
    fn read_name(&mut self, name: &Ident) -> AplResult<Value> {
        if name.is_system_name() {
            return match name.as_str() {
                "⎕IO" => Ok(Value::from(self.origin)),
                "⎕CT" => Ok(Value::from(self.ct)),
                "⎕PP" => Ok(Value::from(self.fmt.pp)),
                "⍞" => {
                    let line = self.read_stdin_line()?.unwrap_or_default();
                    Ok(Value::from(line))
                }
                _ => Err(AplError::name(format!("cannot read {name}"))),
            };
        }
        match self.env.lookup(name)? {
            Some(v) => Ok(v),
            None => Err(AplError::name(format!("unbound variable: {name}"))),
        }
    }

    fn eval_fn_expr(&mut self, f: &FnExpr) -> AplResult<Function> {
        Ok(match f {
            FnExpr::Prim(c) => Function::Primitive(*c),
            FnExpr::Ident(name) => match self.env.lookup(name)? {
                Some(Value::Func(f)) => f,
                Some(v) => {
                    return Err(AplError::domain(format!(
                        "{name} is a {}, not a function",
                        v.kind()
                    )))
                }
                None => return Err(AplError::name(format!("unbound function: {name}"))),
            },
            FnExpr::Lambda(ast) => Function::Lambda(Rc::new(Lambda {
                ast: ast.clone(),
                scope: self.env.capture(),
            })),
            FnExpr::SelfRef => self
                .lambda_stack
                .last()
                .cloned()
                .ok_or_else(|| AplError::run("∇ outside a lambda"))?,
            FnExpr::Derived { op, f, g } => {
                let f = self.eval_fn_expr(f)?;
                let g = match g {
                    Some(g) => Some(self.eval_fn_expr(g)?),
                    None => None,
                };
                Function::Derived(Rc::new(Derived {
                    op: *op,
                    f,
                    g,
                    axis: None,
                }))
            }
            FnExpr::Axis { f, axis } => {
                let ax = need(self.eval_expr(axis)?)?
                    .as_index()
                    .ok_or_else(|| AplError::domain("axis must be an integer"))?;
                match self.eval_fn_expr(f)? {
                    Function::Derived(d) => Function::Derived(Rc::new(Derived {
                        op: d.op,
                        f: d.f.clone(),
                        g: d.g.clone(),
                        axis: Some(ax),
                    })),
                    _ => return Err(AplError::domain("axis is not supported here")),
                }
            }
        })
    }

    /// Apply a function; `None` means the call was Silent
    pub(crate) fn apply(
        &mut self,
        f: &Function,
        left: Option<Value>,
        right: Value,
    ) -> AplResult<Option<Value>> {
        match f {
            Function::Primitive(c) => match left {
                None => {
                    let h = self.registry.dispatch_monadic(*c, &right)?;
                    (*h)(self, right).map(Some)
                }
                Some(l) => {
                    let h = self.registry.dispatch_dyadic(*c, &l, &right)?;
                    (*h)(self, l, right).map(Some)
                }
            },
            Function::Lambda(lam) => self.call_lambda(lam, left, right),
            Function::Native(native) => {
                let native = native.clone();
                (native.f)(self, left, right).map(Some)
            }
            Function::Derived(d) => {
                let Some(op) = self.registry.operator(d.op).map(|o| o.apply.clone()) else {
                    return Err(AplError::run(format!("unregistered operator {}", d.op)));
                };
                (*op)(
                    self,
                    OpCall {
                        f: &d.f,
                        g: d.g.as_ref(),
                        axis: d.axis,
                        left,
                        right,
                    },
                )
                .map(Some)
            }
        }
    }

    pub(crate) fn apply_monadic(&mut self, f: &Function, right: Value) -> AplResult<Option<Value>> {
        self.apply(f, None, right)
    }

    pub(crate) fn apply_dyadic(
        &mut self,
        f: &Function,
        left: Value,
        right: Value,
    ) -> AplResult<Option<Value>> {
        self.apply(f, Some(left), right)
    }

    fn call_lambda(
        &mut self,
        lam: &Rc<Lambda>,
        left: Option<Value>,
        right: Value,
    ) -> AplResult<Option<Value>> {
        self.env.push(lam.scope.clone());
        self.env.assign("⍵".into(), right);
        if let Some(l) = left {
            self.env.assign("⍺".into(), l);
        }
        self.lambda_stack.push(Function::Lambda(lam.clone()));
        let result = self.lambda_body(lam);
        self.lambda_stack.pop();
        self.env.pop();
        result
    }

    fn lambda_body(&mut self, lam: &Rc<Lambda>) -> AplResult<Option<Value>> {
        let mut last = None;
        for stmt in &lam.ast.body {
            match stmt {
                Stmt::Expr(e) => last = self.eval_expr(e)?,
                Stmt::Guard { cond, expr } => {
                    let c = need(self.eval_expr(cond)?)?;
                    match c.is_true() {
                        Some(true) => return self.eval_expr(expr),
                        Some(false) => {}
                        None => {
                            return Err(AplError::domain(format!(
                                "guard condition is a {}, not a number",
                                c.kind()
                            )))
                        }
                    }
                }
            }
        }
        Ok(last)
    }

    /// Assign a name, routing system variables to their side effects
    fn assign(&mut self, name: &Ident, v: Value) -> AplResult {
        if name.is_system_name() {
            return match name.as_str() {
                "⎕" => self.print_value(&v),
                "⍞" => {
                    let s = match &v {
                        Value::Str(s) => s.to_string(),
                        v => format::format_value(v, &self.fmt)?,
                    };
                    self.print_raw(&s)
                }
                "⎕PP" => self.fmt.set_pp(&v),
                "⎕IO" => match v.as_index() {
                    Some(io @ (0 | 1)) => {
                        self.origin = io;
                        Ok(())
                    }
                    _ => Err(AplError::domain("⎕IO must be 0 or 1")),
                },
                "⎕CT" => match v.as_num().and_then(|n| n.as_f64()) {
                    Some(ct) if ct >= 0.0 => {
                        self.ct = ct;
                        Ok(())
                    }
                    _ => Err(AplError::domain("⎕CT must be a nonnegative real")),
                },
                _ => Err(AplError::name(format!(
                    "cannot assign to system variable {name}"
                ))),
            };
        }
        self.env.assign(name.clone(), v);
        Ok(())
    }

    /// `V[i;j;…]` on arrays, lists and dicts
    fn index_value(&mut self, v: Value, groups: Vec<Option<Value>>) -> AplResult<Value> {
        match v {
            Value::Array(arr) => {
                if groups.len() != arr.rank() {
                    return Err(AplError::rank(format!(
                        "{} subscripts for rank {}",
                        groups.len(),
                        arr.rank()
                    )));
                }
                let io = self.origin;
                // Per axis: the chosen positions, and whether the
                // subscript was a scalar (which collapses the axis)
                let mut axes: Vec<(Vec<usize>, bool)> = Vec::with_capacity(groups.len());
                for (ax, group) in groups.iter().enumerate() {
                    let dim = arr.shape()[ax];
                    let to_pos = |v: &Value| -> AplResult<usize> {
                        let i = v
                            .as_index()
                            .ok_or_else(|| AplError::domain("subscripts must be integers"))?
                            - io;
                        if i < 0 || i as usize >= dim {
                            return Err(AplError::index(format!(
                                "subscript {} out of range",
                                i + io
                            )));
                        }
                        Ok(i as usize)
                    };
                    match group {
                        None => axes.push(((0..dim).collect(), false)),
                        Some(Value::Array(idx)) => {
                            let mut positions = Vec::with_capacity(idx.len());
                            for iv in idx.iter() {
                                positions.push(to_pos(&iv)?);
                            }
                            axes.push((positions, false));
                        }
                        Some(scalar) => axes.push((vec![to_pos(scalar)?], true)),
                    }
                }
                let out_dims: Vec<usize> = axes
                    .iter()
                    .filter(|(_, scalar)| !scalar)
                    .map(|(p, _)| p.len())
                    .collect();
                let count: usize = axes.iter().map(|(p, _)| p.len()).product();
                let mut out = Vec::with_capacity(count);
                let mut odometer = vec![0usize; axes.len()];
                let mut index = vec![0usize; axes.len()];
                for _ in 0..count {
                    for (k, (positions, _)) in axes.iter().enumerate() {
                        index[k] = positions[odometer[k]];
                    }
                    let flat = arr.shape().dims_to_flat(&index).unwrap();
                    out.push(arr.get(flat));
                    for k in (0..axes.len()).rev() {
                        odometer[k] += 1;
                        if odometer[k] < axes[k].0.len() {
                            break;
                        }
                        odometer[k] = 0;
                    }
                }
                if out_dims.is_empty() {
                    Ok(out.pop().unwrap())
                } else {
                    Ok(Value::Array(Array::from((
                        crate::Shape::from(out_dims.as_slice()),
                        out,
                    ))))
                }
            }
            Value::List(l) => {
                let [Some(group)] = &groups[..] else {
                    return Err(AplError::rank("a list takes one subscript"));
                };
                let i = group
                    .as_index()
                    .ok_or_else(|| AplError::domain("subscripts must be integers"))?
                    - self.origin;
                if i < 0 || i as usize >= l.len() {
                    return Err(AplError::index("list subscript out of range"));
                }
                Ok(l.0[i as usize].clone())
            }
            Value::Dict(d) => {
                let [Some(group)] = &groups[..] else {
                    return Err(AplError::rank("a dict takes one subscript"));
                };
                match group {
                    Value::Array(keys) => Ok(Value::Dict(d.select(keys.iter())?)),
                    key => d
                        .at(key)
                        .ok_or_else(|| AplError::index(format!("key not found: {key}"))),
                }
            }
            v => Err(AplError::domain(format!("cannot index a {}", v.kind()))),
        }
    }
}

pub(crate) fn need(v: Option<Value>) -> AplResult<Value> {
    v.ok_or_else(|| AplError::domain("expression produced no value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive;

    #[derive(Clone, Default)]
    struct Buf(Rc<std::cell::RefCell<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run(line: &str) -> String {
        let buf = Buf::default();
        let mut a = Aplite::new(buf.clone());
        primitive::register_primitives(&mut a);
        primitive::register_operators(&mut a);
        a.parse_and_eval(line).unwrap();
        let bytes = buf.0.borrow().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn auto_print_and_suppression() {
        assert_eq!(run("1+1"), "2\n");
        assert_eq!(run("X←3"), "");
        assert_eq!(run("X←3⋄⎕←X"), "3\n");
        assert_eq!(run("-X←3"), "¯3\n");
    }

    #[test]
    fn right_to_left_side_effects() {
        assert_eq!(run("X←2+⎕←3×Y←4⋄X⋄Y"), "12\n14\n4\n");
    }

    #[test]
    fn committed_statements_survive_errors() {
        let buf = Buf::default();
        let mut a = Aplite::new(buf.clone());
        primitive::register_primitives(&mut a);
        primitive::register_operators(&mut a);
        assert!(a.parse_and_eval("X←7⋄÷0").is_err());
        assert_eq!(a.var("X"), Some(Value::from(7i64)));
    }

    #[test]
    fn lambdas() {
        assert_eq!(run("{2×⍵}3"), "6\n");
        assert_eq!(run("2{⍺+3{⍺×⍵}⍵+2}2"), "14\n");
        assert_eq!(run("2{}4"), "");
        assert_eq!(run("f←{⍵≤1:1 ⋄ ⍵×∇⍵-1}⋄f 5"), "120\n");
    }

    #[test]
    fn indexing_law() {
        // With the default origin, (⍳n)[i] is i
        for i in 1..=5 {
            assert_eq!(run(&format!("(⍳5)[{i}]")), format!("{i}\n"));
        }
        assert_eq!(run("⎕IO←0⋄⍳3"), "0 1 2\n");
    }

    #[test]
    fn raw_io_channel() {
        let buf = Buf::default();
        let mut a = Aplite::new(buf.clone());
        primitive::register_primitives(&mut a);
        a.parse_and_eval("⍞←\"abc\"").unwrap();
        // Raw writes are unformatted and have no trailing newline
        assert_eq!(String::from_utf8(buf.0.borrow().clone()).unwrap(), "abc");
        a.set_stdin(std::io::Cursor::new(b"a line\n".to_vec()));
        a.parse_and_eval("X←⍞⋄⎕←X").unwrap();
        assert_eq!(
            String::from_utf8(buf.0.borrow().clone()).unwrap(),
            "abca line\n"
        );
    }

    #[test]
    fn system_variable_errors() {
        let mut a = Aplite::new(std::io::sink());
        primitive::register_primitives(&mut a);
        assert!(matches!(a.parse_and_eval("⎕IO←2"), Err(AplError::Domain(_))));
        assert!(matches!(a.parse_and_eval("⎕XYZ←1"), Err(AplError::Name(_))));
        assert!(matches!(a.parse_and_eval("⎕PP←`x"), Err(AplError::Domain(_))));
    }
}
