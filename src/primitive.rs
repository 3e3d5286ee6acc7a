use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use once_cell::sync::Lazy;

use crate::{
    array::Array,
    eval::Aplite,
    function::Function,
    num::{num_cmp, num_eq, Dyad, Monad},
    object::Dict,
    pervade,
    value::{Kind, List, Value},
    AplError, AplResult, Shape,
};

pub type MonadicFn = Rc<dyn Fn(&mut Aplite, Value) -> AplResult<Value>>;
pub type DyadicFn = Rc<dyn Fn(&mut Aplite, Value, Value) -> AplResult<Value>>;
pub type OperatorFn = Rc<dyn Fn(&mut Aplite, OpCall) -> AplResult<Value>>;

/// A monadic handler, optionally keyed to an argument kind
#[derive(Clone)]
pub struct MonadicHandler {
    pub on: Option<Kind>,
    pub f: MonadicFn,
}

/// A dyadic handler, optionally keyed to argument kinds
#[derive(Clone)]
pub struct DyadicHandler {
    pub left: Option<Kind>,
    pub right: Option<Kind>,
    pub f: DyadicFn,
}

/// A registered primitive: handler lists plus an optional identity element
/// for empty reductions
#[derive(Clone, Default)]
pub struct PrimDef {
    pub monadic: Vec<MonadicHandler>,
    pub dyadic: Vec<DyadicHandler>,
    pub identity: Option<Value>,
}

/// Everything an operator application sees
pub struct OpCall<'a> {
    pub f: &'a Function,
    pub g: Option<&'a Function>,
    pub axis: Option<i64>,
    pub left: Option<Value>,
    pub right: Value,
}

#[derive(Clone)]
pub struct OperatorDef {
    pub arity: u8,
    pub apply: OperatorFn,
}

/// The pluggable function and operator definitions
#[derive(Clone, Default)]
pub struct Registry {
    prims: HashMap<char, PrimDef>,
    operators: HashMap<char, OperatorDef>,
}

impl Registry {
    pub fn is_primitive(&self, glyph: char) -> bool {
        self.prims.contains_key(&glyph)
    }
    pub fn is_operator(&self, glyph: char) -> bool {
        self.operators.contains_key(&glyph)
    }
    pub fn operator_arity(&self, glyph: char) -> u8 {
        self.operators.get(&glyph).map(|o| o.arity).unwrap_or(1)
    }
    pub fn operator(&self, glyph: char) -> Option<&OperatorDef> {
        self.operators.get(&glyph)
    }
    pub fn identity(&self, glyph: char) -> Option<&Value> {
        self.prims.get(&glyph).and_then(|p| p.identity.as_ref())
    }
    /// The scanner's symbol table: every registered glyph, plus the
    /// argument runes of lambdas
    pub fn symbols(&self) -> HashSet<char> {
        let mut set: HashSet<char> = self.prims.keys().copied().collect();
        set.extend(self.operators.keys());
        set.insert('⍺');
        set.insert('⍵');
        set
    }
    /// Add handlers for a glyph, merging with what is already registered
    pub fn register_primitive(&mut self, glyph: char, def: PrimDef) {
        let entry = self.prims.entry(glyph).or_default();
        entry.monadic.extend(def.monadic);
        entry.dyadic.extend(def.dyadic);
        if def.identity.is_some() {
            entry.identity = def.identity;
        }
    }
    pub fn register_monadic(&mut self, glyph: char, on: Option<Kind>, f: MonadicFn) {
        self.prims
            .entry(glyph)
            .or_default()
            .monadic
            .push(MonadicHandler { on, f });
    }
    pub fn register_dyadic(
        &mut self,
        glyph: char,
        left: Option<Kind>,
        right: Option<Kind>,
        f: DyadicFn,
    ) {
        self.prims
            .entry(glyph)
            .or_default()
            .dyadic
            .push(DyadicHandler { left, right, f });
    }
    pub fn set_identity(&mut self, glyph: char, identity: Value) {
        self.prims.entry(glyph).or_default().identity = Some(identity);
    }
    pub fn register_operator(&mut self, glyph: char, arity: u8, apply: OperatorFn) {
        self.operators.insert(glyph, OperatorDef { arity, apply });
    }
    /// Pick the most specific monadic handler for the argument kind
    pub fn dispatch_monadic(&self, glyph: char, v: &Value) -> AplResult<MonadicFn> {
        let def = self
            .prims
            .get(&glyph)
            .ok_or_else(|| AplError::domain(format!("undefined primitive {glyph}")))?;
        let kind = v.kind();
        def.monadic
            .iter()
            .filter(|h| h.on.is_none() || h.on == Some(kind))
            .max_by_key(|h| h.on.is_some())
            .map(|h| h.f.clone())
            .ok_or_else(|| {
                AplError::domain(format!(
                    "monadic {glyph} ({}) is not defined for {kind}",
                    glyph_name(glyph)
                ))
            })
    }
    /// Pick the most specific dyadic handler for the argument kinds
    pub fn dispatch_dyadic(&self, glyph: char, l: &Value, r: &Value) -> AplResult<DyadicFn> {
        let def = self
            .prims
            .get(&glyph)
            .ok_or_else(|| AplError::domain(format!("undefined primitive {glyph}")))?;
        let (lk, rk) = (l.kind(), r.kind());
        def.dyadic
            .iter()
            .filter(|h| {
                (h.left.is_none() || h.left == Some(lk))
                    && (h.right.is_none() || h.right == Some(rk))
            })
            .max_by_key(|h| h.left.is_some() as u8 + h.right.is_some() as u8)
            .map(|h| h.f.clone())
            .ok_or_else(|| {
                AplError::domain(format!(
                    "dyadic {glyph} ({}) is not defined for {lk} and {rk}",
                    glyph_name(glyph)
                ))
            })
    }
}

static GLYPH_NAMES: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('+', "add"),
        ('-', "subtract"),
        ('×', "multiply"),
        ('÷', "divide"),
        ('*', "power"),
        ('⍟', "logarithm"),
        ('|', "residue"),
        ('⌈', "maximum"),
        ('⌊', "minimum"),
        ('!', "binomial"),
        ('∨', "gcd"),
        ('=', "equal"),
        ('≠', "not equal"),
        ('<', "less"),
        ('≤', "less or equal"),
        ('>', "greater"),
        ('≥', "greater or equal"),
        ('≡', "match"),
        ('⍴', "reshape"),
        ('⍳', "index"),
        (',', "catenate"),
        ('#', "dict"),
        ('/', "reduce"),
        ('¨', "each"),
        ('⍨', "commute"),
        ('.', "inner product"),
        ('∘', "compose"),
    ]
    .into_iter()
    .collect()
});

pub fn glyph_name(glyph: char) -> &'static str {
    GLYPH_NAMES.get(&glyph).copied().unwrap_or("primitive")
}

/// Register the foundational primitive set
///
/// Arithmetic glyphs are pervasive and dispatch through the tower;
/// structural glyphs take their arguments whole.
pub fn register_primitives(a: &mut Aplite) {
    install_primitives(a.registry_mut());
}

/// Register the foundational operator set
pub fn register_operators(a: &mut Aplite) {
    install_operators(a.registry_mut());
}

pub(crate) fn install_primitives(reg: &mut Registry) {
    // Pervasive arithmetic through the tower
    for (glyph, monad, dyad) in [
        ('+', Monad::Conj, Dyad::Add),
        ('-', Monad::Neg, Dyad::Sub),
        ('×', Monad::Sign, Dyad::Mul),
        ('÷', Monad::Recip, Dyad::Div),
        ('*', Monad::Exp, Dyad::Pow),
        ('⍟', Monad::Ln, Dyad::Log),
        ('|', Monad::Abs, Dyad::Residue),
        ('⌈', Monad::Ceil, Dyad::Max),
        ('⌊', Monad::Floor, Dyad::Min),
        ('!', Monad::Gamma, Dyad::Binom),
    ] {
        reg.register_monadic(glyph, None, monad_handler(monad));
        reg.register_dyadic(glyph, None, None, dyad_handler(dyad));
    }
    reg.register_dyadic('∨', None, None, dyad_handler(Dyad::Gcd));
    for glyph in ['=', '≠', '<', '≤', '>', '≥'] {
        reg.register_dyadic(glyph, None, None, compare_handler(glyph));
    }
    reg.set_identity('+', Value::from(0i64));
    reg.set_identity('-', Value::from(0i64));
    reg.set_identity('×', Value::from(1i64));
    reg.set_identity('÷', Value::from(1i64));
    reg.set_identity('∨', Value::from(0i64));
    reg.set_identity('⌈', Value::from(f64::NEG_INFINITY));
    reg.set_identity('⌊', Value::from(f64::INFINITY));
    reg.set_identity('=', Value::from(1i64));
    reg.set_identity('≠', Value::from(0i64));

    // Structural primitives
    reg.register_monadic('⍴', None, Rc::new(prim_shape));
    reg.register_dyadic('⍴', None, None, Rc::new(prim_reshape));
    reg.register_monadic('⍳', Some(Kind::Int), Rc::new(prim_iota));
    reg.register_dyadic('⍳', Some(Kind::Array), None, Rc::new(prim_index_of));
    reg.register_monadic(',', None, Rc::new(prim_ravel));
    reg.register_dyadic(',', None, None, Rc::new(prim_catenate));
    reg.register_dyadic('≡', None, None, Rc::new(prim_match));
    reg.register_monadic('#', Some(Kind::Dict), Rc::new(prim_keys));
    reg.register_dyadic('#', None, None, Rc::new(prim_dict));
}

pub(crate) fn install_operators(reg: &mut Registry) {
    reg.register_operator('/', 1, Rc::new(op_reduce));
    reg.register_operator('¨', 1, Rc::new(op_each));
    reg.register_operator('⍨', 1, Rc::new(op_commute));
    reg.register_operator('.', 2, Rc::new(op_inner_product));
    reg.register_operator('∘', 2, Rc::new(op_compose));
}

#[cfg(test)]
pub(crate) fn test_registry() -> Registry {
    let mut reg = Registry::default();
    install_primitives(&mut reg);
    install_operators(&mut reg);
    reg
}

fn monad_handler(op: Monad) -> MonadicFn {
    Rc::new(move |a: &mut Aplite, v: Value| {
        pervade::un_pervade(&v, &mut |x| match x {
            Value::Num(n) => Ok(Value::Num(a.tower().monadic(op, *n)?)),
            v => Err(AplError::domain(format!(
                "cannot take the {op} of a {}",
                v.kind()
            ))),
        })
    })
}

fn dyad_handler(op: Dyad) -> DyadicFn {
    Rc::new(move |a: &mut Aplite, l: Value, r: Value| {
        pervade::bin_pervade(&l, &r, &mut |x, y| match (x, y) {
            (Value::Num(m), Value::Num(n)) => Ok(Value::Num(a.tower().dyadic(op, *m, *n)?)),
            (x, y) => Err(AplError::domain(format!(
                "cannot {op} {} and {}",
                x.kind(),
                y.kind()
            ))),
        })
    })
}

fn compare_handler(glyph: char) -> DyadicFn {
    Rc::new(move |a: &mut Aplite, l: Value, r: Value| {
        let ct = a.comparison_tolerance();
        pervade::bin_pervade(&l, &r, &mut |x, y| {
            let result = match (x, y) {
                (Value::Num(m), Value::Num(n)) => match glyph {
                    '=' => num_eq(*m, *n, ct),
                    '≠' => !num_eq(*m, *n, ct),
                    _ => {
                        let ord = num_cmp(*m, *n).ok_or_else(|| {
                            AplError::domain("complex numbers are not ordered")
                        })?;
                        ord_matches(glyph, ord)
                    }
                },
                (Value::Char(x), Value::Char(y)) => ord_matches(glyph, x.cmp(y)),
                (Value::Str(x), Value::Str(y)) => ord_matches(glyph, x.cmp(y)),
                (x, y) => match glyph {
                    '=' => false,
                    '≠' => true,
                    _ => {
                        return Err(AplError::domain(format!(
                            "cannot order {} and {}",
                            x.kind(),
                            y.kind()
                        )))
                    }
                },
            };
            Ok(Value::from(result))
        })
    })
}

fn ord_matches(glyph: char, ord: Ordering) -> bool {
    match glyph {
        '=' => ord == Ordering::Equal,
        '≠' => ord != Ordering::Equal,
        '<' => ord == Ordering::Less,
        '≤' => ord != Ordering::Greater,
        '>' => ord == Ordering::Greater,
        '≥' => ord != Ordering::Less,
        _ => unreachable!("not a comparison glyph"),
    }
}

fn to_array(v: Value) -> Array {
    match v {
        Value::Array(a) => a,
        v => Array::from(vec![v]),
    }
}

/// Monadic `⍴`: the shape vector
fn prim_shape(_a: &mut Aplite, v: Value) -> AplResult<Value> {
    let dims: Vec<i64> = match &v {
        Value::Array(arr) => arr.shape().iter().map(|&d| d as i64).collect(),
        Value::Str(s) => vec![s.chars().count() as i64],
        Value::List(l) => vec![l.len() as i64],
        Value::Dict(d) => vec![d.len() as i64],
        _ => vec![],
    };
    Ok(Value::Array(Array::from(dims)))
}

/// Dyadic `⍴`: reshape, cycling the ravel of the right argument
fn prim_reshape(_a: &mut Aplite, l: Value, r: Value) -> AplResult<Value> {
    let mut dims = Vec::new();
    for v in to_array(l).iter() {
        let d = v
            .as_index()
            .ok_or_else(|| AplError::domain("shape must be integral"))?;
        if d < 0 {
            return Err(AplError::domain("shape must not be negative"));
        }
        dims.push(d as usize);
    }
    let shape = Shape::from(dims.as_slice());
    Ok(Value::Array(to_array(r).reshape(shape)?))
}

/// Monadic `⍳`: the first n indexes, from the index origin
fn prim_iota(a: &mut Aplite, v: Value) -> AplResult<Value> {
    let n = v
        .as_index()
        .ok_or_else(|| AplError::domain("iota needs an integer"))?;
    if n < 0 {
        return Err(AplError::domain("iota of a negative count"));
    }
    let io = a.index_origin();
    Ok(Value::Array(Array::from(
        (0..n).map(|i| i + io).collect::<Vec<i64>>(),
    )))
}

/// Dyadic `⍳`: index of each element of the right argument in the left
/// vector; misses map to one past the end
fn prim_index_of(a: &mut Aplite, l: Value, r: Value) -> AplResult<Value> {
    let hay = to_array(l);
    if hay.rank() != 1 {
        return Err(AplError::rank("index-of needs a vector on the left"));
    }
    let io = a.index_origin();
    let miss = io + hay.len() as i64;
    let find = |x: &Value| -> AplResult<Value> {
        let pos = hay.iter().position(|h| h == *x);
        Ok(Value::from(pos.map(|p| p as i64 + io).unwrap_or(miss)))
    };
    match &r {
        Value::Array(arr) => {
            let values: Vec<Value> = arr
                .iter()
                .map(|x| find(&x))
                .collect::<AplResult<Vec<_>>>()?;
            Ok(Value::Array(Array::from((arr.shape().clone(), values))))
        }
        v => find(v),
    }
}

/// Monadic `,`: the ravel
fn prim_ravel(_a: &mut Aplite, v: Value) -> AplResult<Value> {
    Ok(Value::Array(to_array(v).ravel()))
}

/// Dyadic `,`: catenate
fn prim_catenate(_a: &mut Aplite, l: Value, r: Value) -> AplResult<Value> {
    Ok(Value::Array(to_array(l).catenate(&to_array(r))?))
}

/// Dyadic `≡`: structural match
fn prim_match(_a: &mut Aplite, l: Value, r: Value) -> AplResult<Value> {
    Ok(Value::from(l == r))
}

/// Monadic `#`: the keys of a dict
fn prim_keys(_a: &mut Aplite, v: Value) -> AplResult<Value> {
    match v {
        Value::Dict(d) => Ok(Value::Array(Array::from(d.keys().to_vec()))),
        v => Err(AplError::domain(format!("cannot take keys of {}", v.kind()))),
    }
}

/// Dyadic `#`: build a dict from keys and conforming values
fn prim_dict(_a: &mut Aplite, l: Value, r: Value) -> AplResult<Value> {
    let mut dict = Dict::new();
    match l {
        Value::Array(keys) => {
            match &r {
                Value::Array(vals) => {
                    if keys.len() != vals.len() {
                        return Err(AplError::length(format!(
                            "{} keys with {} values",
                            keys.len(),
                            vals.len()
                        )));
                    }
                    for (k, v) in keys.iter().zip(vals.iter()) {
                        dict.set(k, v);
                    }
                }
                v => {
                    for k in keys.iter() {
                        dict.set(k, v.clone());
                    }
                }
            }
            Ok(Value::Dict(dict))
        }
        key => {
            dict.set(key, r);
            Ok(Value::Dict(dict))
        }
    }
}

fn need(v: Option<Value>) -> AplResult<Value> {
    v.ok_or_else(|| AplError::domain("expression produced no value"))
}

/// `f/`: right fold along an axis; the identity element on empty
fn op_reduce(a: &mut Aplite, call: OpCall) -> AplResult<Value> {
    if call.left.is_some() {
        return Err(AplError::domain("reduction takes no left argument"));
    }
    let arr = match call.right {
        Value::Array(arr) => arr,
        v => return Ok(v),
    };
    let rank = arr.rank();
    let ax = match call.axis {
        None => rank - 1,
        Some(x) => {
            let i = x - a.index_origin();
            if i < 0 || i as usize >= rank {
                return Err(AplError::index(format!("axis {x} out of range")));
            }
            i as usize
        }
    };
    let shape = arr.shape().clone();
    let n = shape[ax];
    if n == 0 {
        let identity = call
            .f
            .glyph()
            .and_then(|g| a.registry().identity(g).cloned())
            .ok_or_else(|| AplError::domain("reduction of an empty axis without identity"))?;
        let dims: Vec<usize> = shape
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != ax)
            .map(|(_, &d)| d)
            .collect();
        return if dims.is_empty() {
            Ok(identity)
        } else {
            let len: usize = dims.iter().product();
            Ok(Value::Array(Array::from((
                Shape::from(dims.as_slice()),
                vec![identity; len],
            ))))
        };
    }
    let outer: usize = shape[..ax].iter().product();
    let inner: usize = shape[ax + 1..].iter().product();
    let mut out = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let at = |k: usize| arr.get((o * n + k) * inner + i);
            let mut acc = at(n - 1);
            for k in (0..n - 1).rev() {
                acc = need(a.apply_dyadic(call.f, at(k), acc)?)?;
            }
            out.push(acc);
        }
    }
    let dims: Vec<usize> = shape
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != ax)
        .map(|(_, &d)| d)
        .collect();
    if dims.is_empty() {
        Ok(out.pop().unwrap())
    } else {
        Ok(Value::Array(Array::from((
            Shape::from(dims.as_slice()),
            out,
        ))))
    }
}

/// `f¨`: map a function over the elements, preserving shape
fn op_each(a: &mut Aplite, call: OpCall) -> AplResult<Value> {
    match call.left {
        None => match call.right {
            Value::Array(arr) => {
                let mut values = Vec::with_capacity(arr.len());
                for v in arr.iter() {
                    values.push(need(a.apply_monadic(call.f, v)?)?);
                }
                Ok(Value::Array(Array::from((arr.shape().clone(), values))))
            }
            Value::List(l) => {
                let mut values = Vec::with_capacity(l.len());
                for v in l.iter() {
                    values.push(need(a.apply_monadic(call.f, v.clone())?)?);
                }
                Ok(Value::List(List(values.into_iter().collect())))
            }
            v => need(a.apply_monadic(call.f, v)?),
        },
        Some(left) => match (left, call.right) {
            (Value::Array(l), Value::Array(r)) => {
                if l.rank() != r.rank() {
                    return Err(AplError::rank(format!(
                        "ranks {} and {} do not match",
                        l.shape(),
                        r.shape()
                    )));
                }
                if l.shape() != r.shape() {
                    return Err(AplError::length(format!(
                        "shapes {} and {} do not match",
                        l.shape(),
                        r.shape()
                    )));
                }
                let mut values = Vec::with_capacity(l.len());
                for (x, y) in l.iter().zip(r.iter()) {
                    values.push(need(a.apply_dyadic(call.f, x, y)?)?);
                }
                Ok(Value::Array(Array::from((l.shape().clone(), values))))
            }
            (Value::Array(l), r) => {
                let mut values = Vec::with_capacity(l.len());
                for x in l.iter() {
                    values.push(need(a.apply_dyadic(call.f, x, r.clone())?)?);
                }
                Ok(Value::Array(Array::from((l.shape().clone(), values))))
            }
            (l, Value::Array(r)) => {
                let mut values = Vec::with_capacity(r.len());
                for y in r.iter() {
                    values.push(need(a.apply_dyadic(call.f, l.clone(), y)?)?);
                }
                Ok(Value::Array(Array::from((r.shape().clone(), values))))
            }
            (l, r) => need(a.apply_dyadic(call.f, l, r)?),
        },
    }
}

/// `f⍨`: swap the arguments, or duplicate a lone one
fn op_commute(a: &mut Aplite, call: OpCall) -> AplResult<Value> {
    match call.left {
        Some(left) => need(a.apply_dyadic(call.f, call.right, left)?),
        None => need(a.apply_dyadic(call.f, call.right.clone(), call.right)?),
    }
}

/// `f.g`: the f-reduction of the elementwise g along the shared axis
fn op_inner_product(a: &mut Aplite, call: OpCall) -> AplResult<Value> {
    let g = call
        .g
        .ok_or_else(|| AplError::run("inner product needs two operands"))?;
    let Some(left) = call.left else {
        return Err(AplError::domain("inner product is dyadic"));
    };
    let la = to_array(left);
    let ra = to_array(call.right);
    let m = *la.shape().last().unwrap();
    if *ra.shape().first().unwrap() != m {
        return Err(AplError::length(format!(
            "inner product shapes {} and {} do not conform",
            la.shape(),
            ra.shape()
        )));
    }
    if m == 0 {
        return Err(AplError::domain("inner product along an empty axis"));
    }
    let rows: usize = la.shape()[..la.rank() - 1].iter().product();
    let cols: usize = ra.shape()[1..].iter().product();
    let mut out = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let mut prods = Vec::with_capacity(m);
            for k in 0..m {
                let x = la.get(i * m + k);
                let y = ra.get(k * cols + j);
                prods.push(need(a.apply_dyadic(g, x, y)?)?);
            }
            let mut acc = prods.pop().unwrap();
            while let Some(p) = prods.pop() {
                acc = need(a.apply_dyadic(call.f, p, acc)?)?;
            }
            out.push(acc);
        }
    }
    let mut dims: Vec<usize> = la.shape()[..la.rank() - 1].to_vec();
    dims.extend_from_slice(&ra.shape()[1..]);
    if dims.is_empty() {
        Ok(out.pop().unwrap())
    } else {
        Ok(Value::Array(Array::from((
            Shape::from(dims.as_slice()),
            out,
        ))))
    }
}

/// `f∘g`: apply g to the right argument first
fn op_compose(a: &mut Aplite, call: OpCall) -> AplResult<Value> {
    let g = call
        .g
        .ok_or_else(|| AplError::run("compose needs two operands"))?;
    let right = need(a.apply_monadic(g, call.right)?)?;
    match call.left {
        Some(left) => need(a.apply_dyadic(call.f, left, right)?),
        None => need(a.apply_monadic(call.f, right)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_handler_wins() {
        let mut reg = test_registry();
        // A string-specific catenate joining the texts
        reg.register_dyadic(
            ',',
            Some(Kind::Str),
            Some(Kind::Str),
            Rc::new(|_, l, r| match (l, r) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}").into())),
                _ => unreachable!(),
            }),
        );
        let mut a = Aplite::new(std::io::sink());
        let h = reg
            .dispatch_dyadic(',', &Value::from("a"), &Value::from("b"))
            .unwrap();
        assert_eq!(
            (*h)(&mut a, Value::from("a"), Value::from("b")).unwrap(),
            Value::from("ab")
        );
        // Other kinds still fall back to the generic handler
        let h = reg
            .dispatch_dyadic(',', &Value::from(1i64), &Value::from(2i64))
            .unwrap();
        assert_eq!(
            (*h)(&mut a, Value::from(1i64), Value::from(2i64)).unwrap(),
            Value::Array(Array::from(vec![1i64, 2]))
        );
    }

    #[test]
    fn unsatisfiable_dispatch_is_a_domain_error() {
        let reg = test_registry();
        // ∨ has no monadic definition
        assert!(matches!(
            reg.dispatch_monadic('∨', &Value::from(1i64)),
            Err(AplError::Domain(_))
        ));
        // ⍳ is keyed to integers
        assert!(matches!(
            reg.dispatch_monadic('⍳', &Value::from(2.5)),
            Err(AplError::Domain(_))
        ));
        assert!(matches!(
            reg.dispatch_monadic('?', &Value::from(1i64)),
            Err(AplError::Domain(_))
        ));
    }

    #[test]
    fn symbol_table_covers_registrations() {
        let reg = test_registry();
        let symbols = reg.symbols();
        for c in ['+', '⍴', '/', '¨', '.', '⍺', '⍵'] {
            assert!(symbols.contains(&c), "{c}");
        }
        assert_eq!(reg.operator_arity('.'), 2);
        assert_eq!(reg.operator_arity('/'), 1);
    }
}
