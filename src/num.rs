use std::{cmp::Ordering, fmt};

use num::{
    integer::gcd, rational::Rational64, CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Signed,
    ToPrimitive, Zero,
};

use crate::{complex::Complex, format, AplError, AplResult};

/// A number: a tagged element of the tower
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Ratio(Rational64),
    Float(f64),
    Complex(Complex),
}

/// The ordered kinds of the tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumKind {
    Int,
    Ratio,
    Float,
    Complex,
}

impl fmt::Display for NumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumKind::Int => write!(f, "integer"),
            NumKind::Ratio => write!(f, "rational"),
            NumKind::Float => write!(f, "float"),
            NumKind::Complex => write!(f, "complex"),
        }
    }
}

impl Num {
    pub fn kind(&self) -> NumKind {
        match self {
            Num::Int(_) => NumKind::Int,
            Num::Ratio(_) => NumKind::Ratio,
            Num::Float(_) => NumKind::Float,
            Num::Complex(_) => NumKind::Complex,
        }
    }
    pub fn is_zero(&self) -> bool {
        match self {
            Num::Int(i) => *i == 0,
            Num::Ratio(r) => r.is_zero(),
            Num::Float(f) => *f == 0.0,
            Num::Complex(z) => z.re == 0.0 && z.im == 0.0,
        }
    }
    /// Interpret the number as an index or count, if it is integral
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Num::Int(i) => Some(*i),
            Num::Ratio(r) => r.is_integer().then(|| r.to_integer()),
            Num::Float(f) => (f.fract() == 0.0 && f.abs() < 9e15).then(|| *f as i64),
            Num::Complex(_) => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Num::Int(i) => Some(*i as f64),
            Num::Ratio(r) => r.to_f64(),
            Num::Float(f) => Some(*f),
            Num::Complex(_) => None,
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format::num_str(self))
    }
}

impl From<i64> for Num {
    fn from(i: i64) -> Self {
        Num::Int(i)
    }
}

impl From<f64> for Num {
    fn from(f: f64) -> Self {
        Num::Float(f)
    }
}

impl From<bool> for Num {
    fn from(b: bool) -> Self {
        Num::Int(b as i64)
    }
}

/// A monadic arithmetic operation of the tower's vtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monad {
    Conj,
    Neg,
    Sign,
    Recip,
    Exp,
    Ln,
    Abs,
    Ceil,
    Floor,
    Gamma,
}

/// A dyadic arithmetic operation of the tower's vtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dyad {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Log,
    Residue,
    Min,
    Max,
    Binom,
    Gcd,
}

impl fmt::Display for Monad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Monad::Conj => "conjugate",
            Monad::Neg => "negate",
            Monad::Sign => "signum",
            Monad::Recip => "reciprocal",
            Monad::Exp => "exponential",
            Monad::Ln => "natural log",
            Monad::Abs => "magnitude",
            Monad::Ceil => "ceiling",
            Monad::Floor => "floor",
            Monad::Gamma => "factorial",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Dyad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dyad::Add => "add",
            Dyad::Sub => "subtract",
            Dyad::Mul => "multiply",
            Dyad::Div => "divide",
            Dyad::Pow => "power",
            Dyad::Log => "logarithm",
            Dyad::Residue => "residue",
            Dyad::Min => "minimum",
            Dyad::Max => "maximum",
            Dyad::Binom => "binomial",
            Dyad::Gcd => "gcd",
        };
        write!(f, "{name}")
    }
}

/// An ordered chain of number kinds with monotone promotion
///
/// A per-kind operation that does not close returns `None`; the tower
/// promotes both operands to the next registered kind and retries.
#[derive(Debug, Clone)]
pub struct Tower {
    kinds: Vec<NumKind>,
}

impl Default for Tower {
    fn default() -> Self {
        Tower {
            kinds: vec![NumKind::Int, NumKind::Ratio, NumKind::Float, NumKind::Complex],
        }
    }
}

impl Tower {
    /// Build a tower from an ascending chain of kinds
    pub fn new(kinds: impl IntoIterator<Item = NumKind>) -> Self {
        let mut kinds: Vec<NumKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        assert!(!kinds.is_empty(), "a tower needs at least one kind");
        Tower { kinds }
    }
    fn pos(&self, kind: NumKind) -> usize {
        self.kinds.iter().position(|&k| k == kind).unwrap_or(0)
    }
    fn next_kind(&self, kind: NumKind) -> Option<NumKind> {
        self.kinds.get(self.pos(kind) + 1).copied()
    }
    /// Parse a numeric lexeme
    ///
    /// `¯` is the negative sign, `J` separates Cartesian parts, `@` a polar
    /// magnitude and angle in degrees, `/` a rational. Kinds absent from
    /// the tower do not participate.
    pub fn parse(&self, lexeme: &str) -> Option<Num> {
        let s = lexeme.replace('¯', "-");
        for &kind in &self.kinds {
            if let Some(n) = parse_as(kind, &s) {
                return Some(n);
            }
        }
        None
    }
    /// Promote a number up the chain to the target kind
    pub fn promote(&self, n: Num, to: NumKind) -> Num {
        convert(n, to)
    }
    fn unify(&self, a: Num, b: Num) -> (Num, Num) {
        let k = if self.pos(a.kind()) >= self.pos(b.kind()) {
            a.kind()
        } else {
            b.kind()
        };
        (convert(a, k), convert(b, k))
    }
    /// Apply a monadic vtable operation, promoting until a kind closes
    pub fn monadic(&self, op: Monad, a: Num) -> AplResult<Num> {
        match op {
            Monad::Recip if a.is_zero() => return Err(AplError::domain("divide by zero")),
            Monad::Ln if a.is_zero() => return Err(AplError::domain("logarithm of zero")),
            _ => {}
        }
        let mut a = a;
        loop {
            if let Some(r) = apply_monad(op, a) {
                return Ok(demote(r));
            }
            let Some(kind) = self.next_kind(a.kind()) else {
                return Err(AplError::domain(format!(
                    "{op} is not defined for {} {}",
                    a.kind(),
                    format::num_str(&a),
                )));
            };
            a = convert(a, kind);
        }
    }
    /// Apply a dyadic vtable operation, promoting until a kind closes
    pub fn dyadic(&self, op: Dyad, a: Num, b: Num) -> AplResult<Num> {
        if op == Dyad::Div && b.is_zero() {
            return Err(AplError::domain("divide by zero"));
        }
        let (mut a, mut b) = self.unify(a, b);
        loop {
            if let Some(r) = apply_dyad(op, a, b) {
                return Ok(demote(r));
            }
            let Some(kind) = self.next_kind(a.kind()) else {
                return Err(AplError::domain(format!(
                    "{op} is not defined for {} values",
                    a.kind()
                )));
            };
            a = convert(a, kind);
            b = convert(b, kind);
        }
    }
    /// The `Less` entry of the vtable; complex numbers are unordered
    pub fn less(&self, a: Num, b: Num) -> AplResult<bool> {
        let (a, b) = self.unify(a, b);
        num_cmp(a, b)
            .map(|o| o == Ordering::Less)
            .ok_or_else(|| AplError::domain("complex numbers are not ordered"))
    }
}

fn parse_as(kind: NumKind, s: &str) -> Option<Num> {
    match kind {
        NumKind::Int => s.parse::<i64>().ok().map(Num::Int),
        NumKind::Ratio => {
            let (n, d) = s.split_once('/')?;
            let n = n.parse::<i64>().ok()?;
            let d = d.parse::<i64>().ok()?;
            (d != 0).then(|| demote(Num::Ratio(Rational64::new(n, d))))
        }
        NumKind::Float => s.parse::<f64>().ok().map(Num::Float),
        NumKind::Complex => {
            if let Some(i) = s.find(['J', 'j']) {
                let re = s[..i].parse::<f64>().ok()?;
                let im = s[i + 1..].parse::<f64>().ok()?;
                Some(Num::Complex(Complex::new(re, im)))
            } else if let Some(i) = s.find('@') {
                let mag = s[..i].parse::<f64>().ok()?;
                let deg = s[i + 1..].parse::<f64>().ok()?;
                Some(Num::Complex(Complex::from_polar_deg(mag, deg)))
            } else {
                None
            }
        }
    }
}

fn convert(n: Num, to: NumKind) -> Num {
    if n.kind() >= to {
        return n;
    }
    match (n, to) {
        (Num::Int(i), NumKind::Ratio) => Num::Ratio(Rational64::from_integer(i)),
        (Num::Int(i), NumKind::Float) => Num::Float(i as f64),
        (Num::Int(i), NumKind::Complex) => Num::Complex((i as f64).into()),
        (Num::Ratio(r), NumKind::Float) => Num::Float(r.to_f64().unwrap_or(f64::NAN)),
        (Num::Ratio(r), NumKind::Complex) => Num::Complex(r.to_f64().unwrap_or(f64::NAN).into()),
        (Num::Float(f), NumKind::Complex) => Num::Complex(f.into()),
        _ => n,
    }
}

/// Canonicalize: an integral rational is an integer
fn demote(n: Num) -> Num {
    match n {
        Num::Ratio(r) if r.is_integer() => Num::Int(r.to_integer()),
        n => n,
    }
}

fn apply_monad(op: Monad, a: Num) -> Option<Num> {
    Some(match (op, a) {
        // Integers
        (Monad::Conj, Num::Int(i)) => Num::Int(i),
        (Monad::Neg, Num::Int(i)) => Num::Int(i.checked_neg()?),
        (Monad::Sign, Num::Int(i)) => Num::Int(i.signum()),
        (Monad::Recip, Num::Int(i)) => match i {
            1 | -1 => Num::Int(i),
            _ => return None,
        },
        (Monad::Exp, Num::Int(0)) => Num::Int(1),
        (Monad::Exp, Num::Int(_)) => return None,
        (Monad::Ln, Num::Int(_)) => return None,
        (Monad::Abs, Num::Int(i)) => Num::Int(i.checked_abs()?),
        (Monad::Ceil | Monad::Floor, Num::Int(i)) => Num::Int(i),
        (Monad::Gamma, Num::Int(i)) => Num::Int(int_gamma(i)?),
        // Rationals
        (Monad::Conj, Num::Ratio(r)) => Num::Ratio(r),
        (Monad::Neg, Num::Ratio(r)) => Num::Ratio(r.checked_mul(&Rational64::from_integer(-1))?),
        (Monad::Sign, Num::Ratio(r)) => Num::Int(if r.is_zero() {
            0
        } else if r.is_positive() {
            1
        } else {
            -1
        }),
        (Monad::Recip, Num::Ratio(r)) => Num::Ratio(r.recip()),
        (Monad::Exp | Monad::Ln | Monad::Gamma, Num::Ratio(_)) => return None,
        (Monad::Abs, Num::Ratio(r)) => Num::Ratio(r.abs()),
        (Monad::Ceil, Num::Ratio(r)) => Num::Int(r.ceil().to_integer()),
        (Monad::Floor, Num::Ratio(r)) => Num::Int(r.floor().to_integer()),
        // Floats
        (Monad::Conj, Num::Float(f)) => Num::Float(f),
        (Monad::Neg, Num::Float(f)) => Num::Float(-f),
        (Monad::Sign, Num::Float(f)) => Num::Float(if f == 0.0 { 0.0 } else { f.signum() }),
        (Monad::Recip, Num::Float(f)) => Num::Float(1.0 / f),
        (Monad::Exp, Num::Float(f)) => Num::Float(f.exp()),
        (Monad::Ln, Num::Float(f)) => {
            if f > 0.0 {
                Num::Float(f.ln())
            } else {
                return None;
            }
        }
        (Monad::Abs, Num::Float(f)) => Num::Float(f.abs()),
        (Monad::Ceil, Num::Float(f)) => Num::Float(f.ceil()),
        (Monad::Floor, Num::Float(f)) => Num::Float(f.floor()),
        (Monad::Gamma, Num::Float(f)) => Num::Float(gamma_fn(f + 1.0)?),
        // Complex
        (Monad::Conj, Num::Complex(z)) => Num::Complex(z.conj()),
        (Monad::Neg, Num::Complex(z)) => Num::Complex(-z),
        (Monad::Sign, Num::Complex(z)) => Num::Complex(z.signum()),
        (Monad::Recip, Num::Complex(z)) => Num::Complex(Complex::ONE / z),
        (Monad::Exp, Num::Complex(z)) => Num::Complex(z.exp()),
        (Monad::Ln, Num::Complex(z)) => Num::Complex(z.ln()),
        (Monad::Abs, Num::Complex(z)) => Num::Float(z.abs()),
        (Monad::Ceil | Monad::Floor | Monad::Gamma, Num::Complex(_)) => return None,
    })
}

fn apply_dyad(op: Dyad, a: Num, b: Num) -> Option<Num> {
    Some(match (op, a, b) {
        // Integers
        (Dyad::Add, Num::Int(a), Num::Int(b)) => Num::Int(a.checked_add(b)?),
        (Dyad::Sub, Num::Int(a), Num::Int(b)) => Num::Int(a.checked_sub(b)?),
        (Dyad::Mul, Num::Int(a), Num::Int(b)) => Num::Int(a.checked_mul(b)?),
        (Dyad::Div, Num::Int(a), Num::Int(b)) => {
            let r = a.checked_div(b)?;
            if r.checked_mul(b) == Some(a) {
                Num::Int(r)
            } else {
                return None;
            }
        }
        (Dyad::Pow, Num::Int(a), Num::Int(b)) => {
            if b < 0 {
                return None;
            }
            let e = u32::try_from(b).ok()?;
            Num::Int(a.checked_pow(e)?)
        }
        (Dyad::Log, Num::Int(_), Num::Int(_)) => return None,
        (Dyad::Residue, Num::Int(a), Num::Int(b)) => {
            if a == 0 {
                Num::Int(b)
            } else {
                Num::Int(((b % a) + a) % a)
            }
        }
        (Dyad::Min, Num::Int(a), Num::Int(b)) => Num::Int(a.min(b)),
        (Dyad::Max, Num::Int(a), Num::Int(b)) => Num::Int(a.max(b)),
        (Dyad::Binom, Num::Int(a), Num::Int(b)) => Num::Int(int_binom(a, b)?),
        (Dyad::Gcd, Num::Int(a), Num::Int(b)) => Num::Int(gcd(a, b)),
        // Rationals
        (Dyad::Add, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.checked_add(&b)?),
        (Dyad::Sub, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.checked_sub(&b)?),
        (Dyad::Mul, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.checked_mul(&b)?),
        (Dyad::Div, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.checked_div(&b)?),
        (Dyad::Pow, Num::Ratio(a), Num::Ratio(b)) => {
            if !b.is_integer() {
                return None;
            }
            Num::Ratio(ratio_pow(a, b.to_integer())?)
        }
        (Dyad::Residue, Num::Ratio(a), Num::Ratio(b)) => {
            if a.is_zero() {
                Num::Ratio(b)
            } else {
                let q = b.checked_div(&a)?.floor();
                Num::Ratio(b.checked_sub(&a.checked_mul(&q)?)?)
            }
        }
        (Dyad::Min, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.min(b)),
        (Dyad::Max, Num::Ratio(a), Num::Ratio(b)) => Num::Ratio(a.max(b)),
        (Dyad::Log | Dyad::Binom | Dyad::Gcd, Num::Ratio(_), Num::Ratio(_)) => return None,
        // Floats
        (Dyad::Add, Num::Float(a), Num::Float(b)) => Num::Float(a + b),
        (Dyad::Sub, Num::Float(a), Num::Float(b)) => Num::Float(a - b),
        (Dyad::Mul, Num::Float(a), Num::Float(b)) => Num::Float(a * b),
        (Dyad::Div, Num::Float(a), Num::Float(b)) => Num::Float(a / b),
        (Dyad::Pow, Num::Float(a), Num::Float(b)) => {
            if a < 0.0 && b.fract() != 0.0 {
                return None;
            }
            Num::Float(a.powf(b))
        }
        (Dyad::Log, Num::Float(a), Num::Float(b)) => {
            if a > 0.0 && b > 0.0 {
                Num::Float(b.ln() / a.ln())
            } else {
                return None;
            }
        }
        (Dyad::Residue, Num::Float(a), Num::Float(b)) => {
            if a == 0.0 {
                Num::Float(b)
            } else {
                Num::Float(((b % a) + a) % a)
            }
        }
        (Dyad::Min, Num::Float(a), Num::Float(b)) => Num::Float(a.min(b)),
        (Dyad::Max, Num::Float(a), Num::Float(b)) => Num::Float(a.max(b)),
        (Dyad::Binom, Num::Float(a), Num::Float(b)) => {
            let v = gamma_fn(b + 1.0)? / (gamma_fn(a + 1.0)? * gamma_fn(b - a + 1.0)?);
            Num::Float(v)
        }
        (Dyad::Gcd, Num::Float(_), Num::Float(_)) => return None,
        // Complex
        (Dyad::Add, Num::Complex(a), Num::Complex(b)) => Num::Complex(a + b),
        (Dyad::Sub, Num::Complex(a), Num::Complex(b)) => Num::Complex(a - b),
        (Dyad::Mul, Num::Complex(a), Num::Complex(b)) => Num::Complex(a * b),
        (Dyad::Div, Num::Complex(a), Num::Complex(b)) => Num::Complex(a / b),
        (Dyad::Pow, Num::Complex(a), Num::Complex(b)) => Num::Complex(a.powc(b)),
        (Dyad::Log, Num::Complex(a), Num::Complex(b)) => Num::Complex(b.log(a)),
        (
            Dyad::Residue | Dyad::Min | Dyad::Max | Dyad::Binom | Dyad::Gcd,
            Num::Complex(_),
            Num::Complex(_),
        ) => return None,
        _ => return None,
    })
}

/// Factorial; 20 is the limit for i64
fn int_gamma(i: i64) -> Option<i64> {
    if !(0..=20).contains(&i) {
        return None;
    }
    let mut n = 1i64;
    for k in 1..=i {
        n = n.checked_mul(k)?;
    }
    Some(n)
}

/// Integer binomial coefficient over all sign combinations
///
/// This is the table from APL2 p 66.
fn int_binom(l: i64, r: i64) -> Option<i64> {
    fn m1exp(n: i64) -> i64 {
        if n % 2 == 0 {
            1
        } else {
            -1
        }
    }
    if l >= 0 && r >= 0 && r - l >= 0 {
        let lg = int_gamma(l)?;
        let rg = int_gamma(r)?;
        let rlg = int_gamma(r - l)?;
        Some(rg / lg.checked_mul(rlg)?)
    } else if l >= 0 && r >= 0 && r - l < 0 {
        Some(0)
    } else if l >= 0 && r < 0 && r - l < 0 {
        Some(m1exp(l) * int_binom(l, l - (1 + r))?)
    } else if l < 0 && r >= 0 && r - l >= 0 {
        Some(0)
    } else if l < 0 && r < 0 && r - l >= 0 {
        let al1 = (1 + l).abs();
        Some(m1exp(r - l) * int_binom(-(r + 1), al1)?)
    } else {
        Some(0)
    }
}

fn ratio_pow(base: Rational64, exp: i64) -> Option<Rational64> {
    if exp < 0 {
        if base.is_zero() {
            return None;
        }
        return ratio_pow(base.recip(), -exp);
    }
    let mut acc = Rational64::from_integer(1);
    let mut base = base;
    let mut exp = exp as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(&base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(&base)?;
        }
    }
    Some(acc)
}

/// The gamma function via the Lanczos approximation
///
/// `None` at the poles (non-positive integers).
fn gamma_fn(x: f64) -> Option<f64> {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    if x <= 0.0 && x.fract() == 0.0 {
        return None;
    }
    if x < 0.5 {
        // Reflection formula
        let s = (std::f64::consts::PI * x).sin();
        return Some(std::f64::consts::PI / (s * gamma_fn(1.0 - x)?));
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + G + 0.5;
    for (i, &c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    Some((2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a)
}

/// Compare two unified numbers; complex numbers are unordered
pub fn num_cmp(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
        (Num::Ratio(a), Num::Ratio(b)) => Some(a.cmp(&b)),
        (Num::Float(a), Num::Float(b)) => {
            Some(a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan())))
        }
        (Num::Complex(_), Num::Complex(_)) => None,
        _ => num_cmp(
            convert(a, a.kind().max(b.kind())),
            convert(b, a.kind().max(b.kind())),
        ),
    }
}

/// Equality under the comparison tolerance `⎕CT`
///
/// Exact kinds compare exactly; floats and complex numbers compare with a
/// relative tolerance.
pub fn num_eq(a: Num, b: Num, ct: f64) -> bool {
    let k = a.kind().max(b.kind());
    match (convert(a, k), convert(b, k)) {
        (Num::Int(a), Num::Int(b)) => a == b,
        (Num::Ratio(a), Num::Ratio(b)) => a == b,
        (Num::Float(a), Num::Float(b)) => {
            a == b || (a - b).abs() <= ct * a.abs().max(b.abs()).max(1.0)
        }
        (Num::Complex(a), Num::Complex(b)) => a.approx_eq(b, ct),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> Tower {
        Tower::default()
    }

    #[test]
    fn parse_literals() {
        assert_eq!(t().parse("5"), Some(Num::Int(5)));
        assert_eq!(t().parse("¯8"), Some(Num::Int(-8)));
        assert_eq!(t().parse("1.25"), Some(Num::Float(1.25)));
        assert_eq!(t().parse("1.23E¯5"), Some(Num::Float(1.23e-5)));
        assert_eq!(t().parse("1J2"), Some(Num::Complex(Complex::new(1.0, 2.0))));
        assert_eq!(t().parse("3/4"), Some(Num::Ratio(Rational64::new(3, 4))));
        assert_eq!(t().parse("4/2"), Some(Num::Int(2)));
        assert_eq!(t().parse("1.0E¯6a123.8"), None);
        let polar = t().parse("1@90").unwrap();
        match polar {
            Num::Complex(z) => assert_eq!(z.arg_deg(), 90.0),
            n => panic!("expected complex, got {n:?}"),
        }
    }

    #[test]
    fn short_tower_skips_kinds() {
        let t = Tower::new([NumKind::Int, NumKind::Float, NumKind::Complex]);
        assert_eq!(t.parse("3/4"), None);
        // Inexact division promotes straight to float
        assert_eq!(
            t.dyadic(Dyad::Div, Num::Int(1), Num::Int(4)).unwrap(),
            Num::Float(0.25)
        );
    }

    #[test]
    fn promotion_and_closure() {
        // Inexact integer division becomes a rational
        assert_eq!(
            t().dyadic(Dyad::Div, Num::Int(1), Num::Int(4)).unwrap(),
            Num::Ratio(Rational64::new(1, 4))
        );
        // Exact division stays integral
        assert_eq!(
            t().dyadic(Dyad::Div, Num::Int(6), Num::Int(3)).unwrap(),
            Num::Int(2)
        );
        // Overflow promotes
        let big = t()
            .dyadic(Dyad::Mul, Num::Int(i64::MAX), Num::Int(2))
            .unwrap();
        assert_eq!(big.kind(), NumKind::Float);
        // Negative logarithm closes in the complex plane
        let z = t().monadic(Monad::Ln, Num::Float(-1.0)).unwrap();
        assert_eq!(z.kind(), NumKind::Complex);
        // Division by zero never promotes
        assert!(t().dyadic(Dyad::Div, Num::Int(1), Num::Int(0)).is_err());
    }

    #[test]
    fn factorials_and_binomials() {
        assert_eq!(t().monadic(Monad::Gamma, Num::Int(5)).unwrap(), Num::Int(120));
        assert_eq!(
            t().dyadic(Dyad::Binom, Num::Int(2), Num::Int(5)).unwrap(),
            Num::Int(10)
        );
        // From the APL2 p 66 sign table
        assert_eq!(
            t().dyadic(Dyad::Binom, Num::Int(3), Num::Int(2)).unwrap(),
            Num::Int(0)
        );
        assert_eq!(
            t().dyadic(Dyad::Binom, Num::Int(2), Num::Int(-3)).unwrap(),
            Num::Int(6)
        );
        // 21! exceeds i64 and promotes to float
        let big = t().monadic(Monad::Gamma, Num::Int(21)).unwrap();
        assert_eq!(big.kind(), NumKind::Float);
        // The poles stay undefined all the way up the tower
        assert!(t().monadic(Monad::Gamma, Num::Int(-1)).is_err());
    }

    #[test]
    fn tolerant_comparison() {
        assert!(num_eq(Num::Float(1.0), Num::Float(1.0 + 1e-14), 1e-13));
        assert!(!num_eq(Num::Float(1.0), Num::Float(1.001), 1e-13));
        assert!(num_eq(Num::Int(2), Num::Float(2.0), 0.0));
    }

    #[test]
    fn gamma_function_values() {
        assert!((gamma_fn(5.0).unwrap() - 24.0).abs() < 1e-9);
        assert!((gamma_fn(0.5).unwrap() - std::f64::consts::PI.sqrt()).abs() < 1e-12);
        assert!(gamma_fn(0.0).is_none());
    }
}
