use std::collections::HashMap;

use crate::{
    array::Array,
    num::Num,
    object::Dict,
    value::{Kind, List, Value},
    AplError, AplResult,
};

/// The format configuration `⎕PP` controls
///
/// `pp >= 0` is a float precision (0 means default formatting). Negative
/// values select modes: `-1` table, `-2` single-line JSON, `-3` matrix
/// literal, `-8` octal, `-16` hexadecimal. Per-kind printf-style format
/// strings override the defaults.
#[derive(Debug, Clone)]
pub struct FmtConfig {
    pub pp: i64,
    pub fmt: HashMap<Kind, String>,
}

impl Default for FmtConfig {
    fn default() -> Self {
        FmtConfig {
            pp: 0,
            fmt: HashMap::new(),
        }
    }
}

impl FmtConfig {
    /// Apply a value assigned to `⎕PP`
    ///
    /// An integer sets the precision or mode. A dict sets per-kind format
    /// strings, selected by the kind of each key. The empty array resets.
    pub fn set_pp(&mut self, value: &Value) -> AplResult<()> {
        match value {
            Value::Array(a) if a.len() == 0 => {
                self.pp = 0;
                self.fmt.clear();
                Ok(())
            }
            Value::Dict(d) => {
                for (k, v) in d.iter() {
                    if let Value::Str(s) = v {
                        self.fmt.insert(k.kind(), s.to_string());
                    }
                }
                Ok(())
            }
            Value::Num(n) => {
                if let Some(i) = n.as_index() {
                    self.pp = i;
                    Ok(())
                } else {
                    Err(AplError::domain("illegal type for PP"))
                }
            }
            _ => Err(AplError::domain("illegal type for PP")),
        }
    }
}

/// Render a value under a format configuration
pub fn format_value(value: &Value, f: &FmtConfig) -> AplResult<String> {
    fmt_value(value, f, &mut Vec::new())
}

fn fmt_value(value: &Value, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    match value {
        Value::Num(n) => Ok(fmt_num(n, f)),
        Value::Char(c) => Ok(c.to_string()),
        Value::Str(s) => Ok(if let Some(spec) = f.fmt.get(&Kind::Str) {
            printf(spec, &PrintfArg::Str(s))
        } else if f.pp < 0 {
            format!("{:?}", s.as_str())
        } else {
            s.to_string()
        }),
        Value::Array(a) => fmt_array(a, f, seen),
        Value::List(l) => fmt_list(l, f, seen),
        Value::Dict(d) => fmt_dict(d, f, seen),
        Value::Func(func) => Ok(func.to_string()),
    }
}

fn enter(seen: &mut Vec<*const ()>, ptr: *const ()) -> bool {
    if seen.contains(&ptr) {
        return false;
    }
    seen.push(ptr);
    true
}

fn fmt_list(l: &List, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    let ptr = l.0.as_ptr() as *const ();
    if !l.is_empty() && !enter(seen, ptr) {
        return Ok("…".into());
    }
    let mut s = String::from("(");
    for v in l.iter() {
        s.push_str(&fmt_value(v, f, seen)?);
        s.push(';');
    }
    s.push(')');
    if !l.is_empty() {
        seen.pop();
    }
    Ok(s)
}

/// Format an n-dimensional array
///
/// For the table modes every cell is right-aligned to one more than its
/// column's width, and dimension k is terminated by k newlines, so rank 3
/// prints with blank lines between planes.
fn fmt_array(a: &Array, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    if f.pp == -2 {
        return json_array(a, f, seen);
    } else if f.pp == -3 {
        return mat_array(a, f, seen);
    }
    let shape = a.shape();
    if shape.is_empty() {
        return Ok(String::new());
    }
    let mut cells = Vec::with_capacity(a.len());
    for v in a.iter() {
        cells.push(fmt_value(&v, f, seen)?);
    }
    if shape.len() == 1 {
        return Ok(cells.join(" "));
    }
    let cols = *shape.last().unwrap();
    let mut widths = vec![0usize; cols];
    for (i, cell) in cells.iter().enumerate() {
        let w = cell.chars().count();
        let col = i % cols;
        widths[col] = widths[col].max(w);
    }
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut idx = vec![0usize; shape.len()];
    for (i, cell) in cells.iter().enumerate() {
        let col = i % cols;
        for _ in cell.chars().count()..widths[col] + 1 {
            line.push(' ');
        }
        line.push_str(cell);
        let term = bump_index(&mut idx, shape);
        if i + 1 == cells.len() {
            lines.push(std::mem::take(&mut line));
        } else if term > 0 {
            lines.push(std::mem::take(&mut line));
            for _ in 1..term {
                lines.push(String::new());
            }
        }
    }
    Ok(lines.join("\n"))
}

/// Advance a row-major index; the return value is the number of trailing
/// dimensions that wrapped (0 while inside a row)
fn bump_index(idx: &mut [usize], shape: &[usize]) -> usize {
    for i in 0..idx.len() {
        let k = idx.len() - 1 - i;
        idx[k] += 1;
        if idx[k] == shape[k] {
            idx[k] = 0;
        } else {
            return i;
        }
    }
    idx.len()
}

fn json_array(a: &Array, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    let mut cells = Vec::with_capacity(a.len());
    for v in a.iter() {
        cells.push(fmt_value(&v, f, seen)?);
    }
    fn vector(cells: &[String], dims: &[usize]) -> String {
        match dims {
            [] | [_] => format!("[{}]", cells.join(",")),
            [d, rest @ ..] => {
                let inc: usize = rest.iter().product();
                let mut parts = Vec::with_capacity(*d);
                for i in 0..*d {
                    parts.push(vector(&cells[i * inc..(i + 1) * inc], rest));
                }
                format!("[{}]", parts.join(","))
            }
        }
    }
    Ok(vector(&cells, a.shape()))
}

fn mat_array(a: &Array, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    let mut cells = Vec::with_capacity(a.len());
    for v in a.iter() {
        cells.push(fmt_value(&v, f, seen)?);
    }
    match a.shape().dims() {
        [] | [_] => Ok(format!("[{}]", cells.join(","))),
        [rows, cols] => {
            let mut parts = Vec::with_capacity(*rows);
            for i in 0..*rows {
                parts.push(cells[i * cols..(i + 1) * cols].join(","));
            }
            Ok(format!("[{}]", parts.join(";")))
        }
        _ => Err(AplError::rank(
            "matrix literal output is limited to rank 2",
        )),
    }
}

fn fmt_dict(d: &Dict, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    let ptr = d.keys().as_ptr() as *const ();
    if !d.is_empty() && !enter(seen, ptr) {
        return Ok("…".into());
    }
    let result = fmt_dict_inner(d, f, seen);
    if !d.is_empty() {
        seen.pop();
    }
    result
}

fn fmt_dict_inner(d: &Dict, f: &FmtConfig, seen: &mut Vec<*const ()>) -> AplResult<String> {
    if f.pp == -2 {
        let mut s = String::from("{");
        for (i, (k, v)) in d.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&fmt_value(k, f, seen)?);
            s.push(':');
            s.push_str(&fmt_value(v, f, seen)?);
        }
        s.push('}');
        return Ok(s);
    }
    if f.pp == -3 {
        let mut s = String::from("struct(");
        for (i, (k, v)) in d.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&fmt_value(k, f, seen)?);
            s.push(',');
            s.push_str(&fmt_value(v, f, seen)?);
        }
        s.push(')');
        return Ok(s);
    }
    let mut keys = Vec::with_capacity(d.len());
    let mut vals = Vec::with_capacity(d.len());
    for (k, v) in d.iter() {
        keys.push(format!("{}:", fmt_value(k, f, seen)?));
        vals.push(fmt_value(v, f, seen)?);
    }
    let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0);
    let lines: Vec<String> = keys
        .iter()
        .zip(&vals)
        .map(|(k, v)| format!("{k:<w$} {v}", w = width))
        .collect();
    Ok(lines.join("\n"))
}

/// Default rendering of a number
pub(crate) fn num_str(n: &Num) -> String {
    fmt_num(n, &FmtConfig::default())
}

fn fmt_num(n: &Num, f: &FmtConfig) -> String {
    let kind = Value::Num(*n).kind();
    if let Some(spec) = f.fmt.get(&kind) {
        return printf(spec, &PrintfArg::Num(*n));
    }
    match n {
        Num::Int(i) => match f.pp {
            -8 => high_minus(&format!("{}0{:o}", if *i < 0 { "-" } else { "" }, i.unsigned_abs())),
            -16 => high_minus(&format!(
                "{}0x{:x}",
                if *i < 0 { "-" } else { "" },
                i.unsigned_abs()
            )),
            _ => high_minus(&i.to_string()),
        },
        Num::Ratio(r) => high_minus(&r.to_string()),
        Num::Float(x) => fmt_float(*x, f),
        Num::Complex(z) => {
            let mag = fmt_float(z.abs(), f);
            let deg = fmt_float(z.arg_deg(), f);
            format!("{mag}@{deg}")
        }
    }
}

fn fmt_float(x: f64, f: &FmtConfig) -> String {
    if f.pp == -16 {
        return high_minus(&float_bits(x));
    }
    if f.pp > 0 {
        return high_minus(&g_format(x, f.pp as usize));
    }
    if f.pp < 0 {
        // Full precision for round trips
        return high_minus(&format!("{x}"));
    }
    high_minus(&float_str(x))
}

fn high_minus(s: &str) -> String {
    s.replacen('-', "¯", 1)
}

/// Default float rendering
///
/// The shortest round-trip form, except that a long run of 0s or 9s in
/// the digits means the value sits a rounding error away from a much
/// shorter one, which is printed instead.
pub(crate) fn float_str(x: f64) -> String {
    if !x.is_finite() || x.fract() == 0.0 {
        return format!("{x}");
    }
    let formatted = format!("{x}");
    let consecutive = |c: char| {
        let mut max = 0;
        let mut curr = 0;
        for ch in formatted.chars() {
            if ch == c {
                curr += 1;
                max = max.max(curr);
            } else {
                curr = 0;
            }
        }
        max
    };
    if consecutive('0') > 5 || consecutive('9') > 5 {
        for digits in 1..=15usize {
            let rounded: f64 = format!("{x:.digits$e}", digits = digits - 1)
                .parse()
                .unwrap_or(x);
            if (x - rounded).abs() <= x.abs() * 1e-13 {
                return format!("{rounded}");
            }
        }
    }
    formatted
}

/// `%.{prec}G`: `prec` significant digits, exponent form outside
/// `[1e-4, 1e{prec})`, trailing zeros trimmed
fn g_format(x: f64, prec: usize) -> String {
    let prec = prec.max(1);
    if x == 0.0 {
        return "0".into();
    }
    if !x.is_finite() {
        return format!("{x}");
    }
    let rounded: f64 = format!("{x:.p$e}", p = prec - 1).parse().unwrap_or(x);
    let exp = rounded.abs().log10().floor() as i32;
    if exp < -4 || exp >= prec as i32 {
        let s = format!("{rounded:.p$e}", p = prec.saturating_sub(1));
        let (mantissa, e) = s.split_once('e').unwrap();
        let mantissa = trim_zeros(mantissa);
        format!("{mantissa}E{e}")
    } else {
        let decimals = (prec as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{rounded:.decimals$}"))
    }
}

fn trim_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.into();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// A float as integer mantissa and binary exponent, `mpe`
fn float_bits(x: f64) -> String {
    if x == 0.0 {
        return "0p0".into();
    }
    let bits = x.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exp_bits = ((bits >> 52) & 0x7ff) as i64;
    let frac = bits & ((1u64 << 52) - 1);
    let (m, e) = if exp_bits == 0 {
        (frac, -1074)
    } else {
        (frac | (1 << 52), exp_bits - 1075)
    };
    format!("{sign}{m}p{e}")
}

pub(crate) enum PrintfArg<'a> {
    Num(Num),
    Str(&'a str),
}

/// A minimal printf for the registered per-kind format strings
///
/// Supports `%[width][.prec]` with verbs `v d o x X f e E g G s q b`.
/// `-` in the output is rewritten `¯` unless the format string itself
/// begins with `-`.
pub(crate) fn printf(spec: &str, arg: &PrintfArg) -> String {
    let (keep_minus, spec) = if spec.len() > 1 && spec.starts_with('-') {
        (true, &spec[1..])
    } else {
        (false, spec)
    };
    let mut out = String::new();
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut width = String::new();
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            width.push(chars.next().unwrap());
        }
        let mut prec = String::new();
        if chars.peek() == Some(&'.') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                prec.push(chars.next().unwrap());
            }
        }
        let verb = chars.next().unwrap_or('v');
        let width: usize = width.parse().unwrap_or(0);
        let prec: Option<usize> = prec.parse().ok();
        let rendered = printf_verb(verb, prec, arg);
        if rendered.chars().count() < width {
            for _ in rendered.chars().count()..width {
                out.push(' ');
            }
        }
        out.push_str(&rendered);
    }
    if keep_minus {
        out
    } else {
        high_minus(&out)
    }
}

fn printf_verb(verb: char, prec: Option<usize>, arg: &PrintfArg) -> String {
    match arg {
        PrintfArg::Str(s) => match verb {
            'q' => format!("{s:?}"),
            _ => (*s).to_string(),
        },
        PrintfArg::Num(n) => {
            let int = n.as_index();
            let float = n.as_f64();
            match verb {
                'd' => int.map(|i| i.to_string()).unwrap_or_else(|| num_str(n)),
                'o' => int
                    .map(|i| format!("{}0{:o}", if i < 0 { "-" } else { "" }, i.unsigned_abs()))
                    .unwrap_or_else(|| num_str(n)),
                'x' => int
                    .map(|i| format!("{}0x{:x}", if i < 0 { "-" } else { "" }, i.unsigned_abs()))
                    .unwrap_or_else(|| num_str(n)),
                'X' => int
                    .map(|i| format!("{}0x{:X}", if i < 0 { "-" } else { "" }, i.unsigned_abs()))
                    .unwrap_or_else(|| num_str(n)),
                'f' => float
                    .map(|x| format!("{x:.p$}", p = prec.unwrap_or(6)))
                    .unwrap_or_else(|| num_str(n)),
                'e' => float
                    .map(|x| format!("{x:.p$e}", p = prec.unwrap_or(6)))
                    .unwrap_or_else(|| num_str(n)),
                'E' => float
                    .map(|x| format!("{x:.p$e}", p = prec.unwrap_or(6)).to_uppercase())
                    .unwrap_or_else(|| num_str(n)),
                'g' | 'G' => float
                    .map(|x| g_format(x, prec.unwrap_or(15)))
                    .unwrap_or_else(|| num_str(n)),
                'b' => float.map(float_bits).unwrap_or_else(|| num_str(n)),
                _ => num_str(n),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn cfg(pp: i64) -> FmtConfig {
        FmtConfig {
            pp,
            fmt: HashMap::new(),
        }
    }

    fn ints(v: Vec<i64>) -> Value {
        Value::Array(Array::from(v))
    }

    fn matrix() -> Value {
        Value::Array(
            Array::from(vec![1i64, 2, 3, 4, 5, 6])
                .reshape(Shape::from([2, 3]))
                .unwrap(),
        )
    }

    #[test]
    fn vectors_join_with_spaces() {
        let v = ints(vec![1, 2, 3]);
        assert_eq!(format_value(&v, &cfg(0)).unwrap(), "1 2 3");
        assert_eq!(format_value(&ints(vec![]), &cfg(0)).unwrap(), "");
    }

    #[test]
    fn tables_right_align() {
        assert_eq!(format_value(&matrix(), &cfg(0)).unwrap(), " 1 2 3\n 4 5 6");
        let wide = Value::Array(
            Array::from(vec![52i64, 58, 124, 139])
                .reshape(Shape::from([2, 2]))
                .unwrap(),
        );
        assert_eq!(format_value(&wide, &cfg(0)).unwrap(), "  52  58\n 124 139");
    }

    #[test]
    fn rank_3_blank_lines() {
        let cube = Value::Array(
            Array::from((1i64..=8).collect::<Vec<_>>())
                .reshape(Shape::from([2, 2, 2]))
                .unwrap(),
        );
        assert_eq!(
            format_value(&cube, &cfg(0)).unwrap(),
            " 1 2\n 3 4\n\n 5 6\n 7 8"
        );
    }

    #[test]
    fn json_and_matrix_literals() {
        assert_eq!(format_value(&matrix(), &cfg(-2)).unwrap(), "[[1,2,3],[4,5,6]]");
        assert_eq!(format_value(&matrix(), &cfg(-3)).unwrap(), "[1,2,3;4,5,6]");
        assert_eq!(format_value(&ints(vec![1, 2]), &cfg(-3)).unwrap(), "[1,2]");
        let cube = Value::Array(
            Array::from(vec![1i64; 8]).reshape(Shape::from([2, 2, 2])).unwrap(),
        );
        assert!(format_value(&cube, &cfg(-3)).is_err());
    }

    #[test]
    fn octal_and_hex() {
        let v = Value::from(255i64);
        assert_eq!(format_value(&v, &cfg(-8)).unwrap(), "0377");
        assert_eq!(format_value(&v, &cfg(-16)).unwrap(), "0xff");
        assert_eq!(format_value(&Value::from(-8i64), &cfg(-8)).unwrap(), "¯010");
    }

    #[test]
    fn negative_numbers_use_high_minus() {
        assert_eq!(format_value(&Value::from(-3i64), &cfg(0)).unwrap(), "¯3");
        assert_eq!(format_value(&Value::from(-2.5), &cfg(0)).unwrap(), "¯2.5");
    }

    #[test]
    fn precision() {
        assert_eq!(g_format(1790.8476965428547, 6), "1790.85");
        assert_eq!(g_format(0.25, 6), "0.25");
        assert_eq!(g_format(123456789.0, 4), "1.235E8");
        assert_eq!(format_value(&Value::from(0.25), &cfg(0)).unwrap(), "0.25");
    }

    #[test]
    fn epsilon_rounding() {
        assert_eq!(float_str(1.0000000000000002), "1");
        assert_eq!(float_str(0.30000000000000004), "0.3");
        assert_eq!(float_str(1790.8476965428547), "1790.8476965428547");
    }

    #[test]
    fn per_kind_formats() {
        let mut f = cfg(0);
        f.fmt.insert(Kind::Int, "%x".into());
        assert_eq!(format_value(&Value::from(255i64), &f).unwrap(), "0xff");
        f.fmt.insert(Kind::Float, "%.2f".into());
        assert_eq!(format_value(&Value::from(1.237), &f).unwrap(), "1.24");
        // A leading minus in the format keeps ASCII minus signs
        f.fmt.insert(Kind::Float, "-%.2f".into());
        assert_eq!(format_value(&Value::from(-1.237), &f).unwrap(), "-1.24");
    }

    #[test]
    fn dict_forms() {
        let mut d = Dict::new();
        d.set(Value::from("alpha"), Value::from(1i64));
        d.set(Value::from("b"), Value::from(2i64));
        let v = Value::Dict(d);
        assert_eq!(format_value(&v, &cfg(0)).unwrap(), "alpha: 1\nb:     2");
        assert_eq!(
            format_value(&v, &cfg(-2)).unwrap(),
            "{\"alpha\":1,\"b\":2}"
        );
        assert_eq!(
            format_value(&v, &cfg(-3)).unwrap(),
            "struct(\"alpha\",1,\"b\",2)"
        );
    }

    #[test]
    fn lists() {
        let l = List(
            [
                Value::from(7i64),
                Value::List(List([Value::from(8i64), Value::from(0i64)].into_iter().collect())),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(format_value(&Value::List(l), &cfg(0)).unwrap(), "(7;(8;0;);)");
    }

    #[test]
    fn complex_polar_form() {
        let z = Value::Num(Num::Complex(crate::Complex::new(1.0, 1.0)));
        assert_eq!(
            format_value(&z, &cfg(0)).unwrap(),
            "1.4142135623730951@45"
        );
        let sum = crate::Complex::from_polar_deg(1.0, 60.0) + crate::Complex::from_polar_deg(1.0, 300.0);
        assert_eq!(
            format_value(&Value::Num(Num::Complex(sum)), &cfg(0)).unwrap(),
            "1@0"
        );
    }
}
