use std::rc::Rc;

use crate::{
    array::{Array, ArrayData},
    eval::Aplite,
    function::{Function, Native},
    num::{Num, Tower},
    value::{List, Value},
    AplError, AplResult, Shape,
};

/// Parse a rectangular array from text the formatter produced
///
/// Understands the `-1` table, `-2` JSON and `-3` matrix-literal output
/// forms. With a uniform prototype the parsed elements unify to the
/// prototype's element kind or the parse fails.
pub fn parse_array(tower: &Tower, prototype: Option<&Value>, s: &str) -> AplResult<Value> {
    let v = scan_rank_array(tower, s, -1)?
        .ok_or_else(|| AplError::domain("parse array: empty input"))?;
    if let Some(Value::Array(proto)) = prototype {
        if proto.is_uniform() {
            let Value::Array(arr) = v else {
                return Err(AplError::domain("parse array: result is not an array"));
            };
            return Ok(Value::Array(unify(&arr, proto)?));
        }
    }
    Ok(v)
}

fn unify(arr: &Array, proto: &Array) -> AplResult<Array> {
    let shape = arr.shape().clone();
    let data = match proto.data() {
        ArrayData::Ints(_) => {
            let mut ints = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                match v {
                    Value::Num(Num::Int(i)) => ints.push(i),
                    _ => return Err(AplError::domain("parse array: result has wrong type")),
                }
            }
            ArrayData::Ints(ints.into_iter().collect())
        }
        ArrayData::Floats(_) => {
            let mut floats = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                match v.as_num().and_then(|n| n.as_f64()) {
                    Some(f) => floats.push(f),
                    None => return Err(AplError::domain("parse array: result has wrong type")),
                }
            }
            ArrayData::Floats(floats.into_iter().collect())
        }
        ArrayData::Chars(_) => {
            let mut chars = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                match v {
                    Value::Char(c) => chars.push(c),
                    _ => return Err(AplError::domain("parse array: result has wrong type")),
                }
            }
            ArrayData::Chars(chars.into_iter().collect())
        }
        ArrayData::Strings(_) => {
            let mut strings = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                match v {
                    Value::Str(s) => strings.push(s),
                    _ => return Err(AplError::domain("parse array: result has wrong type")),
                }
            }
            ArrayData::Strings(strings.into_iter().collect())
        }
        ArrayData::Mixed(_) => return Ok(arr.clone()),
    };
    Ok(Array::new(shape, data))
}

/// Scan the next sub-array of a given rank from text
///
/// `\n`, `;` and `]` terminate axes; the count of consecutive terminators
/// raises the axis level, and a level seen before fixes a dimension. A
/// negative rank is unrestricted. Rank 0 returns the first bare value.
/// `Ok(None)` means the input held no values.
pub fn scan_rank_array(tower: &Tower, s: &str, rank: i64) -> AplResult<Option<Value>> {
    let chars: Vec<char> = s.chars().collect();
    let mut pos = 0usize;
    let mut values: Vec<Value> = Vec::new();
    let mut shape: Vec<usize> = Vec::new();
    let mut have_shape = false;
    let mut c: i64 = 0;
    while let Some(&r) = chars.get(pos) {
        pos += 1;
        if r == '\n' || r == ';' || r == ']' {
            if values.is_empty() {
                continue;
            }
            c += 1;
            if c == rank {
                break;
            } else if c > shape.len() as i64 {
                if !have_shape {
                    shape = vec![values.len()];
                    have_shape = true;
                } else {
                    let p: usize = shape.iter().product();
                    if p == 0 {
                        return Err(AplError::domain("parse array: divide by zero"));
                    }
                    shape.insert(0, values.len() / p);
                }
            }
        } else if r.is_whitespace() || r == ',' || r == '[' || r == '(' || r == ')' {
            continue;
        } else if r == '"' {
            c = 0;
            let s = read_quoted(&chars, &mut pos)?;
            if rank == 0 {
                return Ok(Some(Value::Str(s.into())));
            }
            values.push(Value::Str(s.into()));
        } else {
            c = 0;
            pos -= 1;
            let lexeme = scan_number(&chars, &mut pos);
            let n = tower.parse(&lexeme).ok_or_else(|| {
                AplError::domain(format!("parse array: cannot parse number `{lexeme}`"))
            })?;
            if rank == 0 {
                return Ok(Some(Value::Num(n)));
            }
            values.push(Value::Num(n));
        }
    }
    if values.is_empty() {
        return Ok(None);
    }
    // The scan does not check rectangularity in between; the final shape
    // check may accept false positives, like the original.
    let mut rank = rank;
    if rank < 0 {
        rank = shape.len() as i64;
        let p: usize = shape.iter().product();
        if p == values.len() {
            rank = shape.len() as i64 - 1;
        }
    }
    let mut i = 0i64;
    while i <= rank - shape.len() as i64 {
        let p: usize = if shape.is_empty() {
            1
        } else {
            shape.iter().product()
        };
        if p == 0 {
            return Err(AplError::domain("parse array: divide by zero"));
        }
        shape.insert(0, values.len() / p);
        let total: usize = shape.iter().product();
        if total != values.len() {
            return Err(AplError::length(format!(
                "parse array: array is not rectangular: ×/{shape:?} ≠ {}",
                values.len()
            )));
        }
        i += 1;
    }
    if shape.is_empty() {
        return Ok(Some(values.remove(0)));
    }
    Ok(Some(Value::Array(Array::from((
        Shape::from(shape.as_slice()),
        values,
    )))))
}

/// A numeric lexeme for the array scanner; stops at delimiters the
/// formatter uses
fn scan_number(chars: &[char], pos: &mut usize) -> String {
    let mut lexeme = String::new();
    while let Some(&r) = chars.get(*pos) {
        if r.is_ascii_alphanumeric() || matches!(r, '.' | '¯' | '@' | '/' | '+' | '-') {
            lexeme.push(r);
            *pos += 1;
        } else {
            break;
        }
    }
    lexeme
}

/// Read a double-quoted string with backslash escapes
fn read_quoted(chars: &[char], pos: &mut usize) -> AplResult<String> {
    let mut s = String::new();
    loop {
        let Some(&r) = chars.get(*pos) else {
            return Err(AplError::domain("parse array: unterminated string"));
        };
        *pos += 1;
        match r {
            '"' => return Ok(s),
            '\\' => {
                let Some(&e) = chars.get(*pos) else {
                    return Err(AplError::domain("parse array: unterminated string"));
                };
                *pos += 1;
                match e {
                    'n' => s.push('\n'),
                    'r' => s.push('\r'),
                    't' => s.push('\t'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    'u' => {
                        // Both \uXXXX and the Rust debug form \u{XXXX}
                        let braced = chars.get(*pos) == Some(&'{');
                        if braced {
                            *pos += 1;
                        }
                        let mut code = 0u32;
                        let mut digits = 0;
                        while let Some(d) = chars.get(*pos).and_then(|c| c.to_digit(16)) {
                            code = code * 16 + d;
                            *pos += 1;
                            digits += 1;
                            if !braced && digits == 4 {
                                break;
                            }
                        }
                        if braced && chars.get(*pos) == Some(&'}') {
                            *pos += 1;
                        }
                        let c = char::from_u32(code).ok_or_else(|| {
                            AplError::domain("parse array: invalid unicode escape")
                        })?;
                        s.push(c);
                    }
                    e => {
                        return Err(AplError::domain(format!(
                            "parse array: invalid escape \\{e}"
                        )))
                    }
                }
            }
            r => s.push(r),
        }
    }
}

/// Register the line-delimited external ingestion function `io→r`
///
/// `io→r RANK` drains the bound reader and yields a list of
/// `(data;flag;)` pairs: one value per token at rank 0, one vector per
/// line at rank 1, one matrix per blank-separated block at rank 2.
pub fn register_ingest(a: &mut Aplite) {
    a.set_var(
        "io→r",
        Value::Func(Function::Native(Rc::new(Native {
            name: "io→r".into(),
            f: Box::new(ingest_read),
        }))),
    );
}

fn ingest_read(a: &mut Aplite, left: Option<Value>, right: Value) -> AplResult<Value> {
    if left.is_some() {
        return Err(AplError::domain("the reader takes no left argument"));
    }
    let rank = right
        .as_index()
        .filter(|r| (0..=2).contains(r))
        .ok_or_else(|| AplError::domain("read rank must be 0, 1 or 2"))?;
    let mut lines = Vec::new();
    while let Some(line) = a.read_stdin_line()? {
        lines.push(line);
    }
    let tower = a.tower().clone();
    let mut items: Vec<Value> = Vec::new();
    // Items are flagged as same-table continuations only when the stream
    // uses a separator one level above the requested rank at all;
    // otherwise each item is a table of its own.
    let has_sep;
    match rank {
        0 => {
            let content: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
            has_sep = content.len() > 1;
            for line in content {
                for token in line.split_whitespace() {
                    let n = tower.parse(token).ok_or_else(|| {
                        AplError::domain(format!("cannot parse number `{token}`"))
                    })?;
                    items.push(Value::Num(n));
                }
            }
        }
        1 => {
            let chunks = chunked(&lines, 1);
            has_sep = chunks.len() > 1;
            for chunk in chunks {
                for line in chunk {
                    if let Some(v) = scan_rank_array(&tower, &line, 1)? {
                        items.push(v);
                    }
                }
            }
        }
        _ => {
            let supergroups = chunked(&lines, 2);
            has_sep = supergroups.len() > 1;
            for group in supergroups {
                for chunk in chunked(&group, 1) {
                    if let Some(v) = scan_rank_array(&tower, &chunk.join("\n"), 2)? {
                        items.push(v);
                    }
                }
            }
        }
    }
    let rows: Vec<Value> = items
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            let flag = Value::from(i > 0 && has_sep);
            Value::List(List([data, flag].into_iter().collect()))
        })
        .collect();
    Ok(Value::List(List(rows.into_iter().collect())))
}

/// Split lines into groups separated by runs of at least `level` blanks
fn chunked(lines: &[String], level: usize) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut blanks = 0;
    for line in lines {
        if line.trim().is_empty() {
            blanks += 1;
            if blanks == level && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            if blanks < level {
                current.push(line.clone());
            }
        } else {
            blanks = 0;
            current.push(line.clone());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
