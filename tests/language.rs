use std::{cell::RefCell, io::Write, rc::Rc};

use aplite::{num::Tower, primitive, AplError, Aplite};

#[derive(Clone, Default)]
struct Buf(Rc<RefCell<Vec<u8>>>);

impl Write for Buf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Buf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn interpreter(buf: Buf) -> Aplite {
    let mut a = Aplite::new(buf);
    a.register_tower(Tower::default());
    primitive::register_primitives(&mut a);
    primitive::register_operators(&mut a);
    a
}

/// Compare ignoring differences in whitespace, like table alignment
fn test_compare(got: &str, exp: &str, eq: impl Fn(&str, &str) -> bool) -> bool {
    let got_lines: Vec<&str> = got.trim().lines().collect();
    let exp_lines: Vec<&str> = exp.trim().lines().collect();
    if got_lines.len() != exp_lines.len() {
        return false;
    }
    got_lines.iter().zip(&exp_lines).all(|(g, e)| {
        let gf: Vec<&str> = g.split_whitespace().collect();
        let ef: Vec<&str> = e.split_whitespace().collect();
        gf.len() == ef.len() && gf.iter().zip(&ef).all(|(a, b)| eq(a, b))
    })
}

fn cmp_floats(a: &str, b: &str) -> bool {
    let tol = 1.0e-9;
    let parse = |s: &str| s.replace('¯', "-").parse::<f64>();
    match (parse(a), parse(b)) {
        (Ok(f), Ok(g)) => (f - g).abs() <= tol * f.abs().max(g.abs()).max(1.0),
        _ => false,
    }
}

enum Cmp {
    Exact,
    Floats,
}

#[test]
fn language() {
    use Cmp::*;
    let cases: &[(&str, &str, Cmp)] = &[
        // Basic numbers and arithmetic
        ("1", "1", Exact),
        ("1+1", "2", Exact),
        ("1-2", "¯1", Exact),
        ("¯1", "¯1", Exact),
        ("1-¯2", "3", Exact),
        ("1@90", "1@90", Exact),
        ("1@60+1@300", "1@0", Exact),
        ("1J1", "1.4142135623730951@45", Exact),
        // Vectors
        ("1 2 3", "1 2 3", Exact),
        ("1+1 2 3", "2 3 4", Exact),
        ("1 2 3+¯1", "0 1 2", Exact),
        ("1 2 3+4 5 6", "5 7 9", Exact),
        // Braces
        ("1 2+3 4", "4 6", Exact),
        ("1 (2+3) 4", "1 5 4", Exact),
        ("(1 2)+3 4", "4 6", Exact),
        ("1×2+3×4", "14", Exact),
        ("1×(2+3)×4", "20", Exact),
        ("(3×2)+3×4", "18", Exact),
        ("3×2+3×4", "42", Exact),
        // Multiple statements
        ("1⋄2⋄3", "1\n2\n3", Exact),
        // Iota and reshape
        ("⍳5", "1 2 3 4 5", Exact),
        ("⍳0", "", Exact),
        ("⍴⍳5", "5", Exact),
        ("⍴5", "", Exact),
        ("⍴⍴5", "0", Exact),
        ("⍴⍳0", "0", Exact),
        ("⍴⍴⍳0", "1", Exact),
        ("2 3⍴1", "1 1 1\n1 1 1", Exact),
        // Basic operators
        ("+/1 2 3", "6", Exact),
        ("1 2 3 +.× 4 3 2", "16", Exact),
        ("(2 3⍴⍳6) +.× 3 2⍴5+⍳6", "52 58\n124 139", Exact),
        ("+/2 3⍴⍳6", "6 15", Exact),
        ("+/[1]2 3⍴⍳6", "5 7 9", Exact),
        ("{2×⍵}¨1 2 3", "2 4 6", Exact),
        ("1+¨1 2 3", "2 3 4", Exact),
        ("2÷⍨10", "5", Exact),
        ("+⍨3", "6", Exact),
        ("-∘÷2", "¯1/2", Exact),
        // Variable assignments
        ("X←3", "", Exact),
        ("-X←3", "¯3", Exact),
        ("X←3⋄X←4", "", Exact),
        ("X←3⋄⎕←X", "3", Exact),
        ("f←+", "", Exact),
        ("f←+⋄⎕←3 f 3", "6", Exact),
        // An inexact division lands in the rational kind of the tower
        ("X←4⋄⎕←÷X", "1/4", Exact),
        // IBM APL Language, 3rd edition, June 1976
        (
            "1000×(1+.06÷1 4 12 365)*10×1 4 12 365",
            "1790.8476965428547 1814.0184086689414 1819.3967340322804 1822.0289545386752",
            Floats,
        ),
        ("Area ← 3×4\nX←2+⎕←3×Y←4\nX\nY", "12\n14\n4", Exact),
        // Lambda expressions
        ("{2×⍵}3", "6", Exact),
        ("2{⍺+3{⍺×⍵}⍵+2}2", "14", Exact),
        ("2{(⍺+3){⍺×⍵}⍵+⍺{⍺+1+⍵}1+2}2", "40", Exact),
        ("1{1+⍺{1+⍺{1+⍺+⍵}1+⍵}1+⍵}1", "7", Exact),
        ("2{}4", "", Exact),
        ("{⍺×⍵}/2 3 4", "24", Exact),
        ("{⍵≤1:1 ⋄ ⍵×∇⍵-1}5", "120", Exact),
        // Pervasive arithmetic through the tower
        ("!5", "120", Exact),
        ("2!5", "10", Exact),
        ("6∨15", "3", Exact),
        ("3|5 6 7", "2 0 1", Exact),
        ("⌈2.5", "3", Exact),
        ("2⌈3", "3", Exact),
        ("2*10", "1024", Exact),
        ("2⍟8", "3", Exact),
        ("|¯4", "4", Exact),
        // Comparisons
        ("1 2 3=1 0 3", "1 0 1", Exact),
        ("2<1 2 3", "0 0 1", Exact),
        ("(1 2)≡1 2", "1", Exact),
        ("(1 2)≡1 3", "0", Exact),
        // Indexing
        ("1 2 3⍳2", "2", Exact),
        ("(⍳5)[2]", "2", Exact),
        ("A←2 3⍴⍳6⋄A[2;3]", "6", Exact),
        ("A←2 3⍴⍳6⋄A[1;]", "1 2 3", Exact),
        ("⎕IO←0⋄⍳3", "0 1 2", Exact),
        // Strings
        ("\"hello\"", "hello", Exact),
        ("'it''s'", "it's", Exact),
        ("`sym", "sym", Exact),
        ("1 2,3 4", "1 2 3 4", Exact),
        // Dicts
        ("D←`a`b#1 2⋄D[`a]", "1", Exact),
        ("D←`a`b#1 2⋄#D", "a b", Exact),
        ("⎕PP←¯2⋄`k#42", "{\"k\":42}", Exact),
        // Format configuration
        ("⎕PP←3⋄÷3.0", "0.333", Exact),
        ("⎕PP←3⋄⎕PP←⍳0⋄÷3.0", "0.3333333333333333", Exact),
        ("⎕PP←¯16⋄255", "0xff", Exact),
        ("⎕PP←¯8⋄8", "010", Exact),
        ("⎕PP←¯3⋄2 2⍴⍳4", "[1,2;3,4]", Exact),
    ];

    for (i, (input, exp, cmp)) in cases.iter().enumerate() {
        let buf = Buf::default();
        let mut a = interpreter(buf.clone());
        for (k, line) in input.lines().enumerate() {
            if let Err(e) = a.parse_and_eval(line) {
                panic!("tc{}:{}: {input}: {e}", i + 1, k + 1);
            }
        }
        let got = buf.contents();
        let ok = match cmp {
            Cmp::Exact => test_compare(&got, exp, |a, b| a == b),
            Cmp::Floats => test_compare(&got, exp, cmp_floats),
        };
        assert!(ok, "tc{}:\nin>\n{input}\ngot>\n{got}\nexpected>\n{exp}", i + 1);
    }
}

#[test]
fn scalar_extension_commutes() {
    for (l, r) in [("2", "1 2 3"), ("1 2 3", "2"), ("1 2 3", "4 5 6")] {
        for glyph in ["+", "×", "⌈", "⌊"] {
            let b1 = Buf::default();
            interpreter(b1.clone())
                .parse_and_eval(&format!("{l}{glyph}{r}"))
                .unwrap();
            let b2 = Buf::default();
            interpreter(b2.clone())
                .parse_and_eval(&format!("{r}{glyph}{l}"))
                .unwrap();
            assert_eq!(b1.contents(), b2.contents(), "{l} {glyph} {r}");
        }
    }
}

#[test]
fn reduction_identities() {
    let cases = [("+/⍳0", "0"), ("×/⍳0", "1"), ("=/⍳0", "1")];
    for (input, exp) in cases {
        let buf = Buf::default();
        interpreter(buf.clone()).parse_and_eval(input).unwrap();
        assert_eq!(buf.contents().trim(), exp, "{input}");
    }
}

#[test]
fn error_taxonomy() {
    let cases: &[(&str, fn(&AplError) -> bool)] = &[
        ("§", |e| matches!(e, AplError::Lex(_))),
        ("(1+2", |e| matches!(e, AplError::Parse(_))),
        ("1 +", |e| matches!(e, AplError::Parse(_))),
        ("Q", |e| matches!(e, AplError::Name(_))),
        ("⎕Q←1", |e| matches!(e, AplError::Name(_))),
        ("1 2+2 3⍴⍳6", |e| matches!(e, AplError::Rank(_))),
        ("1 2+1 2 3", |e| matches!(e, AplError::Length(_))),
        ("÷0", |e| matches!(e, AplError::Domain(_))),
        ("!¯1", |e| matches!(e, AplError::Domain(_))),
        ("3⍴⍳0", |e| matches!(e, AplError::Domain(_))),
        ("1+{}2", |e| matches!(e, AplError::Domain(_))),
        ("(⍳3)[4]", |e| matches!(e, AplError::Index(_))),
        ("{⍵}/⍳0", |e| matches!(e, AplError::Domain(_))),
    ];
    for (input, check) in cases {
        let mut a = interpreter(Buf::default());
        match a.parse_and_eval(input) {
            Err(e) => assert!(check(&e), "{input}: wrong error kind: {e}"),
            Ok(()) => panic!("{input}: expected an error"),
        }
    }
}

#[test]
fn closures_do_not_outlive_scopes() {
    // The inner lambda escapes with a handle to the call scope that
    // defined L; reading through it after the call has returned fails.
    let buf = Buf::default();
    let mut a = interpreter(buf.clone());
    a.parse_and_eval("f←{L←⍵⋄{L+⍵}}2").unwrap();
    let err = a.parse_and_eval("f 1").unwrap_err();
    assert!(matches!(err, AplError::Name(_)), "{err}");
}

#[test]
fn host_bindings_between_evaluations() {
    let buf = Buf::default();
    let mut a = interpreter(buf.clone());
    a.set_var("X", aplite::value::Value::from(10i64));
    a.parse_and_eval("Y←X+1").unwrap();
    assert_eq!(a.var("Y"), Some(aplite::value::Value::from(11i64)));
}
