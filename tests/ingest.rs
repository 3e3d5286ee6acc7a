use std::{cell::RefCell, io::Cursor, io::Write, rc::Rc};

use aplite::{io as apl_io, num::Tower, primitive, Aplite};

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

#[test]
fn line_delimited_ingestion() {
    let cases: &[(&str, &str, &str)] = &[
        ("", "1+1", "2\n"), // warming up
        ("7 8", "C←io→r 0 ⋄  {⍵}¨C", "((7;0;);(8;0;);)\n"),
        ("7 8\n9", "C←io→r 0 ⋄  {⍵}¨C", "((7;0;);(8;1;);(9;1;);)\n"),
        ("7 8", "C←io→r 1 ⋄  {⍵}¨C", "((7 8;0;);)\n"),
        ("3 4\n5 6", "C←io→r 1 ⋄  {⍵}¨C", "((3 4;0;);(5 6;0;);)\n"),
        ("3\n4\n5", "C←io→r 1 ⋄  {⍵}¨C", "((3;0;);(4;0;);(5;0;);)\n"),
        (
            "3 4\n5 6\n\n7 8",
            "C←io→r 1 ⋄  {⍵}¨C",
            "((3 4;0;);(5 6;1;);(7 8;1;);)\n",
        ),
        ("7", "C←io→r 1 ⋄  {⍵}¨C", "((7;0;);)\n"),
        ("7", "C←io→r 1 ⋄  {⍴⍵[1]}¨C", "(1;)\n"), // make sure it's rank 1
        ("3 4\n5 6", "C←io→r 2 ⋄  {⍵}¨C", "(( 3 4\n 5 6;0;);)\n"),
        (
            "3 4\n5 6\n\n1 2\n3 4",
            "C←io→r 2 ⋄  {⍵}¨C",
            "(( 3 4\n 5 6;0;);( 1 2\n 3 4;0;);)\n",
        ),
    ];

    for (i, (data, prog, exp)) in cases.iter().enumerate() {
        let buf = Buf::default();
        let mut a = Aplite::new(buf.clone());
        a.register_tower(Tower::default());
        primitive::register_primitives(&mut a);
        primitive::register_operators(&mut a);
        apl_io::register_ingest(&mut a);
        a.set_stdin(Cursor::new(data.to_string().into_bytes()));

        if let Err(e) = a.parse_and_eval(prog) {
            panic!("tc{i}: {e}");
        }
        let got = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert_eq!(&got, exp, "tc{i}: exp {exp:?}, got {got:?}");
    }
}

#[test]
fn ingestion_needs_a_reader() {
    let mut a = Aplite::new(std::io::sink());
    a.register_tower(Tower::default());
    primitive::register_primitives(&mut a);
    primitive::register_operators(&mut a);
    apl_io::register_ingest(&mut a);
    assert!(a.parse_and_eval("io→r 0").is_err());
}
