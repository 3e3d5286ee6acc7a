use std::{collections::HashSet, error::Error, fmt};

use crate::Ident;

/// Scan a line of source into spanned tokens
///
/// `symbols` is the host-registered symbol table: only runes present in it
/// lex as [`Token::Symbol`]. The structural runes `⋄ : ; [ ] { } ( ) ← ∇`
/// are always recognized, and a newline separates statements like `⋄`.
pub fn lex(input: &str, symbols: &HashSet<char>) -> LexResult<Vec<Sp<Token>>> {
    Lexer {
        input_chars: input.chars().collect(),
        loc: Loc::default(),
        symbols,
        tokens: Vec::new(),
    }
    .run()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedChar(char),
    UnterminatedString,
    InvalidEscape(char),
    InvalidUnicodeEscape,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedChar(c) => write!(f, "unexpected char {c:?}"),
            LexError::UnterminatedString => write!(f, "unterminated string"),
            LexError::InvalidEscape(c) => write!(f, "invalid escape character {c:?}"),
            LexError::InvalidUnicodeEscape => write!(f, "invalid \\u escape"),
        }
    }
}

impl Error for LexError {}

pub type LexResult<T = ()> = Result<T, Sp<LexError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc {
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self {
            pos: 0,
            line: 1,
            col: 1,
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Span {
    Code(CodeSpan),
    Builtin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeSpan {
    pub start: Loc,
    pub end: Loc,
}

impl fmt::Display for CodeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Code(span) => write!(f, "{span}"),
            Span::Builtin => write!(f, "<builtin>"),
        }
    }
}

impl Span {
    pub fn merge(self, end: Self) -> Self {
        match (self, end) {
            (Span::Code(a), Span::Code(b)) => Span::Code(CodeSpan {
                start: a.start.min(b.start),
                end: a.end.max(b.end),
            }),
            _ => Span::Builtin,
        }
    }
    pub const fn sp<T>(self, value: T) -> Sp<T> {
        Sp { value, span: self }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Sp<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Sp<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sp<U> {
        Sp {
            value: f(self.value),
            span: self.span,
        }
    }
    pub fn as_ref(&self) -> Sp<&T> {
        Sp {
            value: &self.value,
            span: self.span.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Sp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.span)?;
        self.value.fmt(f)
    }
}

impl<T: fmt::Display> fmt::Display for Sp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.value)
    }
}

impl<T: fmt::Display + fmt::Debug> Error for Sp<T> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A numeric lexeme, uninterpreted; the tower parses it
    Number(String),
    /// Any of the three string forms, unescaped
    Str(String),
    Ident(Ident),
    /// A rune from the host-registered symbol table
    Symbol(char),
    Simple(Simple),
}

impl Token {
    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Token::Ident(ident) => Some(ident),
            _ => None,
        }
    }
    pub fn as_number(&self) -> Option<&str> {
        match self {
            Token::Number(num) => Some(num),
            _ => None,
        }
    }
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Token::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_symbol(&self) -> Option<char> {
        match self {
            Token::Symbol(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(num) => write!(f, "{num}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Ident(ident) => write!(f, "{ident}"),
            Token::Symbol(c) => write!(f, "{c}"),
            Token::Simple(simple) => write!(f, "{simple}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simple {
    Diamond,
    Colon,
    Semicolon,
    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    Assign,
    SelfRef,
}

impl fmt::Display for Simple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Simple::Diamond => write!(f, "⋄"),
            Simple::Colon => write!(f, ":"),
            Simple::Semicolon => write!(f, ";"),
            Simple::OpenBracket => write!(f, "["),
            Simple::CloseBracket => write!(f, "]"),
            Simple::OpenCurly => write!(f, "{{"),
            Simple::CloseCurly => write!(f, "}}"),
            Simple::OpenParen => write!(f, "("),
            Simple::CloseParen => write!(f, ")"),
            Simple::Assign => write!(f, "←"),
            Simple::SelfRef => write!(f, "∇"),
        }
    }
}

impl From<Simple> for Token {
    fn from(s: Simple) -> Self {
        Self::Simple(s)
    }
}

struct Lexer<'a> {
    input_chars: Vec<char>,
    loc: Loc,
    symbols: &'a HashSet<char>,
    tokens: Vec<Sp<Token>>,
}

impl<'a> Lexer<'a> {
    fn peek_char(&self) -> Option<char> {
        self.input_chars.get(self.loc.pos).copied()
    }
    fn update_loc(&mut self, c: char) {
        match c {
            '\n' => {
                self.loc.line += 1;
                self.loc.col = 1;
            }
            '\r' => {}
            _ => self.loc.col += 1,
        }
        self.loc.pos += 1;
    }
    fn next_char_if(&mut self, f: impl Fn(char) -> bool) -> Option<char> {
        let c = *self.input_chars.get(self.loc.pos)?;
        if !f(c) {
            return None;
        }
        self.update_loc(c);
        Some(c)
    }
    fn next_char_exact(&mut self, c: char) -> bool {
        self.next_char_if(|c2| c2 == c).is_some()
    }
    fn next_char(&mut self) -> Option<char> {
        self.next_char_if(|_| true)
    }
    fn end_span(&self, start: Loc) -> Span {
        Span::Code(CodeSpan {
            start,
            end: self.loc,
        })
    }
    fn end(&mut self, token: impl Into<Token>, start: Loc) {
        self.tokens.push(Sp {
            value: token.into(),
            span: self.end_span(start),
        })
    }
    fn run(mut self) -> LexResult<Vec<Sp<Token>>> {
        use {self::Simple::*, Token::*};
        loop {
            let start = self.loc;
            let Some(c) = self.next_char() else {
                break;
            };
            match c {
                '(' => self.end(OpenParen, start),
                ')' => self.end(CloseParen, start),
                '[' => self.end(OpenBracket, start),
                ']' => self.end(CloseBracket, start),
                '{' => self.end(OpenCurly, start),
                '}' => self.end(CloseCurly, start),
                '⋄' | '\n' => self.end(Diamond, start),
                ':' => self.end(Colon, start),
                ';' => self.end(Semicolon, start),
                '←' => self.end(Assign, start),
                '∇' => self.end(SelfRef, start),
                // Comments run to the end of the line
                '⍝' => {
                    while self.next_char_if(|c| c != '\n').is_some() {}
                }
                '"' => {
                    let s = self.double_quoted(start)?;
                    self.end(Str(s), start);
                }
                '\'' => {
                    let s = self.single_quoted(start)?;
                    self.end(Str(s), start);
                }
                '`' => {
                    let s = self.backtick_string();
                    self.end(Str(s), start);
                }
                '¯' => {
                    if self
                        .peek_char()
                        .is_some_and(|c| c.is_ascii_digit() || c == '.')
                    {
                        let num = self.number(c);
                        self.end(Number(num), start);
                    } else {
                        return Err(self.end_span(start).sp(LexError::UnexpectedChar(c)));
                    }
                }
                c if c.is_ascii_digit() => {
                    let num = self.number(c);
                    self.end(Number(num), start);
                }
                '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                    let num = self.number(c);
                    self.end(Number(num), start);
                }
                '⎕' | '⍞' => {
                    let mut ident = String::from(c);
                    while let Some(c) = self.next_char_if(|c| c.is_alphanumeric() || c == '_') {
                        ident.push(c);
                    }
                    self.end(Ident(ident.into()), start);
                }
                c if is_ident_start(c) && !self.symbols.contains(&c) => {
                    let mut ident = String::from(c);
                    while let Some(c) =
                        self.next_char_if(|c| c.is_alphanumeric() || c == '_' || c == '→')
                    {
                        ident.push(c);
                    }
                    self.end(Ident(ident.into()), start);
                }
                ' ' | '\t' | '\r' => {}
                c if self.symbols.contains(&c) => self.end(Symbol(c), start),
                c => return Err(self.end_span(start).sp(LexError::UnexpectedChar(c))),
            }
        }
        Ok(self.tokens)
    }
    /// Capture a numeric lexeme without interpreting it
    ///
    /// Trailing letters are kept as a type tag for the tower, so `1J2`,
    /// `1@90` and `¯1.0E¯6a123.8` are each a single lexeme.
    fn number(&mut self, init: char) -> String {
        let mut number = String::from(init);
        while let Some(c) =
            self.next_char_if(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '¯' | '@'))
        {
            number.push(c);
        }
        number
    }
    fn double_quoted(&mut self, start: Loc) -> LexResult<String> {
        let mut string = String::new();
        loop {
            let Some(c) = self.next_char() else {
                return Err(self.end_span(start).sp(LexError::UnterminatedString));
            };
            match c {
                '"' => return Ok(string),
                '\\' => {
                    let Some(e) = self.next_char() else {
                        return Err(self.end_span(start).sp(LexError::UnterminatedString));
                    };
                    string.push(match e {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '\\' => '\\',
                        '"' => '"',
                        'u' => {
                            let mut code = 0;
                            for _ in 0..4 {
                                let d = self
                                    .next_char_if(|c| c.is_ascii_hexdigit())
                                    .and_then(|c| c.to_digit(16));
                                let Some(d) = d else {
                                    return Err(self
                                        .end_span(start)
                                        .sp(LexError::InvalidUnicodeEscape));
                                };
                                code = code * 16 + d;
                            }
                            char::from_u32(code).ok_or_else(|| {
                                self.end_span(start).sp(LexError::InvalidUnicodeEscape)
                            })?
                        }
                        e => return Err(self.end_span(start).sp(LexError::InvalidEscape(e))),
                    });
                }
                c => string.push(c),
            }
        }
    }
    /// Single quotes escape only themselves, by doubling
    fn single_quoted(&mut self, start: Loc) -> LexResult<String> {
        let mut string = String::new();
        loop {
            let Some(c) = self.next_char() else {
                return Err(self.end_span(start).sp(LexError::UnterminatedString));
            };
            if c == '\'' {
                if self.next_char_exact('\'') {
                    string.push('\'');
                } else {
                    return Ok(string);
                }
            } else {
                string.push(c);
            }
        }
    }
    /// A backtick string runs to whitespace or any of `` ` } ] ⋄ # ``
    fn backtick_string(&mut self) -> String {
        let mut string = String::new();
        while let Some(c) =
            self.next_char_if(|c| !c.is_whitespace() && !matches!(c, '`' | '}' | ']' | '⋄' | '#'))
        {
            string.push(c);
        }
        string
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> HashSet<char> {
        "+≥⍵⍺≡/?,×÷".chars().collect()
    }

    fn kinds(input: &str) -> Vec<Token> {
        lex(input, &symbols())
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    fn num(s: &str) -> Token {
        Token::Number(s.into())
    }
    fn string(s: &str) -> Token {
        Token::Str(s.into())
    }
    fn ident(s: &str) -> Token {
        Token::Ident(s.into())
    }

    #[test]
    fn scan_tokens() {
        assert_eq!(kinds(""), vec![]);
        assert_eq!(
            kinds("1⋄2"),
            vec![num("1"), Simple::Diamond.into(), num("2")]
        );
        assert_eq!(kinds(".5"), vec![num(".5")]);
        assert_eq!(kinds("1.23"), vec![num("1.23")]);
        assert_eq!(kinds("1J2"), vec![num("1J2")]);
        assert_eq!(kinds("¯1.0E¯6a123.8"), vec![num("¯1.0E¯6a123.8")]);
        assert_eq!(kinds("¯8"), vec![num("¯8")]);
        assert_eq!(kinds("`alpha`beta"), vec![string("alpha"), string("beta")]);
        assert_eq!(
            kinds("1.23 pkg→name+3"),
            vec![num("1.23"), ident("pkg→name"), Token::Symbol('+'), num("3")]
        );
        assert_eq!(
            kinds("\"a⍝b\"+8.2⍝comment"),
            vec![string("a⍝b"), Token::Symbol('+'), num("8.2")]
        );
        assert_eq!(
            kinds("+ alpha ≥3.23 \"x\\\"yz\""),
            vec![
                Token::Symbol('+'),
                ident("alpha"),
                Token::Symbol('≥'),
                num("3.23"),
                string("x\"yz"),
            ]
        );
        assert_eq!(
            kinds("⋄ ⋄1.23E¯5 4.234  0.234⍵"),
            vec![
                Simple::Diamond.into(),
                Simple::Diamond.into(),
                num("1.23E¯5"),
                num("4.234"),
                num("0.234"),
                Token::Symbol('⍵'),
            ]
        );
        assert_eq!(
            kinds("{⍵≡0: A[2;3]}"),
            vec![
                Simple::OpenCurly.into(),
                Token::Symbol('⍵'),
                Token::Symbol('≡'),
                num("0"),
                Simple::Colon.into(),
                ident("A"),
                Simple::OpenBracket.into(),
                num("2"),
                Simple::Semicolon.into(),
                num("3"),
                Simple::CloseBracket.into(),
                Simple::CloseCurly.into(),
            ]
        );
        assert_eq!(
            kinds("{⍵∇1}"),
            vec![
                Simple::OpenCurly.into(),
                Token::Symbol('⍵'),
                Simple::SelfRef.into(),
                num("1"),
                Simple::CloseCurly.into(),
            ]
        );
    }

    #[test]
    fn scan_strings() {
        let cases: &[(&str, &str)] = &[
            // Double quoted strings with backslash escapes
            ("\"alpha\"", "alpha"),
            ("\"alpha beta\"", "alpha beta"),
            ("\"alpha\\nbeta\"", "alpha\nbeta"),
            ("\"alpha\\\\beta\"", "alpha\\beta"),
            ("\"al\\\"ha\"", "al\"ha"),
            ("\"\\u263a\"", "☺"),
            // Single quoted strings, with doubled escapes
            ("'a'", "a"),
            ("'alpha'", "alpha"),
            ("'al''pha'", "al'pha"),
            ("'al''p\\nha'", "al'p\\nha"),
            // Backtick strings
            ("`alpha", "alpha"),
            ("`alpha trailing", "alpha"),
            ("`a\\l\"'", "a\\l\"'"),
        ];
        for &(input, exp) in cases {
            let tokens = lex(input, &symbols()).unwrap();
            assert_eq!(
                tokens[0].value,
                Token::Str(exp.into()),
                "scanning {input:?}"
            );
        }
        assert_eq!(
            kinds("`alpha`trailing"),
            vec![string("alpha"), string("trailing")]
        );
        assert_eq!(
            kinds("`alpha]trailing"),
            vec![
                string("alpha"),
                Simple::CloseBracket.into(),
                ident("trailing"),
            ]
        );
    }

    #[test]
    fn scan_errors() {
        assert!(lex("\"abc", &symbols()).is_err());
        assert!(lex("'abc", &symbols()).is_err());
        assert!(lex("\"\\q\"", &symbols()).is_err());
        assert!(lex("§", &symbols()).is_err());
    }
}
