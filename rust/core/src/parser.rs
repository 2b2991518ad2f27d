// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization of entity records and a string-aware entity scanner.

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::schema::IfcType;

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text' (raw, escapes not yet decoded)
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .T., .F., .U., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCLABEL('101'), IFCBOOLEAN(.T.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Body of a single-quoted string, stopping at the closing quote.
/// A doubled quote ('') stays part of the body.
fn string_body(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;

    while let Some(offset) = memchr::memchr(b'\'', &bytes[i..]) {
        let quote = i + offset;
        if bytes.get(quote + 1) == Some(&b'\'') {
            i = quote + 2;
            continue;
        }
        return Ok((&input[quote..], &input[..quote]));
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse string literal: 'text'
fn string_literal(input: &str) -> IResult<&str, Token> {
    map(delimited(char('\''), string_body, char('\'')), Token::String)(input)
}

/// Parse integer: 42, -42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        lexical_core::parse::<i64>(s.as_bytes()).map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0.
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| lexical_core::parse::<f64>(s.as_bytes()).map(Token::Float),
    )(input)
}

/// Parse enum: .T., .F., .U., .INTERNAL.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

/// Parse null: $
fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

/// Parse derived: *
fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

/// Parse typed value: IFCLABEL('x'), IFCAREAMEASURE(14.004)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            delimited(
                char('('),
                separated_list0(delimited(ws, char(','), ws), token),
                char(')'),
            ),
        ),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

/// Skip whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // float before integer: both start with digits
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('('),
            separated_list0(delimited(ws, char(','), ws), token),
            char(')'),
        ),
        Token::List,
    )(input)
}

/// Parse a complete entity record
/// Example: #123=IFCSPACE('guid',#2,'101',$,$,$,$,$,.ELEMENT.,.INTERNAL.,$);
pub fn parse_entity(input: &str) -> Result<(u32, IfcType, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(
            char('='),
            delimited(
                ws,
                take_while1(|c: char| c.is_alphanumeric() || c == '_'),
                ws,
            ),
        ),
        delimited(
            char('('),
            separated_list0(delimited(ws, char(','), ws), token),
            tuple((char(')'), ws, char(';'))),
        ),
    ))(input);

    match result {
        Ok((_, (id, type_str, args))) => {
            let ifc_type = IfcType::from_str(type_str)
                .ok_or_else(|| Error::InvalidIfcType(type_str.to_string()))?;
            Ok((id, ifc_type, args))
        }
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Decode the escape sequences of a raw STEP string.
///
/// Handles `''`, `\\`, `\S\`, `\X\hh`, `\X2\…\X0\` (UTF-16) and
/// `\X4\…\X0\` (UTF-32). Code page switches (`\PA\`) are dropped.
pub fn decode_step_string(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') && !raw.contains("''") {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("''") {
            out.push('\'');
            rest = tail;
            continue;
        }
        if let Some(tail) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = tail;
            continue;
        }
        if let Some(tail) = rest.strip_prefix("\\X2\\") {
            rest = decode_hex_run(tail, 4, &mut out);
            continue;
        }
        if let Some(tail) = rest.strip_prefix("\\X4\\") {
            rest = decode_hex_run(tail, 8, &mut out);
            continue;
        }
        if let Some(tail) = rest.strip_prefix("\\X\\") {
            if let Some(byte) = tail.get(..2).and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(char::from(byte));
                rest = &tail[2..];
                continue;
            }
        }
        if let Some(tail) = rest.strip_prefix("\\S\\") {
            if let Some(c) = tail.chars().next().filter(char::is_ascii) {
                out.push(char::from(c as u8 + 128));
                rest = &tail[1..];
                continue;
            }
        }
        if rest.starts_with("\\P") && rest.as_bytes().get(3) == Some(&b'\\') {
            rest = &rest[4..];
            continue;
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    Cow::Owned(out)
}

/// Decode hex code units up to the `\X0\` terminator, return the remainder.
fn decode_hex_run<'a>(input: &'a str, width: usize, out: &mut String) -> &'a str {
    let (hex, rest) = match input.find("\\X0\\") {
        Some(end) => (&input[..end], &input[end + 4..]),
        None => (input, ""),
    };

    let units = hex
        .as_bytes()
        .chunks(width)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|chunk| u32::from_str_radix(chunk, 16).ok());

    if width == 4 {
        let utf16: Vec<u16> = units.map(|u| u as u16).collect();
        out.extend(char::decode_utf16(utf16).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
    } else {
        out.extend(units.map(|u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER)));
    }

    rest
}

/// Find the byte just past the `;` that ends the record starting at `start`.
/// Semicolons inside string literals are skipped.
pub(crate) fn find_record_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    loop {
        let offset = memchr::memchr2(b'\'', b';', &bytes[pos..])?;
        let hit = pos + offset;
        if bytes[hit] == b';' {
            return Some(hit + 1);
        }
        // Inside a string: the next quote closes it ('' reopens immediately)
        let close = memchr::memchr(b'\'', &bytes[hit + 1..])?;
        pos = hit + 1 + close + 1;
    }
}

/// Byte offset of the DATA section, or 0 when the file has none.
pub(crate) fn data_section_start(content: &str) -> usize {
    memchr::memmem::find(content.as_bytes(), b"DATA;")
        .map(|pos| pos + 5)
        .unwrap_or(0)
}

/// Read the schema identifier from the header: FILE_SCHEMA(('IFC4'));
pub fn parse_file_schema(content: &str) -> Option<String> {
    let header = match data_section_start(content) {
        0 => content,
        end => &content[..end],
    };
    let start = memchr::memmem::find(header.as_bytes(), b"FILE_SCHEMA")?;
    let after = &header[start..];
    let open = after.find('\'')?;
    let close = after[open + 1..].find('\'')?;
    Some(after[open + 1..open + 1 + close].trim().to_string())
}

/// Fast entity scanner - scans file without full parsing
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner positioned at the DATA section
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: data_section_start(content),
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, record_start, record_end)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        loop {
            let hash = self.position + memchr::memchr(b'#', &bytes[self.position..])?;

            let id_start = hash + 1;
            let mut id_end = id_start;
            while id_end < bytes.len() && bytes[id_end].is_ascii_digit() {
                id_end += 1;
            }

            let mut eq = id_end;
            while eq < bytes.len() && bytes[eq].is_ascii_whitespace() {
                eq += 1;
            }

            if id_end == id_start || bytes.get(eq) != Some(&b'=') {
                // Not a record start (e.g. a reference inside a broken record)
                self.position = id_start;
                continue;
            }

            let record_end = find_record_end(bytes, eq)?;
            self.position = record_end;

            let id = match self.content[id_start..id_end].parse::<u32>() {
                Ok(id) => id,
                Err(_) => continue,
            };

            let type_start = match self.content[eq + 1..record_end].find(|c: char| !c.is_whitespace()) {
                Some(i) => eq + 1 + i,
                None => continue,
            };
            let type_end = self.content[type_start..record_end]
                .find(|c: char| c == '(' || c.is_whitespace())
                .map(|i| type_start + i)
                .unwrap_or(record_end);

            return Some((id, &self.content[type_start..type_end], hash, record_end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
        assert_eq!(entity_ref("#0"), Ok(("", Token::EntityRef(0))));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("'hello'"), Ok(("", Token::String("hello"))));
        assert_eq!(string_literal("'it''s'"), Ok(("", Token::String("it''s"))));
        assert_eq!(string_literal("'a;b'"), Ok(("", Token::String("a;b"))));
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer("42"), Ok(("", Token::Integer(42))));
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
    }

    #[test]
    fn test_float() {
        assert_eq!(float("3.5"), Ok(("", Token::Float(3.5))));
        assert_eq!(float("-2.25"), Ok(("", Token::Float(-2.25))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.5E-10"), Ok(("", Token::Float(1.5e-10))));
    }

    #[test]
    fn test_enum() {
        assert_eq!(enum_value(".T."), Ok(("", Token::Enum("T"))));
        assert_eq!(enum_value(".INTERNAL."), Ok(("", Token::Enum("INTERNAL"))));
    }

    #[test]
    fn test_typed_value() {
        let (_, token) = typed_value("IFCLABEL('Buero')").unwrap();
        assert_eq!(
            token,
            Token::TypedValue("IFCLABEL", vec![Token::String("Buero")])
        );
    }

    #[test]
    fn test_nested_list() {
        let (_, token) = list("(1,(2,3),4)").unwrap();
        match token {
            Token::List(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1], Token::List(vec![Token::Integer(2), Token::Integer(3)]));
            }
            _ => panic!("Expected List token"),
        }
    }

    #[test]
    fn test_parse_entity() {
        let input = "#30=IFCPROPERTYSINGLEVALUE('Width',$,IFCLENGTHMEASURE(3.5),$);";
        let (id, ifc_type, args) = parse_entity(input).unwrap();
        assert_eq!(id, 30);
        assert_eq!(ifc_type, IfcType::IfcPropertySingleValue);
        assert_eq!(args.len(), 4);
        assert_eq!(
            args[2],
            Token::TypedValue("IFCLENGTHMEASURE", vec![Token::Float(3.5)])
        );
    }

    #[test]
    fn test_decode_step_string() {
        assert_eq!(decode_step_string("plain"), "plain");
        assert_eq!(decode_step_string("it''s"), "it's");
        assert_eq!(decode_step_string("H\\X2\\00F6\\X0\\he"), "Höhe");
        assert_eq!(decode_step_string("Fl\\X\\E4che"), "Fläche");
        assert_eq!(decode_step_string("\\S\\d"), "ä");
        assert_eq!(decode_step_string("m\\X4\\000000B2\\X0\\"), "m²");
    }

    #[test]
    fn test_parse_file_schema() {
        let content = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n#1=IFCSPACE('a',$,'1',$,$,$,$,$,$,$,$);\nENDSEC;";
        assert_eq!(parse_file_schema(content).as_deref(), Some("IFC2X3"));
    }

    #[test]
    fn test_entity_scanner() {
        let content = r#"ISO-10303-21;
HEADER;
FILE_NAME('C:\\#model.ifc',$,$,$,$,$,$);
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,'A;B',$,$,$,$,$,$);
#2=IFCSPACE('guid2',$,'101',$,$,$,$,$,$,$,$);
#3 = IFCSPACE('guid3',$,'#4',$,$,$,$,$,$,$,$);
ENDSEC;
"#;

        let mut scanner = EntityScanner::new(content);

        let (id, type_name, _, _) = scanner.next_entity().unwrap();
        assert_eq!(id, 1);
        assert_eq!(type_name, "IFCPROJECT");

        let mut spaces = Vec::new();
        while let Some((id, type_name, start, end)) = scanner.next_entity() {
            assert!(content[start..end].ends_with(';'));
            if type_name == "IFCSPACE" {
                spaces.push(id);
            }
        }
        assert_eq!(spaces, vec![2, 3]);
    }
}
