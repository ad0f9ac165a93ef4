//! Recursive-descent parser for the OpenStep property-list dialect.
//!
//! Grammar as Xcode emits it:
//!
//! ```text
//! document := header? value
//! value    := dict | array | string
//! dict     := '{' (string '=' value ';')* '}'
//! array    := '(' (value ',')* value? ')'
//! string   := bare | '"' escaped* '"'
//! ```
//!
//! Comments: `// ...` to end of line (the UTF-8 header) and `/* ... */`.
//! A block comment on the same line directly after a string token is kept as
//! that string's annotation; all other comments are skipped.

use crate::value::{PbxDict, PbxString, PbxValue};
use crate::PbxError;

pub(crate) fn parse(text: &str) -> Result<PbxValue, PbxError> {
    let mut p = Parser::new(text);
    p.skip_trivia();
    let root = p.parse_value()?;
    p.skip_trivia();
    if !p.at_end() {
        return Err(p.error("trailing content after root value"));
    }
    Ok(root)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> PbxError {
        PbxError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    /// Skip whitespace and comments. Comments are only recognized here, at a
    /// token boundary, so bare strings containing `/` (paths, `/bin/sh`) are
    /// never split.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    // Standalone block comment (section markers and the like).
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while !self.at_end() {
            if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    fn parse_value(&mut self) -> Result<PbxValue, PbxError> {
        match self.peek() {
            Some(b'{') => self.parse_dict().map(PbxValue::Dict),
            Some(b'(') => self.parse_array().map(PbxValue::Array),
            Some(_) => self.parse_string().map(PbxValue::String),
            None => Err(self.error("unexpected end of input, expected a value")),
        }
    }

    fn parse_dict(&mut self) -> Result<PbxDict, PbxError> {
        self.expect(b'{')?;
        let mut dict = PbxDict::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    return Ok(dict);
                }
                Some(_) => {
                    let key = self.parse_string()?;
                    self.skip_trivia();
                    self.expect(b'=')?;
                    self.skip_trivia();
                    let value = self.parse_value()?;
                    self.skip_trivia();
                    self.expect(b';')?;
                    dict.push_parsed(key, value);
                }
                None => return Err(self.error("unexpected end of input inside dictionary")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Vec<PbxValue>, PbxError> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b')') => {
                    self.bump();
                    return Ok(items);
                }
                Some(_) => {
                    items.push(self.parse_value()?);
                    self.skip_trivia();
                    match self.peek() {
                        Some(b',') => {
                            self.bump();
                        }
                        Some(b')') => {}
                        _ => return Err(self.error("expected ',' or ')' in array")),
                    }
                }
                None => return Err(self.error("unexpected end of input inside array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<PbxString, PbxError> {
        let value = match self.peek() {
            Some(b'"') => self.parse_quoted()?,
            Some(_) => self.parse_bare()?,
            None => return Err(self.error("unexpected end of input, expected a string")),
        };
        let annotation = self.try_annotation();
        Ok(PbxString { value, annotation })
    }

    fn parse_quoted(&mut self) -> Result<String, PbxError> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(other) => {
                        // Unknown escape: keep the character as-is.
                        out.push(other as char);
                    }
                    None => return Err(self.error("unterminated escape in quoted string")),
                },
                Some(b) => {
                    // Multi-byte UTF-8 sequences pass through byte by byte;
                    // re-assemble via the source slice to stay valid UTF-8.
                    if b < 0x80 {
                        out.push(b as char);
                    } else {
                        let start = self.pos - 1;
                        let mut end = self.pos;
                        while end < self.bytes.len() && (self.bytes[end] & 0xC0) == 0x80 {
                            end += 1;
                        }
                        let s = std::str::from_utf8(&self.bytes[start..end])
                            .map_err(|_| self.error("invalid UTF-8 in quoted string"))?;
                        out.push_str(s);
                        self.pos = end;
                    }
                }
                None => return Err(self.error("unterminated quoted string")),
            }
        }
    }

    fn parse_bare(&mut self) -> Result<String, PbxError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'(' | b')' | b'=' | b';' | b',' | b'"')
            {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a string token"));
        }
        let s = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in bare string"))?;
        Ok(s.to_string())
    }

    /// Capture a `/* ... */` on the same line directly after a token.
    fn try_annotation(&mut self) -> Option<String> {
        let mut lookahead = self.pos;
        while let Some(&b) = self.bytes.get(lookahead) {
            if b == b' ' || b == b'\t' {
                lookahead += 1;
            } else {
                break;
            }
        }
        if self.bytes.get(lookahead) != Some(&b'/') || self.bytes.get(lookahead + 1) != Some(&b'*') {
            return None;
        }
        self.pos = lookahead + 2;
        let start = self.pos;
        while !self.at_end() {
            if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                let text = std::str::from_utf8(&self.bytes[start..self.pos])
                    .ok()?
                    .trim()
                    .to_string();
                self.bump();
                self.bump();
                return Some(text);
            }
            self.bump();
        }
        None
    }

    fn expect(&mut self, b: u8) -> Result<(), PbxError> {
        if self.peek() == Some(b) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {:?}",
                b as char,
                self.peek().map(|c| c as char)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annotated_entries() {
        let doc = parse("{ rootObject = ABC123 /* Project object */; }").unwrap();
        let dict = doc.as_dict().unwrap();
        let root = dict.get("rootObject").unwrap().as_pbx_string().unwrap();
        assert_eq!(root.value, "ABC123");
        assert_eq!(root.annotation.as_deref(), Some("Project object"));
    }

    #[test]
    fn bare_strings_keep_slashes() {
        let doc = parse("{ shellPath = /bin/sh; path = usr/lib; }").unwrap();
        let dict = doc.as_dict().unwrap();
        assert_eq!(dict.get("shellPath").unwrap().as_str(), Some("/bin/sh"));
        assert_eq!(dict.get("path").unwrap().as_str(), Some("usr/lib"));
    }

    #[test]
    fn skips_section_comments() {
        let doc = parse(
            "{\n/* Begin PBXBuildFile section */\nA1 = { isa = PBXBuildFile; };\n/* End PBXBuildFile section */\n}",
        )
        .unwrap();
        let dict = doc.as_dict().unwrap();
        assert!(dict.contains_key("A1"));
    }

    #[test]
    fn quoted_escapes_round_trip() {
        let doc = parse(r#"{ script = "line one\nline \"two\"\t\\end"; }"#).unwrap();
        let dict = doc.as_dict().unwrap();
        assert_eq!(
            dict.get("script").unwrap().as_str(),
            Some("line one\nline \"two\"\t\\end")
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("{ } extra").is_err());
    }
}
