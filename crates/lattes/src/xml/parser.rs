//! XML reader that builds the generic tree directly
//!
//! The root start tag is read on its own ([`Parser::root`]) so callers can
//! validate it before paying for the body ([`Parser::body`]).

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::value::{Object, Value, TEXT_KEY};
use crate::xml::cursor::Cursor;

/// A start tag as written in the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartTag {
    /// Qualified name, original case
    pub name: String,
    /// Attributes in source order, original case
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
    pub pos: Pos,
}

impl StartTag {
    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Attribute value by exact local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_name(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// New tree node seeded with the lowercased attributes
    pub fn to_object(&self) -> Result<Object> {
        let mut node = Object::new();
        for (key, value) in &self.attributes {
            let key = tree_key(key);
            if node.insert(key.clone(), value.as_str()).is_some() {
                return Err(Error::malformed(
                    self.pos,
                    format!("duplicate attribute {key} on {}", self.name),
                ));
            }
        }
        Ok(node)
    }
}

/// Nesting never goes deeper than this, whatever the configuration says
pub const DEPTH_CEILING: u16 = 512;

/// Parser configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth; 0 means [`DEPTH_CEILING`]
    pub max_depth: u16,
}

impl Config {
    /// Depth actually enforced
    pub fn depth_limit(&self) -> u16 {
        match self.max_depth {
            0 => DEPTH_CEILING,
            depth => depth.min(DEPTH_CEILING),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_config(input, Config::default())
    }

    pub fn with_config(input: &'a str, config: Config) -> Self {
        Self {
            cursor: Cursor::new(input.as_bytes()),
            config,
        }
    }

    /// Skip the prolog and read the first start tag
    pub fn root(&mut self) -> Result<StartTag> {
        loop {
            if self.cursor.is_eof() {
                return Err(self.error_here("no root element"));
            }
            if self.cursor.starts_with(b"<?") {
                self.skip_markup(b"?>")?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_markup(b"-->")?;
            } else if self.cursor.starts_with(b"<!") {
                self.skip_doctype()?;
            } else if self.cursor.starts_with(b"</") {
                return Err(self.error_here("closing tag before root element"));
            } else if self.cursor.current() == Some(b'<') {
                return self.start_tag();
            } else {
                // stray text before the root carries no structure
                self.cursor.advance();
            }
        }
    }

    /// Read the content of `tag` into `node` up to its end tag
    pub fn body(&mut self, tag: &StartTag, node: &mut Object) -> Result<()> {
        if tag.self_closing {
            return Ok(());
        }
        self.content(&tag.name, node, 1)
    }

    fn content(&mut self, open: &str, node: &mut Object, depth: u16) -> Result<()> {
        let limit = self.config.depth_limit();
        if depth > limit {
            return Err(self.error_here(&format!("max depth exceeded: {limit}")));
        }

        let mut text: Vec<String> = Vec::new();
        loop {
            if self.cursor.is_eof() {
                return Err(self.error_here(&format!("unterminated element {open}")));
            }

            if self.cursor.starts_with(b"</") {
                self.cursor.advance_by(2);
                let close = self.name()?;
                if close != open {
                    return Err(self.error_here(&format!(
                        "mismatched closing tag {close}, expected {open}"
                    )));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<!--") {
                self.skip_markup(b"-->")?;
            } else if self.cursor.starts_with(b"<![CDATA[") {
                self.cursor.advance_by(9);
                let raw = self.until(b"]]>")?;
                push_text(&mut text, raw);
            } else if self.cursor.starts_with(b"<?") {
                self.skip_markup(b"?>")?;
            } else if self.cursor.current() == Some(b'<') {
                let tag = self.start_tag()?;
                let mut child = tag.to_object()?;
                if !tag.self_closing {
                    self.content(&tag.name, &mut child, depth.saturating_add(1))?;
                }
                attach(node, &tag, child)?;
            } else {
                let raw = self.text()?;
                push_text(&mut text, &raw);
            }
        }

        if !text.is_empty() {
            node.insert(TEXT_KEY, text.join(" "));
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        let pos = self.cursor.position();
        self.expect_byte(b'<')?;
        let name = self.name()?;

        let mut attributes = Vec::new();
        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') => {
                    self.cursor.advance();
                    self.expect_byte(b'>')?;
                    return Ok(StartTag {
                        name,
                        attributes,
                        self_closing: true,
                        pos,
                    });
                }
                Some(b'>') => {
                    self.cursor.advance();
                    return Ok(StartTag {
                        name,
                        attributes,
                        self_closing: false,
                        pos,
                    });
                }
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input in tag")),
            }

            let key = self.name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.attribute_value()?;
            attributes.push((key, value));
        }
    }

    fn attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                return decode_entities(self.utf8(raw)?, self.cursor.position());
            }
            if b == b'<' {
                return Err(self.error_here("'<' in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    fn text(&mut self) -> Result<String> {
        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }
        decode_entities(self.utf8(self.cursor.slice_from(start))?, pos)
    }

    fn name(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        match self.cursor.current() {
            Some(b) if is_name_start(b) => self.cursor.advance(),
            _ => return Err(self.error_here("expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if !is_name_char(b) {
                break;
            }
            self.cursor.advance();
        }
        self.utf8(self.cursor.slice_from(start)).map(str::to_string)
    }

    fn until(&mut self, terminator: &[u8]) -> Result<&'a str> {
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(terminator) {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(terminator.len());
                return self.utf8(raw);
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn skip_markup(&mut self, terminator: &[u8]) -> Result<()> {
        let pos = self.cursor.position();
        if self.cursor.skip_past(terminator) {
            Ok(())
        } else {
            Err(Error::malformed(pos, "unterminated markup"))
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let pos = self.cursor.position();
        let mut brackets = 0usize;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'>' if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(Error::malformed(pos, "unterminated declaration"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.current() == Some(expected) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected '{}'", char::from(expected))))
        }
    }

    fn utf8(&self, raw: &'a [u8]) -> Result<&'a str> {
        std::str::from_utf8(raw).map_err(|_| self.error_here("invalid utf-8"))
    }

    fn error_here(&self, message: &str) -> Error {
        Error::malformed(self.cursor.position(), message)
    }
}

/// Attach a finished child element under its lowercased local name
fn attach(node: &mut Object, tag: &StartTag, child: Object) -> Result<()> {
    let key = tree_key(&tag.name);
    // elements are always objects or arrays, so a string here is an attribute
    if matches!(node.get(&key), Some(Value::String(_))) {
        return Err(Error::new(
            ErrorKind::NameCollision { name: key },
            Span::at(tag.pos),
        ));
    }
    node.append(key, child);
    Ok(())
}

fn push_text(runs: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        runs.push(trimmed.to_string());
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Key used in the tree for an XML name
pub fn tree_key(name: &str) -> String {
    local_name(name).to_lowercase()
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str, pos: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (head, tail) = rest.split_at(amp);
        result.push_str(head);

        let Some(end) = tail.find(';') else {
            return Err(Error::malformed(pos, "unterminated entity reference"));
        };
        let entity = tail.get(1..end).unwrap_or_default();
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };
        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::malformed(
                    pos,
                    format!("unknown entity &{entity};"),
                ))
            }
        }
        rest = tail.get(end + 1..).unwrap_or_default();
    }
    result.push_str(rest);
    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
