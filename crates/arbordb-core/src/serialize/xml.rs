//! Hand-rolled XML codec for the node tree.
//!
//! This is not a general XML parser. It reads and writes exactly the
//! subset the mapper emits (elements, attributes, character data) plus
//! enough tolerance for externally edited files: an XML declaration,
//! comments, CDATA sections, and numeric character references are
//! accepted on read. Doctypes, processing instructions, and namespaces
//! are not.
//!
//! Formatting rule: element-only nodes are pretty-printed; a node with
//! direct text is written compactly so its text survives byte-for-byte.
//! Whitespace-only character data is treated as formatting and dropped on
//! read, so text consisting solely of whitespace does not round-trip.

use crate::{
    node::Node,
    serialize::{SerializeError, Serializer},
};
use std::fmt::Write;

/// Maximum element nesting accepted on read.
const MAX_XML_DEPTH: usize = 128;

const INDENT: &str = "  ";

///
/// XmlSerializer
///

#[derive(Clone, Copy, Debug, Default)]
pub struct XmlSerializer;

impl XmlSerializer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer for XmlSerializer {
    fn serialize(&self, root: &Node) -> Result<String, SerializeError> {
        let mut out = String::new();
        write_node(&mut out, root, 0, false)?;

        Ok(out)
    }

    fn deserialize(&self, text: &str) -> Result<Node, SerializeError> {
        Reader::new(text).read_document()
    }
}

// ==========================================================================
// Writer
// ==========================================================================

fn write_node(
    out: &mut String,
    node: &Node,
    indent: usize,
    compact: bool,
) -> Result<(), SerializeError> {
    if !is_valid_name(node.name()) {
        return Err(SerializeError::Serialize(format!(
            "invalid element name '{}'",
            node.name()
        )));
    }

    if !compact && indent > 0 {
        out.push('\n');
        for _ in 0..indent {
            out.push_str(INDENT);
        }
    }

    out.push('<');
    out.push_str(node.name());

    for attribute in node.attributes() {
        if !is_valid_name(&attribute.name) {
            return Err(SerializeError::Serialize(format!(
                "invalid attribute name '{}'",
                attribute.name
            )));
        }

        let _ = write!(out, " {}=\"{}\"", attribute.name, escape_attr(&attribute.value));
    }

    if node.text().is_none() && !node.has_children() {
        out.push_str(" />");
        return Ok(());
    }

    out.push('>');

    // a node with direct text is rendered compactly so the text is not
    // polluted by formatting whitespace
    let compact = compact || node.text().is_some();

    if let Some(text) = node.text() {
        out.push_str(&escape_text(text));
    }

    for child in node.children() {
        write_node(out, child, indent + 1, compact)?;
    }

    if !compact && node.has_children() {
        out.push('\n');
        for _ in 0..indent {
            out.push_str(INDENT);
        }
    }

    out.push_str("</");
    out.push_str(node.name());
    out.push('>');

    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }

    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }

    out
}

// ==========================================================================
// Reader
// ==========================================================================

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn read_document(mut self) -> Result<Node, SerializeError> {
        self.skip_prolog()?;
        let root = self.read_element(0)?;
        self.skip_misc()?;

        if self.pos < self.input.len() {
            return Err(self.err("trailing content after the root element"));
        }

        Ok(root)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn err(&self, message: &str) -> SerializeError {
        SerializeError::Deserialize(format!("{message} (at byte {})", self.pos))
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Skip past `token`, erroring when it never occurs.
    fn skip_until(&mut self, token: &str, what: &str) -> Result<(), SerializeError> {
        match self.rest().find(token) {
            Some(offset) => {
                self.pos += offset + token.len();
                Ok(())
            }
            None => Err(self.err(what)),
        }
    }

    fn skip_prolog(&mut self) -> Result<(), SerializeError> {
        // byte-order mark from external editors
        self.eat("\u{feff}");
        self.skip_whitespace();

        if self.eat("<?xml") {
            self.skip_until("?>", "unterminated xml declaration")?;
        }

        self.skip_misc()
    }

    /// Skip whitespace and comments between markup.
    fn skip_misc(&mut self) -> Result<(), SerializeError> {
        loop {
            self.skip_whitespace();
            if self.eat("<!--") {
                self.skip_until("-->", "unterminated comment")?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> Result<&'a str, SerializeError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(rest.len());

        if end == 0 {
            return Err(self.err("expected a name"));
        }

        self.pos += end;

        Ok(&rest[..end])
    }

    fn read_element(&mut self, depth: usize) -> Result<Node, SerializeError> {
        if depth >= MAX_XML_DEPTH {
            return Err(self.err("element nesting too deep"));
        }

        if !self.eat("<") {
            return Err(self.err("expected an element"));
        }

        let name = self.read_name()?;
        let mut node = Node::new(name);

        // attributes
        loop {
            self.skip_whitespace();

            if self.eat("/>") {
                return Ok(node);
            }
            if self.eat(">") {
                break;
            }

            let attr_name = self.read_name()?;
            self.skip_whitespace();
            if !self.eat("=") {
                return Err(self.err("expected '=' after attribute name"));
            }
            self.skip_whitespace();

            let quote = if self.eat("\"") {
                '"'
            } else if self.eat("'") {
                '\''
            } else {
                return Err(self.err("expected a quoted attribute value"));
            };

            let rest = self.rest();
            let end = rest
                .find(quote)
                .ok_or_else(|| self.err("unterminated attribute value"))?;
            let value = unescape(&rest[..end]).map_err(|message| self.err(&message))?;
            self.pos += end + 1;

            node.set_attribute(attr_name, value);
        }

        // content
        let mut text = String::new();
        loop {
            if self.pos >= self.input.len() {
                return Err(self.err("unexpected end of input inside an element"));
            }

            if self.eat("</") {
                let close = self.read_name()?;
                if close != name {
                    return Err(self.err(&format!("mismatched close tag '</{close}>'")));
                }
                self.skip_whitespace();
                if !self.eat(">") {
                    return Err(self.err("expected '>' after close tag name"));
                }
                break;
            }

            if self.eat("<!--") {
                self.skip_until("-->", "unterminated comment")?;
                continue;
            }

            if self.eat("<![CDATA[") {
                let rest = self.rest();
                let end = rest
                    .find("]]>")
                    .ok_or_else(|| self.err("unterminated CDATA section"))?;
                text.push_str(&rest[..end]);
                self.pos += end + 3;
                continue;
            }

            if self.rest().starts_with('<') {
                let child = self.read_element(depth + 1)?;
                node.push_child(child);
                continue;
            }

            let rest = self.rest();
            let end = rest.find('<').unwrap_or(rest.len());
            let segment = &rest[..end];
            self.pos += end;

            // whitespace-only segments are formatting, not content
            if !segment.trim().is_empty() {
                let unescaped = unescape(segment).map_err(|message| self.err(&message))?;
                text.push_str(&unescaped);
            }
        }

        if !text.is_empty() {
            node.set_text(text);
        }

        Ok(node)
    }
}

/// Resolve the named and numeric character references the writer (or an
/// external editor) can produce.
fn unescape(text: &str) -> Result<String, String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let end = rest
            .find(';')
            .ok_or_else(|| "unterminated entity reference".to_string())?;
        let entity = &rest[1..end];

        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse))
                    .ok_or_else(|| format!("unknown entity '&{entity};'"))?
                    .map_err(|_| format!("invalid character reference '&{entity};'"))?;

                out.push(
                    char::from_u32(code)
                        .ok_or_else(|| format!("invalid character reference '&{entity};'"))?,
                );
            }
        }

        rest = &rest[end + 1..];
    }

    out.push_str(rest);

    Ok(out)
}

///
/// TESTS
///
