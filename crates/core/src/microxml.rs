//! C8: a validator-parser for the restricted, well-formed inline-markup
//! language translator-supplied strings are allowed to use (§4.8). Three
//! modes share one grammar (tags, attributes, character references) and
//! differ only in tag-name allowlisting and case sensitivity.
//!
//! Token-level pieces (names, quoted attribute values, numeric character
//! references) are scanned with `nom`; the recursive tag/nesting structure
//! is plain recursive descent, since the state machine needs to thread a
//! nesting-depth counter and an expected-closing-tag name that nom's
//! declarative combinators do not carry naturally.

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::{char, one_of},
    combinator::opt,
};
use thiserror::Error;

use itstool_dom::{Document, NodeId, OwnedQName};

/// Nesting depth at which the parser gives up (§4.8's "no-nesting depth
/// limit of 100").
pub const MAX_DEPTH: usize = 100;

pub const XHTML_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "b", "bdo", "big", "blockquote", "br", "cite", "code", "dd", "del", "dfn",
    "dl", "dt", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "ins", "kbd", "li", "ol", "p", "pre", "q",
    "samp", "small", "span", "strong", "sub", "sup", "tt", "ul", "var",
];

pub const HTML_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "b", "bdi", "bdo", "big", "blockquote", "br", "cite", "code", "dd", "del",
    "dfn", "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "ins", "kbd",
    "li", "mark", "menu", "ol", "p", "pre", "q", "rp", "rt", "ruby", "s", "samp", "small", "span", "strong", "sub",
    "sup", "tt", "u", "ul", "var", "wbr",
];

const VOID_HTML_TAGS: &[&str] = &["br", "hr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Any well-formed tag name is accepted.
    SimpleXml,
    /// Tag names restricted to `XHTML_TAGS`, case-sensitive.
    SimpleXhtml,
    /// Tag names restricted to `HTML_TAGS`, case-insensitive; `br`/`hr` are void.
    SimpleHtml,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MicroXmlError {
    #[error("markup nests more than {MAX_DEPTH} levels deep")]
    NestingTooDeep,
    #[error("</{0}> has no matching open tag")]
    UnmatchedCloser(String),
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("unterminated attribute")]
    UnterminatedAttribute,
    #[error("<{expected}> closed by </{found}>")]
    MismatchedCloseTag { expected: String, found: String },
    #[error("'{0}' is not in the allowed tag set for this mode")]
    TagNotAllowed(String),
}

/// One node of the parsed fragment: either a run of text (entities already
/// decoded) or an element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicroNode {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MicroNode>,
    },
}

/// Parses `input` as a sequence of sibling nodes under `mode`'s rules.
pub fn parse(input: &str, mode: Mode) -> Result<Vec<MicroNode>, MicroXmlError> {
    let mut cursor = Cursor { rest: input, mode };
    let nodes = cursor.parse_nodes(0)?;
    if !cursor.rest.is_empty() {
        // Only reachable via a stray `</tag>` at depth 0 with no opener.
        let tag = cursor.peek_stray_closer_name();
        return Err(MicroXmlError::UnmatchedCloser(tag));
    }
    Ok(nodes)
}

/// Pass/fail verdict for Simple XML / Simple XHTML callers (§4.8).
pub fn validate(input: &str, mode: Mode) -> bool {
    parse(input, mode).is_ok()
}

/// Parses `input` and, on success, appends the resulting subtree as children
/// of `parent` (clearing any existing children first). On failure `parent`
/// is left cleared, per §4.8's HTML-mode failure contract.
pub fn build(doc: &mut Document, parent: NodeId, input: &str, mode: Mode) -> Result<(), MicroXmlError> {
    doc.clear_children(parent).expect("caller guarantees parent is an element");
    let nodes = parse(input, mode)?;
    install(doc, parent, &nodes);
    Ok(())
}

fn install(doc: &mut Document, parent: NodeId, nodes: &[MicroNode]) {
    for node in nodes {
        match node {
            MicroNode::Text(text) => {
                doc.append_text_child(parent, text.clone())
                    .expect("caller guarantees parent is an element");
            }
            MicroNode::Element { tag, attrs, children } => {
                let id = doc
                    .append_element_child(parent, OwnedQName::unprefixed(tag.clone()))
                    .expect("caller guarantees parent is an element");
                for (name, value) in attrs {
                    doc.set_attribute(id, OwnedQName::unprefixed(name.clone()), value.clone())
                        .expect("just created as an element");
                }
                install(doc, id, children);
            }
        }
    }
}

struct Cursor<'a> {
    rest: &'a str,
    mode: Mode,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn name_token(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char).parse(input)
}

fn quote_char(input: &str) -> IResult<&str, char> {
    one_of("\"'").parse(input)
}

impl<'a> Cursor<'a> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start_matches([' ', '\t', '\n', '\r']);
    }

    /// TEXT state: accumulates text and decoded entities until a `<` opens
    /// a child element, a `</` closes the current element (left for the
    /// caller to consume), or input is exhausted.
    fn parse_nodes(&mut self, depth: usize) -> Result<Vec<MicroNode>, MicroXmlError> {
        if depth > MAX_DEPTH {
            return Err(MicroXmlError::NestingTooDeep);
        }
        let mut nodes = Vec::new();
        let mut text = String::new();
        loop {
            match self.rest.chars().next() {
                None => break,
                Some('<') => {
                    if self.rest.as_bytes().get(1) == Some(&b'/') {
                        break;
                    }
                    if !text.is_empty() {
                        nodes.push(MicroNode::Text(std::mem::take(&mut text)));
                    }
                    nodes.push(self.parse_element(depth)?);
                }
                Some('&') => text.push_str(&self.parse_entity()),
                Some(c) => {
                    text.push(c);
                    self.rest = &self.rest[c.len_utf8()..];
                }
            }
        }
        if !text.is_empty() {
            nodes.push(MicroNode::Text(text));
        }
        Ok(nodes)
    }

    /// TAG_OPEN → IN_NAME → IN_ATTRS → self-closing `/>` or `>` then content
    /// and a matching END_TAG.
    fn parse_element(&mut self, depth: usize) -> Result<MicroNode, MicroXmlError> {
        self.rest = &self.rest[1..]; // consume '<'
        let tag = self.parse_name()?;
        self.check_allowlist(&tag)?;
        let attrs = self.parse_attrs()?;
        self.skip_ws();
        let self_closing = self.rest.starts_with('/');
        if self_closing {
            self.rest = &self.rest[1..];
        }
        if !self.rest.starts_with('>') {
            return Err(MicroXmlError::UnterminatedTag);
        }
        self.rest = &self.rest[1..];

        let is_void = self.mode == Mode::SimpleHtml && VOID_HTML_TAGS.contains(&tag.to_ascii_lowercase().as_str());
        if self_closing || is_void {
            return Ok(MicroNode::Element {
                tag,
                attrs,
                children: Vec::new(),
            });
        }
        let children = self.parse_nodes(depth + 1)?;
        self.expect_end_tag(&tag)?;
        Ok(MicroNode::Element { tag, attrs, children })
    }

    /// END_TAG state.
    fn expect_end_tag(&mut self, expected: &str) -> Result<(), MicroXmlError> {
        if !self.rest.starts_with("</") {
            return Err(MicroXmlError::UnmatchedCloser(expected.to_string()));
        }
        self.rest = &self.rest[2..];
        let found = self.parse_name()?;
        let matches = if self.mode == Mode::SimpleHtml {
            found.eq_ignore_ascii_case(expected)
        } else {
            found == expected
        };
        if !matches {
            return Err(MicroXmlError::MismatchedCloseTag {
                expected: expected.to_string(),
                found,
            });
        }
        self.skip_ws();
        if !self.rest.starts_with('>') {
            return Err(MicroXmlError::UnterminatedTag);
        }
        self.rest = &self.rest[1..];
        Ok(())
    }

    /// IN_NAME state. Tag names are ASCII-only per §4.8's common restrictions.
    fn parse_name(&mut self) -> Result<String, MicroXmlError> {
        let (rest, name) = name_token(self.rest).map_err(|_| MicroXmlError::UnterminatedTag)?;
        self.rest = rest;
        Ok(name.to_string())
    }

    fn check_allowlist(&self, tag: &str) -> Result<(), MicroXmlError> {
        let allowed = match self.mode {
            Mode::SimpleXml => true,
            Mode::SimpleXhtml => XHTML_TAGS.contains(&tag),
            Mode::SimpleHtml => HTML_TAGS.contains(&tag.to_ascii_lowercase().as_str()),
        };
        if allowed {
            Ok(())
        } else {
            Err(MicroXmlError::TagNotAllowed(tag.to_string()))
        }
    }

    /// IN_ATTRS/ATTR_NAME/EQUALS/ATTR_VALUE/AFTER_ATTR states. No entity
    /// references in attribute values (§4.8): the raw quoted text is taken
    /// verbatim.
    fn parse_attrs(&mut self) -> Result<Vec<(String, String)>, MicroXmlError> {
        let mut attrs = Vec::new();
        loop {
            self.skip_ws();
            match self.rest.chars().next() {
                Some('/') | Some('>') | None => break,
                _ => {}
            }
            let name = self.parse_name()?;
            self.skip_ws();
            let (rest, _) = char::<_, nom::error::Error<&str>>('=')
                .parse(self.rest)
                .map_err(|_| MicroXmlError::UnterminatedAttribute)?;
            self.rest = rest;
            self.skip_ws();
            let (rest, quote) = quote_char(self.rest).map_err(|_| MicroXmlError::UnterminatedAttribute)?;
            self.rest = rest;
            let end = self.rest.find(quote).ok_or(MicroXmlError::UnterminatedAttribute)?;
            let value = self.rest[..end].to_string();
            self.rest = &self.rest[end + quote.len_utf8()..];
            attrs.push((name, value));
        }
        Ok(attrs)
    }

    /// ENTITY state: `&#10;`/`&#x2764;` numeric references decode to their
    /// scalar value (U+FFFD substitution for surrogates/out-of-range, §9);
    /// anything else beginning with `&` (including a named reference, which
    /// this subset does not recognize) is passed through as a literal `&`.
    fn parse_entity(&mut self) -> String {
        let after_amp = &self.rest[1..];
        if let Some(numeric) = after_amp.strip_prefix('#') {
            let (hex, digits_input) = match opt(one_of::<_, nom::error::Error<&str>>("xX")).parse(numeric) {
                Ok((rest, marker)) => (marker.is_some(), rest),
                Err(_) => (false, numeric),
            };
            let digit_pred: fn(char) -> bool = if hex { |c| c.is_ascii_hexdigit() } else { |c| c.is_ascii_digit() };
            if let Ok((rest, digits)) = take_while1::<_, _, nom::error::Error<&str>>(digit_pred).parse(digits_input) {
                if let Some(rest) = rest.strip_prefix(';') {
                    let radix = if hex { 16 } else { 10 };
                    if let Ok(code) = u32::from_str_radix(digits, radix) {
                        self.rest = rest;
                        return scalar_to_string(code);
                    }
                }
            }
        }
        self.rest = after_amp;
        "&".to_string()
    }

    /// Used only on the final-remainder error path: reads the tag name out
    /// of a stray `</tag>` with no opener, for the error message.
    fn peek_stray_closer_name(&mut self) -> String {
        if let Some(rest) = self.rest.strip_prefix("</") {
            self.rest = rest;
            self.parse_name().unwrap_or_default()
        } else {
            String::new()
        }
    }
}

fn scalar_to_string(code: u32) -> String {
    if (0xD800..=0xDFFF).contains(&code) {
        log::warn!("[MICROXML] lone surrogate U+{code:04X} in character reference, substituting U+FFFD");
        return "\u{FFFD}".to_string();
    }
    match char::from_u32(code) {
        Some(c) => c.to_string(),
        None => {
            log::warn!("[MICROXML] invalid scalar value U+{code:04X} in character reference, substituting U+FFFD");
            "\u{FFFD}".to_string()
        }
    }
}
