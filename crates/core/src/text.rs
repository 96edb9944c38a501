//! C4: recursive, whitespace-aware, escape-aware text collection (§4.4).

use itstool_dom::NodeRef;
use itstool_xpath::{DataSourceNode, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceMode {
    Preserve,
    Trim,
    Normalize,
    NormalizeParagraph,
}

impl WhitespaceMode {
    pub fn from_its_value(value: &str) -> Option<Self> {
        match value {
            "preserve" => Some(WhitespaceMode::Preserve),
            "default" => Some(WhitespaceMode::Normalize),
            "trim" => Some(WhitespaceMode::Trim),
            "paragraph" => Some(WhitespaceMode::NormalizeParagraph),
            _ => None,
        }
    }
}

/// Walks `node`'s children in document order and concatenates their textual
/// serialization under `mode`/`do_escape`. If `node` is an attribute, its
/// own string value stands in for a single text child (attributes have no
/// children in this tree), which is also the only case where `do_escape`
/// additionally quote-escapes `"`.
pub fn collect(node: NodeRef, mode: WhitespaceMode, do_escape: bool) -> String {
    if let NodeRef::Attribute(..) = node {
        let raw = node.string_value();
        let piece = if do_escape { escape_text(&raw, true) } else { raw };
        return apply_whitespace(&piece, mode, true, true);
    }

    let emitted: Vec<NodeRef> = node
        .children()
        .filter(|c| {
            matches!(
                c.node_type(),
                NodeType::Text | NodeType::Element | NodeType::EntityReference
            )
        })
        .collect();
    let last_index = emitted.len().saturating_sub(1);

    let mut out = String::new();
    for (i, child) in emitted.iter().enumerate() {
        let is_first = i == 0;
        let is_last = i == last_index;
        let piece = match child.node_type() {
            NodeType::Text => {
                let raw = child.string_value();
                let escaped = if do_escape { escape_text(&raw, false) } else { raw };
                apply_whitespace(&escaped, mode, is_first, is_last)
            }
            NodeType::EntityReference => {
                let name = child.name().map(|q| q.local_part).unwrap_or("");
                apply_whitespace(&format!("&{name};"), mode, is_first, is_last)
            }
            NodeType::Element => {
                let inner = collect(*child, mode, do_escape);
                let serialized = format!("{}{inner}{}", open_tag(*child), close_tag(*child));
                apply_whitespace(&serialized, mode, is_first, is_last)
            }
            _ => unreachable!("filtered above"),
        };
        out.push_str(&piece);
    }
    out
}

fn open_tag(el: NodeRef) -> String {
    let name = el.name().map(|q| q.local_part).unwrap_or_default();
    let mut tag = format!("<{name}");
    for attr in el.attributes() {
        let attr_name = attr.name().map(|q| q.local_part).unwrap_or_default();
        tag.push(' ');
        tag.push_str(attr_name);
        tag.push_str("=\"");
        tag.push_str(&attr.string_value());
        tag.push('"');
    }
    tag.push('>');
    tag
}

fn close_tag(el: NodeRef) -> String {
    let name = el.name().map(|q| q.local_part).unwrap_or_default();
    format!("</{name}>")
}

fn escape_text(s: &str, quote_too: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote_too => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn is_ascii_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn apply_whitespace(s: &str, mode: WhitespaceMode, is_first: bool, is_last: bool) -> String {
    match mode {
        WhitespaceMode::Preserve => s.to_string(),
        WhitespaceMode::Trim => s.trim_matches(is_ascii_ws).to_string(),
        WhitespaceMode::Normalize => normalize(s, is_first, is_last, false),
        WhitespaceMode::NormalizeParagraph => normalize(s, is_first, is_last, true),
    }
}

/// NORMALIZE of a standalone string with no surrounding siblings — used by
/// the localization-note rule constructor (§4.2.2) to normalize an inline
/// `<locNote>` child's text at rule-load time, outside of any document tree.
pub fn normalize_for_rule(s: &str) -> String {
    normalize(s, true, true, false)
}

/// Collapses whitespace runs to a single space (or, in paragraph mode, to
/// `"\n\n"` when the run contains at least two newlines), stripping the
/// leading run entirely if `is_first` and the trailing run if `is_last`.
fn normalize(s: &str, is_first: bool, is_last: bool, paragraph: bool) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut out = String::new();
    let mut i = 0;
    while i < n {
        if is_ascii_ws(chars[i]) {
            let start = i;
            let mut newlines = 0;
            while i < n && is_ascii_ws(chars[i]) {
                if chars[i] == '\n' {
                    newlines += 1;
                }
                i += 1;
            }
            let is_leading_run = start == 0;
            let is_trailing_run = i == n;
            if is_leading_run && is_first {
                continue;
            }
            if is_trailing_run && is_last {
                continue;
            }
            if paragraph && newlines >= 2 {
                out.push_str("\n\n");
            } else {
                out.push(' ');
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use itstool_dom::Document;

    fn first_element(doc: &Document) -> NodeRef<'_> {
        NodeRef::root(doc).children().next().unwrap()
    }

    #[test]
    fn preserve_mode_is_identity() {
        let doc = Document::parse("<p>  hello   world  </p>").unwrap();
        let p = first_element(&doc);
        assert_eq!(collect(p, WhitespaceMode::Preserve, false), "  hello   world  ");
    }

    #[test]
    fn trim_strips_every_piece_unconditionally() {
        let doc = Document::parse("<p>  hello   world  </p>").unwrap();
        let p = first_element(&doc);
        assert_eq!(collect(p, WhitespaceMode::Trim, false), "hello   world");
    }

    #[test]
    fn normalize_collapses_interior_and_strips_edges() {
        let doc = Document::parse("<p>  hello   world  </p>").unwrap();
        let p = first_element(&doc);
        assert_eq!(collect(p, WhitespaceMode::Normalize, false), "hello world");
    }

    #[test]
    fn normalize_is_idempotent() {
        let doc = Document::parse("<p>  hello   world  \n\n more </p>").unwrap();
        let p = first_element(&doc);
        let once = collect(p, WhitespaceMode::Normalize, false);
        let doc2 = Document::parse(&format!("<p>{once}</p>")).unwrap();
        let p2 = first_element(&doc2);
        let twice = collect(p2, WhitespaceMode::Normalize, false);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_paragraph_preserves_blank_lines() {
        let doc = Document::parse("<p>one\n\ntwo</p>").unwrap();
        let p = first_element(&doc);
        assert_eq!(collect(p, WhitespaceMode::NormalizeParagraph, false), "one\n\ntwo");
    }

    #[test]
    fn element_children_are_reserialized_inline() {
        let doc = Document::parse("<p>Hello, <b>world</b>!</p>").unwrap();
        let p = first_element(&doc);
        assert_eq!(
            collect(p, WhitespaceMode::Normalize, false),
            "Hello, <b>world</b>!"
        );
    }

    #[test]
    fn escaping_covers_ampersand_and_angle_brackets() {
        let doc = Document::parse("<p>a &amp; b &lt; c</p>").unwrap();
        let p = first_element(&doc);
        // roxmltree resolves the predefined entities while parsing, so the
        // text node's raw content is already "a & b < c"; collect() re-escapes it.
        assert_eq!(collect(p, WhitespaceMode::Preserve, true), "a &amp; b &lt; c");
    }
}
