//! C6: walks the located translation units and emits one message per unit
//! with a non-empty msgid, via the `Sink` callback (§4.6).

use itstool_dom::{Document, NodeRef};
use itstool_xpath::{DataSourceNode, NodeType};

use crate::locator::locate_all;
use crate::ruleset::RuleSet;
use crate::select::select;
use crate::text::{WhitespaceMode, collect};
use crate::unit::compute_unit_values;

/// 1-based (line, column) of a node's start in the source document, used
/// only for catalog diagnostics (the spec's `emit(..., file, line, ...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// The external message-catalog collaborator spec §6 names as
/// `emit(msgctxt, msgid, file, line, comment, marker, whitespace_mode)`,
/// expressed as a trait so a caller can hand the extractor a stateful
/// object (an in-memory list, a PO writer) instead of a bare function.
pub trait Sink {
    fn emit(
        &mut self,
        msgctxt: Option<&str>,
        msgid: &str,
        position: Position,
        comment: Option<&str>,
        marker: &str,
        whitespace_mode: WhitespaceMode,
    );
}

/// Walks every translation unit in `doc` and feeds `sink` one message per
/// unit whose computed msgid is non-empty after trimming.
pub fn extract(doc: &Document, rule_set: &RuleSet, sink: &mut dyn Sink) {
    for unit in locate_all(doc, rule_set) {
        extract_unit(doc, rule_set, unit, sink);
    }
}

fn extract_unit(doc: &Document, rule_set: &RuleSet, unit: NodeRef, sink: &mut dyn Sink) {
    let values = compute_unit_values(rule_set, unit);

    let msgid = match &values.text_pointer {
        Some(pointer) => match select(doc, pointer, unit, &[]) {
            Ok(nodes) => nodes
                .first()
                .map(|n| collect(*n, WhitespaceMode::Preserve, false))
                .unwrap_or_default(),
            Err(e) => {
                log::warn!("[EXTRACT] textPointer '{pointer}' failed to evaluate: {e}");
                String::new()
            }
        },
        // Escaping during extraction is always off (§4.6): extracted text is
        // for human translators, special characters stay as plain text.
        None => collect(unit, values.whitespace, false),
    };

    if msgid.trim().is_empty() {
        log::debug!("[EXTRACT] skipping unit with empty msgid (marker {})", compute_marker(unit));
        return;
    }

    let comment = values.loc_note.or_else(|| preceding_comment_text(unit));
    let marker = compute_marker(unit);
    let position = node_position(unit);

    sink.emit(
        values.context.as_deref(),
        &msgid,
        position,
        comment.as_deref(),
        &marker,
        values.whitespace,
    );
}

/// `parentTag/tag` for an element, `grandparentTag/parentTag@attrName` for
/// an attribute (§4.6). Missing ancestors (e.g. the document element itself
/// has no element parent) render as an empty segment.
fn compute_marker(unit: NodeRef) -> String {
    match unit {
        NodeRef::Attribute(doc, owner, index) => {
            let attr_name = doc
                .attributes(owner)
                .get(index)
                .map(|a| a.name.local.as_str())
                .unwrap_or_default();
            let parent_tag = doc.element_name(owner).map(|q| q.local.as_str()).unwrap_or_default();
            let grandparent_tag = doc
                .parent(owner)
                .filter(|&gp| doc.is_element(gp))
                .and_then(|gp| doc.element_name(gp))
                .map(|q| q.local.as_str())
                .unwrap_or_default();
            format!("{grandparent_tag}/{parent_tag}@{attr_name}")
        }
        NodeRef::Node(doc, id) => {
            let tag = doc.element_name(id).map(|q| q.local.as_str()).unwrap_or_default();
            let parent_tag = doc
                .parent(id)
                .filter(|&p| doc.is_element(p))
                .and_then(|p| doc.element_name(p))
                .map(|q| q.local.as_str())
                .unwrap_or_default();
            format!("{parent_tag}/{tag}")
        }
    }
}

fn node_position(unit: NodeRef) -> Position {
    let doc_pos = match unit {
        NodeRef::Node(doc, id) => doc.position(id),
        NodeRef::Attribute(doc, owner, _) => doc.position(owner),
    };
    let (line, column) = doc_pos.unwrap_or((0, 0));
    Position { line, column }
}

/// Falls back to the text of XML comments immediately preceding `unit`
/// (a contiguous run, skipping whitespace-only text between them), each
/// trimmed and newline-joined, innermost-first to outermost-last order
/// restored (§4.6).
fn preceding_comment_text(unit: NodeRef) -> Option<String> {
    let parent = unit.parent()?;
    let siblings: Vec<NodeRef> = parent.children().collect();
    let index = siblings.iter().position(|&sibling| sibling == unit)?;

    let mut comments = Vec::new();
    let mut i = index;
    while i > 0 {
        let previous = siblings[i - 1];
        match previous.node_type() {
            NodeType::Comment => {
                comments.push(previous.string_value().trim().to_string());
                i -= 1;
            }
            NodeType::Text if previous.string_value().trim().is_empty() => {
                i -= 1;
            }
            _ => break,
        }
    }
    if comments.is_empty() {
        return None;
    }
    comments.reverse();
    Some(comments.join("\n"))
}
