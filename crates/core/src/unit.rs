//! Computes the "effective values" of a translation unit — whitespace mode,
//! escape policy, context, localization note, text pointer — identically for
//! the extractor (C6) and the merger (C7), per spec §4.7 step 1 ("compute
//! effective values identically to the extractor").

use itstool_dom::NodeRef;

use crate::ruleset::RuleSet;
use crate::select::select;
use crate::text::WhitespaceMode;

#[derive(Debug, Clone)]
pub struct UnitValues {
    pub whitespace: WhitespaceMode,
    pub escape: bool,
    pub unescape_if: Option<String>,
    /// Resolved context string (via `contextPointer`), if any.
    pub context: Option<String>,
    /// The raw `textPointer` XPath string, left unresolved: the extractor
    /// and merger each collect it under their own mode (always PRESERVE, no
    /// escape, for the extractor's msgid computation — §4.6).
    pub text_pointer: Option<String>,
    /// Resolved localization note (inline text, or via `locNotePointer`).
    pub loc_note: Option<String>,
}

/// Resolves `pointer` (an XPath expression relative to `node`) to the string
/// value of its first selected node, or `None` if the pointer fails to
/// evaluate or selects nothing.
pub fn resolve_pointer(node: NodeRef, pointer: &str) -> Option<String> {
    let doc = node.doc();
    // Pointer expressions (`locNotePointer`/`contextPointer`/`textPointer`) are
    // evaluated after several rules have already been merged into one
    // `UnitValues`, so there is no single rule's namespace bindings left to
    // re-register here; pointers in practice are written unprefixed.
    match select(doc, pointer, node, &[]) {
        Ok(nodes) => nodes.first().map(|n| n.string_value()),
        Err(e) => {
            log::warn!("[UNIT] pointer '{pointer}' failed to evaluate: {e}");
            None
        }
    }
}

pub fn compute_unit_values(rule_set: &RuleSet, node: NodeRef) -> UnitValues {
    let values = rule_set.eval(node);

    let whitespace = values
        .get("space")
        .and_then(WhitespaceMode::from_its_value)
        .unwrap_or(WhitespaceMode::Normalize);
    let escape = values.get("escape") == Some("yes");
    let unescape_if = values.get("unescape-if").map(str::to_string);

    let context = values.get("contextPointer").and_then(|pointer| resolve_pointer(node, pointer));

    let loc_note = values
        .get("locNote")
        .map(str::to_string)
        .or_else(|| values.get("locNotePointer").and_then(|pointer| resolve_pointer(node, pointer)));

    let text_pointer = values.get("textPointer").map(str::to_string);

    UnitValues {
        whitespace,
        escape,
        unescape_if,
        context,
        text_pointer,
        loc_note,
    }
}
