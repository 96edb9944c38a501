//! C5: the policy deciding which nodes are top-level translation units (§4.5).

use itstool_dom::{Document, NodeRef};
use itstool_xpath::{DataSourceNode, NodeType};

use crate::ruleset::RuleSet;

/// Whether `node` qualifies as a translation unit on its own: `translate=yes`
/// (plus, below the top level, `withinText=yes`), and every element child is
/// itself a translation unit at `depth + 1` — the "self-contained" invariant
/// of §4.5: no untranslated element is ever hidden inside a translated one.
pub fn is_translation_unit(rule_set: &RuleSet, node: NodeRef, depth: usize) -> bool {
    if !matches!(node.node_type(), NodeType::Element | NodeType::Attribute) {
        return false;
    }
    let values = rule_set.eval(node);
    if values.get("translate") != Some("yes") {
        return false;
    }
    if depth > 0 && values.get("withinText") != Some("yes") {
        return false;
    }
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => {
                if !is_translation_unit(rule_set, child, depth + 1) {
                    return false;
                }
            }
            NodeType::Text | NodeType::EntityReference | NodeType::Comment => {}
            _ => return false,
        }
    }
    true
}

/// Appends `node`'s translation units to `out`: first its qualifying
/// attributes, then either `node` itself (if it qualifies whole) or, failing
/// that, a recursive descent into its element children.
pub fn extract_units<'a>(rule_set: &RuleSet, node: NodeRef<'a>, out: &mut Vec<NodeRef<'a>>) {
    if node.element_id().is_some() {
        for attr in node.attributes() {
            if is_translation_unit(rule_set, attr, 0) {
                out.push(attr);
            }
        }
    }
    if is_translation_unit(rule_set, node, 0) {
        out.push(node);
    } else {
        for child in node.children() {
            if child.node_type() == NodeType::Element {
                extract_units(rule_set, child, out);
            }
        }
    }
}

/// Locates every translation unit in `doc`, in document order.
pub fn locate_all<'a>(doc: &'a Document, rule_set: &RuleSet) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    extract_units(rule_set, NodeRef::root(doc), &mut out);
    out
}
