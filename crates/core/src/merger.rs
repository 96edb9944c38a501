//! C7: walks the located translation units and installs translated text
//! back into the tree (§4.7).

use itstool_dom::{Document, NodeId, NodeRef};

use crate::locator::locate_all;
use crate::microxml::{self, Mode as MicroXmlMode};
use crate::ruleset::RuleSet;
use crate::select::select;
use crate::text::{WhitespaceMode, collect};
use crate::unit::compute_unit_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    ReplaceInPlace,
    DuplicateAsSibling,
}

/// The external message-catalog collaborator spec §6 names as
/// `lookup(msgctxt, msgid) -> Option<string>`.
pub trait Catalog {
    fn lookup(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&str>;
}

enum MergeTarget {
    Element(NodeId),
    Attribute { owner: NodeId, index: usize },
}

struct PreparedUnit {
    target: MergeTarget,
    translation: String,
    escape: bool,
    unescape_if: Option<String>,
}

/// Merges `catalog`'s translations into `doc` in place, tagging each
/// translated node `xml:lang="{lang}"` and placing the translated content
/// per `mode` (§4.7).
pub fn merge(doc: &mut Document, rule_set: &RuleSet, catalog: &dyn Catalog, lang: &str, mode: MergeMode) {
    // Units are located and their effective values/msgids computed while
    // `doc` is only borrowed immutably; the results are owned data so the
    // second pass can mutate `doc` freely. Arena ids are never reused, so
    // sibling insertions made by an earlier unit in this pass cannot
    // invalidate a later unit's recorded target.
    let prepared = prepare_units(doc, rule_set, catalog);
    for unit in prepared {
        install(doc, unit, lang, mode);
    }
}

fn prepare_units(doc: &Document, rule_set: &RuleSet, catalog: &dyn Catalog) -> Vec<PreparedUnit> {
    let mut out = Vec::new();
    for unit in locate_all(doc, rule_set) {
        let values = compute_unit_values(rule_set, unit);

        // Identical to the extractor's msgid computation (§4.6/§4.7 step 1):
        // same textPointer-or-whitespace-mode logic, escaping always off for
        // the lookup key itself.
        let msgid = match &values.text_pointer {
            Some(pointer) => match select(doc, pointer, unit, &[]) {
                Ok(nodes) => nodes
                    .first()
                    .map(|n| collect(*n, WhitespaceMode::Preserve, false))
                    .unwrap_or_default(),
                Err(e) => {
                    log::warn!("[MERGE] textPointer '{pointer}' failed to evaluate: {e}");
                    continue;
                }
            },
            None => collect(unit, values.whitespace, false),
        };
        if msgid.trim().is_empty() {
            continue;
        }

        let Some(translation) = catalog.lookup(values.context.as_deref(), &msgid) else {
            log::debug!("[MERGE] no catalog entry for msgid '{msgid}', leaving unit untouched");
            continue;
        };
        if translation.is_empty() {
            log::debug!("[MERGE] skipping empty translation for msgid '{msgid}'");
            continue;
        }

        let target = match unit {
            NodeRef::Node(_, id) => MergeTarget::Element(id),
            NodeRef::Attribute(_, owner, index) => MergeTarget::Attribute { owner, index },
        };
        out.push(PreparedUnit {
            target,
            translation: translation.to_string(),
            escape: values.escape,
            unescape_if: values.unescape_if,
        });
    }
    out
}

fn install(doc: &mut Document, unit: PreparedUnit, lang: &str, mode: MergeMode) {
    match unit.target {
        MergeTarget::Element(id) => install_element(
            doc,
            id,
            &unit.translation,
            unit.escape,
            unit.unescape_if.as_deref(),
            lang,
            mode,
        ),
        MergeTarget::Attribute { owner, index } => install_attribute(doc, owner, index, &unit.translation, lang, mode),
    }
}

fn install_element(
    doc: &mut Document,
    original: NodeId,
    translation: &str,
    escape: bool,
    unescape_if: Option<&str>,
    lang: &str,
    mode: MergeMode,
) {
    let target = match mode {
        MergeMode::ReplaceInPlace => original,
        MergeMode::DuplicateAsSibling => shallow_copy_element_as_sibling(doc, original),
    };
    doc.set_xml_lang(target, lang).expect("target is an element");
    install_text_content(doc, target, translation, escape, unescape_if);
}

fn install_attribute(doc: &mut Document, owner: NodeId, index: usize, translation: &str, lang: &str, mode: MergeMode) {
    let attr_name = doc.attributes(owner)[index].name.clone();
    let target = match mode {
        MergeMode::ReplaceInPlace => owner,
        MergeMode::DuplicateAsSibling => shallow_copy_element_as_sibling(doc, owner),
    };
    doc.set_xml_lang(target, lang).expect("target is an element");
    doc.set_attribute(target, attr_name, translation.to_string())
        .expect("target is an element");
}

/// Creates a copy of `original` (tag and attributes, minus `id`, no
/// children) and inserts it as the next sibling, per the
/// `DuplicateAsSibling` mode in §4.7 ("shallow-copy the element node,
/// dropping `id`, as a next sibling; operate on the copy").
fn shallow_copy_element_as_sibling(doc: &mut Document, original: NodeId) -> NodeId {
    let copy = doc.clone_subtree(original);
    doc.clear_children(copy).expect("copy is an element");
    doc.remove_attribute(copy, "id").expect("copy is an element");
    doc.insert_sibling_after(original, copy).expect("original has a parent");
    copy
}

/// Installs `translation` as `target`'s sole content, per the escape policy
/// of §4.7 step 6.
fn install_text_content(doc: &mut Document, target: NodeId, translation: &str, escape: bool, unescape_if: Option<&str>) {
    if escape {
        doc.clear_children(target).expect("target is an element");
        doc.append_text_child(target, translation.to_string())
            .expect("target is an element");
        return;
    }

    if let Some(mode) = unescape_if.and_then(micro_xml_mode) {
        match microxml::build(doc, target, translation, mode) {
            Ok(()) => return,
            Err(e) => {
                log::warn!(
                    "[MERGE] inline markup '{translation}' failed validation under unescape-if='{}': {e}, \
                     falling back to middle-ground escape",
                    unescape_if.unwrap_or("")
                );
            }
        }
    }

    doc.clear_children(target).expect("target is an element");
    doc.append_raw_text_child(target, middle_ground_escape(translation))
        .expect("target is an element");
}

fn micro_xml_mode(unescape_if: &str) -> Option<MicroXmlMode> {
    match unescape_if {
        "xml" => Some(MicroXmlMode::SimpleXml),
        "xhtml" => Some(MicroXmlMode::SimpleXhtml),
        "html" => Some(MicroXmlMode::SimpleHtml),
        // "no" (the default) never attempts inline-markup parsing.
        _ => None,
    }
}

/// The "middle ground" escape policy (§4.7): `<` and `>` are always encoded;
/// `&` is encoded only when leaving it bare would start what looks like a
/// numeric character reference (`&#...;`/`&#x...;`), which a downstream XML
/// parser would otherwise read as an entity the translator did not intend.
pub fn middle_ground_escape(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if looks_like_numeric_reference(&chars[i + 1..]) => out.push_str("&amp;"),
            c => out.push(c),
        }
        i += 1;
    }
    out
}

fn looks_like_numeric_reference(rest: &[char]) -> bool {
    let Some(&first) = rest.first() else {
        return false;
    };
    if first != '#' {
        return false;
    }
    let hex = matches!(rest.get(1), Some('x') | Some('X'));
    let digits = if hex { &rest[2..] } else { &rest[1..] };
    let digit_count = digits
        .iter()
        .take_while(|c| if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() })
        .count();
    digit_count > 0 && digits.get(digit_count) == Some(&';')
}
