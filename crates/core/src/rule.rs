//! C2: the rule model. A closed set of six data categories, each a struct
//! carrying the fields common to every rule (selector, default ValueMap,
//! captured namespace bindings) grouped behind one `Rule` enum dispatched by
//! a plain `match` — no `dyn Trait`, since the category set is closed by the
//! ITS specification (design notes §9).

use itstool_dom::{Document, NodeRef};

use crate::error::{ItsError, RuleBuildError};
use crate::ruleset::ITS_NS;
use crate::select::select_from_root;
use crate::text::normalize_for_rule;
use crate::value::{ValueMap, ValuePool};

/// The namespace gettext-extension rule elements and attributes (`contextRule`,
/// `escapeRule`, and the `trim`/`paragraph` extension values of `space`) are
/// recognized in, per spec §6.
pub const GETTEXT_EXTENSION_NS: &str = "https://www.gnu.org/s/gettext/ns/its/extensions/1.0";

#[derive(Debug, Clone)]
pub struct RuleCommon {
    pub selector: String,
    pub defaults: ValueMap,
    pub namespaces: Vec<(Option<String>, String)>,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Translate(RuleCommon),
    LocalizationNote(RuleCommon),
    ElementWithinText(RuleCommon),
    PreserveSpace(RuleCommon),
    Context(RuleCommon),
    Escape(RuleCommon),
}

impl Rule {
    pub fn common(&self) -> &RuleCommon {
        match self {
            Rule::Translate(c)
            | Rule::LocalizationNote(c)
            | Rule::ElementWithinText(c)
            | Rule::PreserveSpace(c)
            | Rule::Context(c)
            | Rule::Escape(c) => c,
        }
    }

    /// Evaluates the XPath selector against the document and merges this
    /// rule's default `ValueMap` into every selected node's pool entry. The
    /// same XPath-and-merge pattern for all six categories (§4.2).
    pub fn apply(&self, doc: &Document, pool: &mut ValuePool) -> Result<(), ItsError> {
        let common = self.common();
        for node in select_from_root(doc, &common.selector, &common.namespaces)? {
            pool.merge_into(node, &common.defaults);
        }
        Ok(())
    }

    /// Computes this rule's data category's effective value for `node`. The
    /// inheritance algorithm depends only on the category, not on this
    /// particular rule instance's selector or defaults — those were already
    /// folded into the pool by `apply`. Calling `eval` on several rules of
    /// the same category for the same node is redundant but harmless, since
    /// every such call reads the same already-applied pool state.
    pub fn eval(&self, node: NodeRef, pool: &ValuePool) -> ValueMap {
        match self {
            Rule::Translate(_) => eval_translate(node, pool),
            Rule::LocalizationNote(_) => eval_loc_note(node, pool),
            Rule::ElementWithinText(_) => eval_within_text(node, pool),
            Rule::PreserveSpace(_) => eval_space(node, pool),
            Rule::Context(_) => eval_context(node, pool),
            Rule::Escape(_) => eval_escape(node, pool),
        }
    }
}

/// Captures the in-scope namespace bindings at a rule element's source
/// position; `select_from_root` re-registers them on the XPath context so a
/// prefixed selector step (e.g. `//its:span`) resolves the same way it did
/// at the rule's own source position, per spec §4.3.
fn capture_namespaces(elem: roxmltree::Node) -> Vec<(Option<String>, String)> {
    elem.namespaces()
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

fn required_attr<'a, 'input>(
    elem: &roxmltree::Node<'a, 'input>,
    rule: &str,
    attribute: &str,
) -> Result<&'input str, RuleBuildError> {
    elem.attribute(attribute)
        .ok_or_else(|| RuleBuildError::MissingAttribute {
            rule: rule.to_string(),
            attribute: attribute.to_string(),
        })
}

impl Rule {
    /// Dispatches a `<rules>` child element to the matching constructor by
    /// its local name (spec §4.3: "iterate root's element children; dispatch
    /// by local name to the constructors in §4.2"). Each constructor reads
    /// the attributes/children it requires and returns a `RuleBuildError`
    /// (never fatal to the whole rule set — see `RuleSet::load_from_str`)
    /// when a required attribute is missing or holds an unrecognized value.
    pub fn build(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
        match elem.tag_name().name() {
            "translateRule" => build_translate(elem),
            "locNoteRule" => build_loc_note(elem),
            "withinTextRule" => build_within_text(elem),
            "preserveSpaceRule" => build_space(elem),
            "contextRule" => build_context(elem),
            "escapeRule" => build_escape(elem),
            other => Err(RuleBuildError::UnknownRuleElement(other.to_string())),
        }
    }
}

/// §4.2.1: requires `selector` and `translate`.
fn build_translate(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "translateRule", "selector")?.to_string();
    let translate = required_attr(&elem, "translateRule", "translate")?;
    if translate != "yes" && translate != "no" {
        return Err(RuleBuildError::InvalidValue {
            rule: "translateRule".to_string(),
            attribute: "translate".to_string(),
            value: translate.to_string(),
        });
    }
    let mut defaults = ValueMap::new();
    defaults.set("translate", translate);
    Ok(Rule::Translate(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

/// §4.2.2: requires `selector` and `locNoteType`, plus either an inline
/// `<locNote>` child element (normalized, no escaping) or a `locNotePointer`
/// attribute.
fn build_loc_note(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "locNoteRule", "selector")?.to_string();
    let loc_note_type = required_attr(&elem, "locNoteRule", "locNoteType")?;
    let mut defaults = ValueMap::new();
    defaults.set("locNoteType", loc_note_type);
    if let Some(child) = elem
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "locNote")
    {
        let raw: String = child
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        defaults.set("locNote", normalize_for_rule(&raw));
    }
    if let Some(pointer) = elem.attribute("locNotePointer") {
        defaults.set("locNotePointer", pointer);
    }
    Ok(Rule::LocalizationNote(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

/// §4.2.3: requires `selector` and `withinText`.
fn build_within_text(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "withinTextRule", "selector")?.to_string();
    let within_text = required_attr(&elem, "withinTextRule", "withinText")?;
    if within_text != "yes" && within_text != "no" {
        return Err(RuleBuildError::InvalidValue {
            rule: "withinTextRule".to_string(),
            attribute: "withinText".to_string(),
            value: within_text.to_string(),
        });
    }
    let mut defaults = ValueMap::new();
    defaults.set("withinText", within_text);
    Ok(Rule::ElementWithinText(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

/// §4.2.4: requires `selector` and `space`. `trim`/`paragraph` are only
/// recognized when the rule element itself is in the gettext extension
/// namespace; any other value is a build error (the rule is skipped).
fn build_space(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "preserveSpaceRule", "selector")?.to_string();
    let space = required_attr(&elem, "preserveSpaceRule", "space")?;
    let is_extension = elem.tag_name().namespace() == Some(GETTEXT_EXTENSION_NS);
    let recognized = match space {
        "preserve" | "default" => true,
        "trim" | "paragraph" => is_extension,
        _ => false,
    };
    if !recognized {
        return Err(RuleBuildError::InvalidValue {
            rule: "preserveSpaceRule".to_string(),
            attribute: "space".to_string(),
            value: space.to_string(),
        });
    }
    let mut defaults = ValueMap::new();
    defaults.set("space", space);
    Ok(Rule::PreserveSpace(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

/// §4.2.5 (gettext extension): requires `selector` and `contextPointer`;
/// `textPointer` is optional.
fn build_context(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "contextRule", "selector")?.to_string();
    let context_pointer = required_attr(&elem, "contextRule", "contextPointer")?;
    let mut defaults = ValueMap::new();
    defaults.set("contextPointer", context_pointer);
    if let Some(text_pointer) = elem.attribute("textPointer") {
        defaults.set("textPointer", text_pointer);
    }
    Ok(Rule::Context(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

/// §4.2.6 (gettext extension): requires `selector` and `escape`;
/// `unescape-if` is optional.
fn build_escape(elem: roxmltree::Node) -> Result<Rule, RuleBuildError> {
    let selector = required_attr(&elem, "escapeRule", "selector")?.to_string();
    let escape = required_attr(&elem, "escapeRule", "escape")?;
    if escape != "yes" && escape != "no" {
        return Err(RuleBuildError::InvalidValue {
            rule: "escapeRule".to_string(),
            attribute: "escape".to_string(),
            value: escape.to_string(),
        });
    }
    let mut defaults = ValueMap::new();
    defaults.set("escape", escape);
    if let Some(unescape_if) = elem.attribute("unescape-if") {
        if !["xml", "xhtml", "html", "no"].contains(&unescape_if) {
            return Err(RuleBuildError::InvalidValue {
                rule: "escapeRule".to_string(),
                attribute: "unescape-if".to_string(),
                value: unescape_if.to_string(),
            });
        }
        defaults.set("unescape-if", unescape_if);
    }
    Ok(Rule::Escape(RuleCommon {
        selector,
        defaults,
        namespaces: capture_namespaces(elem),
    }))
}

fn eval_translate(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    result.set("translate", translate_value(node, pool));
    result
}

fn translate_value(node: NodeRef, pool: &ValuePool) -> String {
    if matches!(node, NodeRef::Attribute(..)) {
        return pool.get(node, "translate").unwrap_or("no").to_string();
    }
    let NodeRef::Node(doc, id) = node else {
        return "yes".to_string();
    };
    if let Some(v) = doc.attribute_value_ns(id, ITS_NS, "translate") {
        return v.to_string();
    }
    if let Some(v) = pool.get(node, "translate") {
        return v.to_string();
    }
    match node.parent() {
        Some(parent) if parent.element_id().is_some() => translate_value(parent, pool),
        _ => "yes".to_string(),
    }
}

fn eval_loc_note(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    if matches!(node, NodeRef::Attribute(..)) {
        copy_note_fields(pool.get_map(node), &mut result);
        return result;
    }
    let NodeRef::Node(doc, id) = node else { return result };
    let local_note = doc.attribute_value_ns(id, ITS_NS, "locNote");
    let local_ref = doc.attribute_value_ns(id, ITS_NS, "locNoteRef");
    let local_type = doc.attribute_value_ns(id, ITS_NS, "locNoteType");
    if local_note.is_some() || local_ref.is_some() || local_type.is_some() {
        if let Some(v) = local_note {
            result.set("locNote", v);
        }
        if let Some(v) = local_ref {
            result.set("locNotePointer", v);
        }
        if let Some(v) = local_type {
            result.set("locNoteType", v);
        }
        return result;
    }
    let own_map = pool.get_map(node);
    let has_own = own_map.is_some_and(|m| {
        m.get("locNote").is_some() || m.get("locNotePointer").is_some() || m.get("locNoteType").is_some()
    });
    if has_own {
        copy_note_fields(own_map, &mut result);
        return result;
    }
    match node.parent() {
        Some(parent) if parent.element_id().is_some() => eval_loc_note(parent, pool),
        _ => result,
    }
}

fn copy_note_fields(map: Option<&ValueMap>, out: &mut ValueMap) {
    let Some(map) = map else { return };
    for name in ["locNote", "locNotePointer", "locNoteType"] {
        if let Some(v) = map.get(name) {
            out.set(name, v);
        }
    }
}

fn eval_within_text(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    let value = match node {
        NodeRef::Attribute(..) => pool.get(node, "withinText").unwrap_or("no").to_string(),
        NodeRef::Node(doc, id) => doc
            .attribute_value_ns(id, ITS_NS, "withinText")
            .map(str::to_string)
            .or_else(|| pool.get(node, "withinText").map(str::to_string))
            .unwrap_or_else(|| "no".to_string()),
    };
    result.set("withinText", value);
    result
}

fn eval_space(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    result.set("space", space_value(node, pool));
    result
}

fn space_value(node: NodeRef, pool: &ValuePool) -> String {
    if let NodeRef::Node(doc, id) = node {
        if let Some(attr) = doc
            .attributes(id)
            .iter()
            .find(|a| a.name.prefix.as_deref() == Some("xml") && a.name.local == "space")
        {
            return attr.value.clone();
        }
    }
    if let Some(v) = pool.get(node, "space") {
        return v.to_string();
    }
    match node.parent() {
        Some(parent) if parent.element_id().is_some() => space_value(parent, pool),
        _ => "default".to_string(),
    }
}

fn eval_context(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    if let Some(map) = pool.get_map(node) {
        if let Some(v) = map.get("contextPointer") {
            result.set("contextPointer", v);
        }
        if let Some(v) = map.get("textPointer") {
            result.set("textPointer", v);
        }
    }
    result
}

fn eval_escape(node: NodeRef, pool: &ValuePool) -> ValueMap {
    let mut result = ValueMap::new();
    if matches!(node, NodeRef::Attribute(..)) {
        if let Some(v) = pool.get(node, "escape") {
            result.set("escape", v);
        }
        if let Some(v) = pool.get(node, "unescape-if") {
            result.set("unescape-if", v);
        }
        return result;
    }
    let NodeRef::Node(doc, id) = node else { return result };
    let local_escape = doc.attribute_value_ns(id, GETTEXT_EXTENSION_NS, "escape");
    let local_unescape = doc.attribute_value_ns(id, GETTEXT_EXTENSION_NS, "unescape-if");
    if local_escape.is_some() || local_unescape.is_some() {
        if let Some(v) = local_escape {
            result.set("escape", v);
        }
        if let Some(v) = local_unescape {
            result.set("unescape-if", v);
        }
        return result;
    }
    let own_map = pool.get_map(node);
    let has_own = own_map.is_some_and(|m| m.get("escape").is_some() || m.get("unescape-if").is_some());
    if has_own {
        if let Some(m) = own_map {
            if let Some(v) = m.get("escape") {
                result.set("escape", v);
            }
            if let Some(v) = m.get("unescape-if") {
                result.set("unescape-if", v);
            }
        }
        return result;
    }
    match node.parent() {
        Some(parent) if parent.element_id().is_some() => eval_escape(parent, pool),
        _ => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itstool_dom::Document;

    #[test]
    fn build_translate_requires_selector_and_translate() {
        let doc = roxmltree::Document::parse(r#"<translateRule selector="//p" translate="yes"/>"#).unwrap();
        let rule = Rule::build(doc.root_element()).unwrap();
        match rule {
            Rule::Translate(common) => {
                assert_eq!(common.selector, "//p");
                assert_eq!(common.defaults.get("translate"), Some("yes"));
            }
            other => panic!("expected Translate, got {other:?}"),
        }
    }

    #[test]
    fn build_translate_rejects_unrecognized_value() {
        let doc = roxmltree::Document::parse(r#"<translateRule selector="//p" translate="maybe"/>"#).unwrap();
        assert!(Rule::build(doc.root_element()).is_err());
    }

    #[test]
    fn build_translate_missing_attribute_is_an_error() {
        let doc = roxmltree::Document::parse(r#"<translateRule selector="//p"/>"#).unwrap();
        assert!(matches!(
            Rule::build(doc.root_element()),
            Err(RuleBuildError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn build_loc_note_prefers_inline_child_and_normalizes_it() {
        let doc = roxmltree::Document::parse(
            r#"<locNoteRule selector="//p" locNoteType="description"><locNote>  some   note  </locNote></locNoteRule>"#,
        )
        .unwrap();
        let rule = Rule::build(doc.root_element()).unwrap();
        match rule {
            Rule::LocalizationNote(common) => {
                assert_eq!(common.defaults.get("locNote"), Some("some note"));
                assert_eq!(common.defaults.get("locNoteType"), Some("description"));
            }
            other => panic!("expected LocalizationNote, got {other:?}"),
        }
    }

    #[test]
    fn build_loc_note_accepts_pointer_attribute() {
        let doc = roxmltree::Document::parse(
            r#"<locNoteRule selector="//p" locNoteType="description" locNotePointer="//meta/@note"/>"#,
        )
        .unwrap();
        let rule = Rule::build(doc.root_element()).unwrap();
        match rule {
            Rule::LocalizationNote(common) => {
                assert_eq!(common.defaults.get("locNotePointer"), Some("//meta/@note"));
            }
            other => panic!("expected LocalizationNote, got {other:?}"),
        }
    }

    #[test]
    fn build_space_rejects_extension_values_outside_extension_namespace() {
        let doc = roxmltree::Document::parse(r#"<preserveSpaceRule selector="//p" space="trim"/>"#).unwrap();
        assert!(Rule::build(doc.root_element()).is_err());
    }

    #[test]
    fn build_space_accepts_extension_values_in_extension_namespace() {
        let doc = roxmltree::Document::parse(
            r#"<gt:preserveSpaceRule xmlns:gt="https://www.gnu.org/s/gettext/ns/its/extensions/1.0" selector="//p" space="paragraph"/>"#,
        )
        .unwrap();
        let rule = Rule::build(doc.root_element()).unwrap();
        match rule {
            Rule::PreserveSpace(common) => assert_eq!(common.defaults.get("space"), Some("paragraph")),
            other => panic!("expected PreserveSpace, got {other:?}"),
        }
    }

    #[test]
    fn build_escape_rejects_bad_unescape_if() {
        let doc = roxmltree::Document::parse(r#"<escapeRule selector="//p" escape="no" unescape-if="bogus"/>"#).unwrap();
        assert!(Rule::build(doc.root_element()).is_err());
    }

    #[test]
    fn build_unknown_rule_element_is_an_error() {
        let doc = roxmltree::Document::parse(r#"<bogusRule selector="//p"/>"#).unwrap();
        assert!(matches!(
            Rule::build(doc.root_element()),
            Err(RuleBuildError::UnknownRuleElement(_))
        ));
    }

    #[test]
    fn translate_inherits_from_parent_with_default_yes_at_root() {
        let doc = Document::parse(r#"<a><b><c/></b></a>"#).unwrap();
        let mut pool = ValuePool::new();
        let rule = Rule::Translate(RuleCommon {
            selector: "//b".to_string(),
            defaults: {
                let mut m = ValueMap::new();
                m.set("translate", "no");
                m
            },
            namespaces: Vec::new(),
        });
        rule.apply(&doc, &mut pool).unwrap();
        let root = NodeRef::root(&doc);
        let a = root.children().next().unwrap();
        let b = a.children().next().unwrap();
        let c = b.children().next().unwrap();
        assert_eq!(eval_translate(a, &pool).get("translate"), Some("yes"));
        assert_eq!(eval_translate(b, &pool).get("translate"), Some("no"));
        assert_eq!(eval_translate(c, &pool).get("translate"), Some("no"));
    }

    #[test]
    fn local_its_namespaced_attribute_overrides_global_rule() {
        let doc = Document::parse(
            r#"<a xmlns:its="http://www.w3.org/2005/11/its"><b its:translate="no"/></a>"#,
        )
        .unwrap();
        let mut pool = ValuePool::new();
        let rule = Rule::Translate(RuleCommon {
            selector: "//b".to_string(),
            defaults: {
                let mut m = ValueMap::new();
                m.set("translate", "yes");
                m
            },
            namespaces: Vec::new(),
        });
        rule.apply(&doc, &mut pool).unwrap();
        let root = NodeRef::root(&doc);
        let a = root.children().next().unwrap();
        let b = a.children().next().unwrap();
        assert_eq!(eval_translate(b, &pool).get("translate"), Some("no"));
    }

    #[test]
    fn plain_non_namespaced_translate_attribute_is_not_mistaken_for_its_translate() {
        let doc = Document::parse(r#"<a><b translate="no"/></a>"#).unwrap();
        let mut pool = ValuePool::new();
        let rule = Rule::Translate(RuleCommon {
            selector: "//b".to_string(),
            defaults: {
                let mut m = ValueMap::new();
                m.set("translate", "yes");
                m
            },
            namespaces: Vec::new(),
        });
        rule.apply(&doc, &mut pool).unwrap();
        let root = NodeRef::root(&doc);
        let a = root.children().next().unwrap();
        let b = a.children().next().unwrap();
        assert_eq!(eval_translate(b, &pool).get("translate"), Some("yes"));
    }

    #[test]
    fn prefixed_selector_matches_via_registered_namespace_binding() {
        let doc = Document::parse(
            r#"<root xmlns:its="http://www.w3.org/2005/11/its"><its:span>hi</its:span></root>"#,
        )
        .unwrap();
        let mut pool = ValuePool::new();
        let rule = Rule::Translate(RuleCommon {
            selector: "//its:span".to_string(),
            defaults: {
                let mut m = ValueMap::new();
                m.set("translate", "no");
                m
            },
            namespaces: vec![(
                Some("its".to_string()),
                "http://www.w3.org/2005/11/its".to_string(),
            )],
        });
        rule.apply(&doc, &mut pool).unwrap();
        let root = NodeRef::root(&doc);
        let its_root = root.children().next().unwrap();
        let span = its_root.children().next().unwrap();
        assert_eq!(eval_translate(span, &pool).get("translate"), Some("no"));
    }
}
