//! C3: the rule set. An ordered collection of rules plus one owned
//! `ValuePool`, a rule-file parser, and the rule-application driver (§4.3).

use std::path::Path;

use itstool_dom::{Document, NodeRef};

use crate::error::ItsError;
use crate::rule::Rule;
use crate::value::{ValueMap, ValuePool};

/// The namespace the rules-file root element (`<rules>`) must be in.
pub const ITS_NS: &str = "http://www.w3.org/2005/11/its";

/// A per-rule diagnostic accumulated while loading a `<rules>` document.
/// Per spec §7 ("Rule-file errors... Treated as warnings per rule; the
/// offending rule is skipped"), a bad rule never aborts the whole load —
/// but it is not silently discarded either, so a caller (the CLI) can
/// surface it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetWarning {
    pub message: String,
}

impl std::fmt::Display for RuleSetWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Ordered rules plus the `ValuePool` they write into. Rule order is
/// preserved and is the application/evaluation order (§3 invariant).
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    pool: ValuePool,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }

    /// Parses `xml` as an ITS `<rules>` document and builds a `RuleSet` from
    /// its element children, dispatching each to the matching constructor in
    /// `rule.rs` by local name. A rule whose constructor rejects its input is
    /// skipped with a warning (§7); a root element that is not `<rules>` in
    /// the ITS namespace is fatal, since nothing could be loaded at all.
    pub fn load_from_str(xml: &str) -> Result<(RuleSet, Vec<RuleSetWarning>), ItsError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "rules" || root.tag_name().namespace() != Some(ITS_NS) {
            return Err(ItsError::RulesDocument(format!(
                "root element must be <rules> in the ITS namespace ({ITS_NS}), found <{}>",
                root.tag_name().name()
            )));
        }

        let mut rules = Vec::new();
        let mut warnings = Vec::new();
        for child in root.children().filter(|n| n.is_element()) {
            match Rule::build(child) {
                Ok(rule) => {
                    log::debug!("[RULES] loaded {} rule: {}", rule_kind(&rule), rule.common().selector);
                    rules.push(rule);
                }
                Err(e) => {
                    log::warn!("[RULES] skipping rule: {e}");
                    warnings.push(RuleSetWarning { message: e.to_string() });
                }
            }
        }
        Ok((
            RuleSet {
                rules,
                pool: ValuePool::new(),
            },
            warnings,
        ))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<(RuleSet, Vec<RuleSetWarning>), ItsError> {
        let xml = std::fs::read_to_string(path)?;
        Self::load_from_str(&xml)
    }

    /// Runs each rule's applier against `document` in insertion order (§4.3).
    /// A single rule's XPath failing (unparseable selector, evaluation
    /// error) is a warning per §7: that rule contributes nothing, but the
    /// rest of the set still applies.
    pub fn apply(&mut self, document: &Document) {
        self.pool.reset();
        for rule in &self.rules {
            if let Err(e) = rule.apply(document, &mut self.pool) {
                log::warn!("[RULES] rule '{}' failed to apply: {e}", rule.common().selector);
            }
        }
    }

    /// Merges every rule's evaluator result for `node`, in insertion order.
    /// Each data category's evaluator only ever sets the names belonging to
    /// its own category, so merging across all six is equivalent to running
    /// only the matching category's evaluators, but avoids re-dispatching by
    /// category at every call site (§4.3: "the 'last' rule of a given data
    /// category that writes a name wins, via ValueMap.merge").
    pub fn eval(&self, node: NodeRef) -> ValueMap {
        let mut result = ValueMap::new();
        for rule in &self.rules {
            result.merge(&rule.eval(node, &self.pool));
        }
        result
    }
}

fn rule_kind(rule: &Rule) -> &'static str {
    match rule {
        Rule::Translate(_) => "translate",
        Rule::LocalizationNote(_) => "locNote",
        Rule::ElementWithinText(_) => "withinText",
        Rule::PreserveSpace(_) => "preserveSpace",
        Rule::Context(_) => "context",
        Rule::Escape(_) => "escape",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_XML: &str = r#"<rules xmlns="http://www.w3.org/2005/11/its">
        <translateRule selector="//p" translate="yes"/>
        <withinTextRule selector="//b" withinText="yes"/>
        <bogusRule selector="//x"/>
    </rules>"#;

    #[test]
    fn load_from_str_parses_rules_and_warns_on_unknown_elements() {
        let (rule_set, warnings) = RuleSet::load_from_str(RULES_XML).unwrap();
        assert_eq!(rule_set.rules().len(), 2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn load_from_str_rejects_wrong_root_element() {
        let result = RuleSet::load_from_str(r#"<notRules xmlns="http://www.w3.org/2005/11/its"/>"#);
        assert!(result.is_err());
    }

    #[test]
    fn apply_and_eval_roundtrip_translate_rule() {
        let (mut rule_set, _) = RuleSet::load_from_str(RULES_XML).unwrap();
        let doc = Document::parse("<p>Hello, <b>world</b>!</p>").unwrap();
        rule_set.apply(&doc);
        let root = NodeRef::root(&doc);
        let p = root.children().next().unwrap();
        let b = p.children().find(|c| c.name().is_some()).unwrap();
        assert_eq!(rule_set.eval(p).get("translate"), Some("yes"));
        assert_eq!(rule_set.eval(b).get("withinText"), Some("yes"));
    }

    #[test]
    fn apply_is_deterministic_across_repeated_calls() {
        let (mut rule_set, _) = RuleSet::load_from_str(RULES_XML).unwrap();
        let doc = Document::parse("<p>Hello, <b>world</b>!</p>").unwrap();
        rule_set.apply(&doc);
        let first = rule_set.eval(NodeRef::root(&doc).children().next().unwrap());
        rule_set.apply(&doc);
        let second = rule_set.eval(NodeRef::root(&doc).children().next().unwrap());
        assert_eq!(first, second);
    }
}
