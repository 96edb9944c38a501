//! End-to-end extract-then-merge round trips for the canonical scenarios.
//! Unlike the colocated unit tests, these exercise `extract` and `merge`
//! together through a single in-memory catalog, the way the CLI wires them.

use std::collections::HashMap;

use itstool_core::extractor::{Position, Sink, extract};
use itstool_core::merger::{Catalog, MergeMode, merge};
use itstool_core::ruleset::RuleSet;
use itstool_core::text::WhitespaceMode;
use itstool_dom::{Document, serialize};

#[derive(Default)]
struct TestCatalog {
    messages: HashMap<(Option<String>, String), String>,
}

impl TestCatalog {
    fn set_translation(&mut self, msgctxt: Option<&str>, msgid: &str, msgstr: &str) {
        self.messages
            .insert((msgctxt.map(str::to_string), msgid.to_string()), msgstr.to_string());
    }
}

impl Sink for TestCatalog {
    fn emit(
        &mut self,
        msgctxt: Option<&str>,
        msgid: &str,
        _position: Position,
        _comment: Option<&str>,
        _marker: &str,
        _whitespace_mode: WhitespaceMode,
    ) {
        self.messages
            .entry((msgctxt.map(str::to_string), msgid.to_string()))
            .or_default();
    }
}

impl Catalog for TestCatalog {
    fn lookup(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&str> {
        self.messages
            .get(&(msgctxt.map(str::to_string), msgid.to_string()))
            .map(String::as_str)
    }
}

fn rules(xml: &str) -> RuleSet {
    RuleSet::load_from_str(xml).unwrap().0
}

#[test]
fn s1_inline_markup_extracts_and_merges_with_unescape_if() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//p" translate="yes"/>
            <withinTextRule selector="//b" withinText="yes"/>
            <escapeRule selector="//p" escape="no" unescape-if="xhtml"/>
        </rules>"#,
    );
    let doc = Document::parse("<p>Hello, <b>world</b>!</p>").unwrap();
    let mut catalog = TestCatalog::default();
    extract(&doc, &rule_set, &mut catalog);

    let mut doc = doc;
    catalog.set_translation(None, "Hello, <b>world</b>!", "¡Hola, <b>mundo</b>!");
    merge(&mut doc, &rule_set, &catalog, "es", MergeMode::ReplaceInPlace);

    let xml = serialize(&doc).unwrap();
    assert!(xml.contains(r#"xml:lang="es""#));
    assert!(xml.contains("¡Hola, <b>mundo</b>!"));
}

#[test]
fn s2_preserved_whitespace_round_trips_byte_for_byte() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//q" translate="yes"/>
        </rules>"#,
    );
    let doc = Document::parse(r#"<q xml:space="preserve">  a  b  </q>"#).unwrap();
    let mut catalog = TestCatalog::default();
    extract(&doc, &rule_set, &mut catalog);
    assert!(catalog.messages.contains_key(&(None, "  a  b  ".to_string())));

    let mut doc = doc;
    catalog.set_translation(None, "  a  b  ", "  x  y  ");
    merge(&mut doc, &rule_set, &catalog, "fr", MergeMode::ReplaceInPlace);

    let xml = serialize(&doc).unwrap();
    assert!(xml.contains("  x  y  "));
}

#[test]
fn s3_numeric_character_reference_text_merges_under_middle_ground() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//x" translate="yes"/>
        </rules>"#,
    );
    let doc = Document::parse("<x>&#xa9; 2024</x>").unwrap();
    let mut catalog = TestCatalog::default();
    extract(&doc, &rule_set, &mut catalog);

    let (msgid, _) = catalog.messages.keys().next().unwrap().clone();
    let mut doc = doc;
    catalog.set_translation(None, &msgid, "&#xa9; 2024");
    merge(&mut doc, &rule_set, &catalog, "fr", MergeMode::ReplaceInPlace);

    let xml = serialize(&doc).unwrap();
    assert!(xml.contains("&amp;#xa9; 2024"));
}

#[test]
fn s4_attribute_unit_extracts_with_marker_and_merges_as_duplicate() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//a/@t" translate="yes"/>
        </rules>"#,
    );
    let doc = Document::parse(r#"<root><a t="x"/></root>"#).unwrap();
    let mut catalog = TestCatalog::default();
    extract(&doc, &rule_set, &mut catalog);
    assert!(catalog.messages.contains_key(&(None, "x".to_string())));

    let mut doc = doc;
    catalog.set_translation(None, "x", "y");
    merge(&mut doc, &rule_set, &catalog, "fr", MergeMode::DuplicateAsSibling);

    let root = doc.children(doc.root())[0];
    let siblings = doc.children(root);
    assert_eq!(siblings.len(), 2);
    assert_eq!(doc.attribute_value(siblings[0], "t"), Some("x"));
    assert_eq!(doc.attribute_value(siblings[1], "t"), Some("y"));
    assert_eq!(doc.attribute_value(siblings[1], "lang"), Some("fr"));
}

#[test]
fn s5_loc_note_rule_wins_over_loc_note_pointer() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//p" translate="yes"/>
            <locNoteRule selector="//p" locNoteType="description" locNotePointer="//meta/@note"/>
            <locNoteRule selector="//p" locNoteType="description"><locNote>inline wins</locNote></locNoteRule>
        </rules>"#,
    );
    let doc = Document::parse(r#"<root><meta note="from pointer"/><p>Hello</p></root>"#).unwrap();

    struct CommentCapture {
        comment: Option<String>,
    }
    impl Sink for CommentCapture {
        fn emit(
            &mut self,
            _msgctxt: Option<&str>,
            _msgid: &str,
            _position: Position,
            comment: Option<&str>,
            _marker: &str,
            _whitespace_mode: WhitespaceMode,
        ) {
            self.comment = comment.map(str::to_string);
        }
    }
    let mut capture = CommentCapture { comment: None };
    extract(&doc, &rule_set, &mut capture);
    assert_eq!(capture.comment.as_deref(), Some("inline wins"));
}

#[test]
fn s6_non_translatable_outer_element_still_yields_inner_units() {
    let rule_set = rules(
        r#"<rules xmlns="http://www.w3.org/2005/11/its">
            <translateRule selector="//outer" translate="yes"/>
            <translateRule selector="//inner" translate="yes"/>
            <translateRule selector="//skip" translate="no"/>
            <withinTextRule selector="//skip" withinText="no"/>
        </rules>"#,
    );
    let doc = Document::parse("<outer><skip><inner>hello</inner></skip></outer>").unwrap();
    let mut catalog = TestCatalog::default();
    extract(&doc, &rule_set, &mut catalog);

    assert!(!catalog.messages.contains_key(&(None, String::new())));
    assert!(catalog.messages.keys().any(|(_, id)| id == "hello"));
    assert!(catalog.messages.len() == 1, "only the inner unit should be extracted, got {:?}", catalog.messages);
}
