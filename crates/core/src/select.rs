//! Thin glue between the rule/engine layer and `itstool-xpath`: parses and
//! evaluates a selector string against a document, re-registering whatever
//! namespace bindings were in scope at the rule element's source position
//! (spec §4.3) on the evaluation context.

use std::collections::HashMap;

use itstool_dom::{Document, NodeRef};
use itstool_xpath::{EvaluationContext, FunctionRegistry, XPathValue, evaluate, parse_expression};

use crate::error::ItsError;

fn namespace_map(namespaces: &[(Option<String>, String)]) -> HashMap<String, String> {
    namespaces
        .iter()
        .filter_map(|(prefix, uri)| prefix.as_ref().map(|p| (p.clone(), uri.clone())))
        .collect()
}

/// Evaluates `selector` with `context` as both the XPath context node and
/// starting point for relative paths; `root` is always the document root.
/// `namespaces` are the prefix bindings captured at the rule element's
/// source position; an unprefixed selector step needs none of them.
pub fn select<'a>(
    doc: &'a Document,
    selector: &str,
    context: NodeRef<'a>,
    namespaces: &[(Option<String>, String)],
) -> Result<Vec<NodeRef<'a>>, ItsError> {
    let expr = parse_expression(selector).map_err(|e| ItsError::XPath {
        selector: selector.to_string(),
        source: e,
    })?;
    let functions = FunctionRegistry::default();
    let variables = HashMap::new();
    let key_indexes = HashMap::new();
    let namespaces = namespace_map(namespaces);
    let root = NodeRef::root(doc);
    let e_ctx = EvaluationContext::new(
        context, root, &functions, 1, 1, &variables, &key_indexes, false, &namespaces,
    );
    match evaluate(&expr, &e_ctx).map_err(|e| ItsError::XPath {
        selector: selector.to_string(),
        source: e,
    })? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Ok(match other.to_bool() {
            true => vec![context],
            false => vec![],
        }),
    }
}

/// Convenience: evaluates a selector from the document root, the way rule
/// appliers do ("bind to the document").
pub fn select_from_root<'a>(
    doc: &'a Document,
    selector: &str,
    namespaces: &[(Option<String>, String)],
) -> Result<Vec<NodeRef<'a>>, ItsError> {
    select(doc, selector, NodeRef::root(doc), namespaces)
}
