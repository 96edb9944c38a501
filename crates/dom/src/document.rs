//! The arena-backed mutable XML tree.
//!
//! `roxmltree` is used only to parse the initial bytes into this arena; once
//! ingested, the `roxmltree::Document` is dropped and all further reading,
//! mutation, and serialization happens against `Document` itself. This is
//! what lets the merger (C7) clear children, set attributes, and insert
//! siblings in place while extraction and rule evaluation read the very same
//! structure through `itstool-xpath`'s `DataSourceNode`.

use crate::error::DomError;

/// An index into a `Document`'s node arena. Stable for the lifetime of the
/// `Document`; never reused even after a node is detached.
pub type NodeId = usize;

pub const ROOT_ID: NodeId = 0;

/// A qualified name that owns its strings, as opposed to `itstool_xpath::QName`
/// which borrows. `roxmltree` resolves every name against the in-scope
/// namespace bindings regardless of prefix, and `uri` carries that resolution
/// forward; `prefix` is kept only as the literal lexeme for `xml:`-prefixed
/// names (the one prefix `roxmltree` exposes directly) and is `None`
/// otherwise. Callers that need namespace identity — `its:translate` vs. a
/// bare `translate` — must compare `uri`, never reconstruct it from `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnedQName {
    pub prefix: Option<String>,
    pub local: String,
    pub uri: Option<String>,
}

impl OwnedQName {
    pub fn unprefixed(local: impl Into<String>) -> Self {
        OwnedQName {
            prefix: None,
            local: local.into(),
            uri: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: OwnedQName,
    pub value: String,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Root,
    Element {
        name: OwnedQName,
        attributes: Vec<Attribute>,
        /// Namespace bindings in scope at this element (prefix, uri); not
        /// separated into declared-here vs. inherited, since nothing in this
        /// tool resolves selector prefixes against document namespaces.
        namespaces: Vec<(Option<String>, String)>,
    },
    Text(String),
    /// Text installed by the merger's middle-ground escape path (§4.7 step
    /// 6): the string is already escaped for serialization and is written
    /// verbatim, bypassing the normal writer's `&`/`<`/`>` escaping that
    /// `Text` gets.
    RawText(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: String,
    },
    /// An unexpanded general entity reference, e.g. `&custom;`. `roxmltree`
    /// has no DTD support and will never produce one of these from real
    /// input; the variant exists so the text collector's entity-passthrough
    /// path has something to collect when a document is built by hand (tests,
    /// or a future DTD-aware ingestion path).
    EntityReference(String),
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// 1-based (line, column) of the node's start in the source text, used
    /// only for diagnostics (the extractor's `Position` in the message
    /// catalog interface, spec §6). `None` for the synthetic root.
    pub(crate) position: Option<(usize, usize)>,
}

/// A parsed, mutable XML document.
#[derive(Debug)]
pub struct Document {
    pub(crate) nodes: Vec<NodeRecord>,
}

impl Document {
    pub fn parse(xml: &str) -> Result<Document, DomError> {
        let rox = roxmltree::Document::parse(xml)?;
        let mut doc = Document {
            nodes: vec![NodeRecord {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
                position: None,
            }],
        };
        let children = doc.convert_children(ROOT_ID, rox.root(), &rox);
        doc.nodes[ROOT_ID].children = children;
        Ok(doc)
    }

    fn convert_children(
        &mut self,
        parent_id: NodeId,
        rox_node: roxmltree::Node,
        rox_doc: &roxmltree::Document,
    ) -> Vec<NodeId> {
        rox_node
            .children()
            .filter_map(|child| self.convert_node(parent_id, child, rox_doc))
            .collect()
    }

    fn convert_node(
        &mut self,
        parent_id: NodeId,
        n: roxmltree::Node,
        rox_doc: &roxmltree::Document,
    ) -> Option<NodeId> {
        let position = {
            let pos = rox_doc.text_pos_at(n.range().start);
            Some((pos.row as usize, pos.col as usize))
        };
        let kind = if n.is_element() {
            let tag = n.tag_name();
            let name = OwnedQName {
                prefix: None,
                local: tag.name().to_string(),
                uri: tag.namespace().map(str::to_string),
            };
            let attributes = n
                .attributes()
                .map(|a| Attribute {
                    name: attribute_qname(&a),
                    value: a.value().to_string(),
                })
                .collect();
            let namespaces = n
                .namespaces()
                .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
                .collect();
            NodeKind::Element {
                name,
                attributes,
                namespaces,
            }
        } else if n.is_text() {
            NodeKind::Text(n.text().unwrap_or("").to_string())
        } else if n.is_comment() {
            NodeKind::Comment(n.text().unwrap_or("").to_string())
        } else if n.is_pi() {
            let pi = n.pi()?;
            NodeKind::ProcessingInstruction {
                target: pi.target.to_string(),
                value: pi.value.unwrap_or("").to_string(),
            }
        } else {
            return None;
        };

        let is_element = n.is_element();
        let id = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: Some(parent_id),
            children: Vec::new(),
            position,
        });
        if is_element {
            let children = self.convert_children(id, n, rox_doc);
            self.nodes[id].children = children;
        }
        Some(id)
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    pub(crate) fn record(&self, id: NodeId) -> &NodeRecord {
        &self.nodes[id]
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Element { .. })
    }

    pub fn element_name(&self, id: NodeId) -> Option<&OwnedQName> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn namespaces(&self, id: NodeId) -> &[(Option<String>, String)] {
        match &self.nodes[id].kind {
            NodeKind::Element { namespaces, .. } => namespaces,
            _ => &[],
        }
    }

    pub fn attribute_value(&self, id: NodeId, local_name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.local == local_name)
            .map(|a| a.value.as_str())
    }

    /// Like `attribute_value`, but requires the attribute to be resolved to
    /// `ns` rather than matching on local name alone — the only correct way
    /// to read an ITS/extension-namespace attribute such as `its:translate`,
    /// since a same-named, differently- or un-namespaced attribute must not
    /// match.
    pub fn attribute_value_ns(&self, id: NodeId, ns: &str, local_name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.local == local_name && a.name.uri.as_deref() == Some(ns))
            .map(|a| a.value.as_str())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// 1-based (line, column) of `id`'s start in the originally parsed source
    /// text, or `None` for the root or a node created by the merger (C7).
    pub fn position(&self, id: NodeId) -> Option<(usize, usize)> {
        self.nodes[id].position
    }

    // --- Mutation, used by the merger (C7) ---

    /// Sets an attribute, replacing any existing attribute of the same local
    /// name (matching this crate's "no duplicate names" convention for
    /// name/value maps).
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: OwnedQName,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let value = value.into();
        match &mut self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => {
                if let Some(existing) = attributes.iter_mut().find(|a| a.name == name) {
                    existing.value = value;
                } else {
                    attributes.push(Attribute { name, value });
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Removes an attribute by local name, if present. Used by the
    /// duplicate-as-sibling merge mode to drop `id` from the shallow copy
    /// (§4.7), since a duplicated element must not carry its original's id.
    pub fn remove_attribute(&mut self, id: NodeId, local_name: &str) -> Result<(), DomError> {
        match &mut self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => {
                attributes.retain(|a| a.name.local != local_name);
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn set_xml_lang(&mut self, id: NodeId, lang: &str) -> Result<(), DomError> {
        self.set_attribute(
            id,
            OwnedQName {
                prefix: Some("xml".to_string()),
                local: "lang".to_string(),
                uri: Some("http://www.w3.org/XML/1998/namespace".to_string()),
            },
            lang,
        )
    }

    /// Detaches all children of `id`. The detached subtrees remain in the
    /// arena (unreachable from the root) rather than being compacted out;
    /// this tool processes one document per run, so the memory is reclaimed
    /// with the process and never revisited via `children`/`descendants`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), DomError> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        self.nodes[id].children.clear();
        Ok(())
    }

    pub fn append_text_child(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId, DomError> {
        self.append_child(parent, NodeKind::Text(text.into()))
    }

    /// Appends a pre-escaped text node (see `NodeKind::RawText`).
    pub fn append_raw_text_child(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId, DomError> {
        self.append_child(parent, NodeKind::RawText(text.into()))
    }

    pub fn append_entity_ref_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, DomError> {
        self.append_child(parent, NodeKind::EntityReference(name.into()))
    }

    pub fn append_element_child(&mut self, parent: NodeId, name: OwnedQName) -> Result<NodeId, DomError> {
        self.append_child(
            parent,
            NodeKind::Element {
                name,
                attributes: Vec::new(),
                namespaces: Vec::new(),
            },
        )
    }

    fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, DomError> {
        if !self.is_element(parent) && parent != ROOT_ID {
            return Err(DomError::NotAnElement(parent));
        }
        let id = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            position: self.nodes[parent].position,
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Deep-clones the subtree rooted at `id` into fresh arena nodes (not
    /// attached to any parent yet) and returns the id of the clone's root.
    /// Used by the duplicate-as-sibling merge mode, which must keep the
    /// original translation unit untouched while inserting a translated copy.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id].kind.clone();
        let children = self.nodes[id].children.clone();
        let position = self.nodes[id].position;
        let new_id = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
            position,
        });
        let new_children: Vec<NodeId> = children
            .into_iter()
            .map(|child| {
                let new_child = self.clone_subtree(child);
                self.nodes[new_child].parent = Some(new_id);
                new_child
            })
            .collect();
        self.nodes[new_id].children = new_children;
        new_id
    }

    /// Inserts `new_node` (typically the result of `clone_subtree`) as a
    /// sibling immediately after `after`, reparenting it under `after`'s
    /// parent. Panics if `after` is the root, which has no siblings.
    pub fn insert_sibling_after(&mut self, after: NodeId, new_node: NodeId) -> Result<(), DomError> {
        let parent = self.nodes[after].parent.ok_or(DomError::NotAnElement(after))?;
        self.nodes[new_node].parent = Some(parent);
        let siblings = &mut self.nodes[parent].children;
        let position = siblings
            .iter()
            .position(|&sibling| sibling == after)
            .ok_or(DomError::UnknownNode(after))?;
        siblings.insert(position + 1, new_node);
        Ok(())
    }
}

fn attribute_qname(attr: &roxmltree::Attribute) -> OwnedQName {
    let uri = attr.namespace().map(str::to_string);
    let prefix = if uri.as_deref() == Some("http://www.w3.org/XML/1998/namespace") {
        Some("xml".to_string())
    } else {
        None
    };
    OwnedQName {
        prefix,
        local: attr.name().to_string(),
        uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elements_attributes_and_text() {
        let doc = Document::parse(r#"<root><item id="1">Hello</item></root>"#).unwrap();
        let root_children = doc.children(doc.root());
        assert_eq!(root_children.len(), 1);
        let root_el = root_children[0];
        assert_eq!(doc.element_name(root_el).unwrap().local, "root");
        let item = doc.children(root_el)[0];
        assert_eq!(doc.element_name(item).unwrap().local, "item");
        assert_eq!(doc.attribute_value(item, "id"), Some("1"));
        let text = doc.children(item)[0];
        assert_eq!(doc.record(text).children.len(), 0);
    }

    #[test]
    fn clear_children_then_append_replaces_content() {
        let mut doc = Document::parse(r#"<p>old text</p>"#).unwrap();
        let p = doc.children(doc.root())[0];
        doc.clear_children(p).unwrap();
        assert!(doc.children(p).is_empty());
        doc.append_text_child(p, "new text").unwrap();
        assert_eq!(doc.children(p).len(), 1);
    }

    #[test]
    fn clone_subtree_and_insert_sibling_duplicates_content() {
        let mut doc = Document::parse(r#"<root><p>Hello</p></root>"#).unwrap();
        let root = doc.root();
        let p = doc.children(root)[0];
        let clone = doc.clone_subtree(p);
        doc.insert_sibling_after(p, clone).unwrap();
        let root_el = doc.children(root)[0];
        let siblings = doc.children(root_el);
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0], p);
        assert_eq!(siblings[1], clone);
    }

    #[test]
    fn set_xml_lang_adds_or_replaces_attribute() {
        let mut doc = Document::parse(r#"<p>Hello</p>"#).unwrap();
        let p = doc.children(doc.root())[0];
        doc.set_xml_lang(p, "fr").unwrap();
        assert_eq!(doc.attribute_value(p, "lang"), Some("fr"));
        doc.set_xml_lang(p, "de").unwrap();
        assert_eq!(doc.attribute_value(p, "lang"), Some("de"));
        assert_eq!(doc.attributes(p).len(), 1);
    }
}
