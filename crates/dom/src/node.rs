//! `NodeRef` is the `DataSourceNode` implementation over `Document`, mirroring
//! the `XmlNode` wrapper pattern used for the read-only `roxmltree` tree: a
//! node is either a real arena entry or a synthetic attribute reference
//! (owning element id + attribute index), since attributes in this arena are
//! stored inline on their owning element rather than as addressable nodes.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use itstool_xpath::{DataSourceNode, NodeType, QName};

use crate::document::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Node(&'a Document, NodeId),
    Attribute(&'a Document, NodeId, usize),
}

impl<'a> NodeRef<'a> {
    pub fn root(doc: &'a Document) -> Self {
        NodeRef::Node(doc, doc.root())
    }

    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Node(_, id) => *id,
            NodeRef::Attribute(_, id, _) => *id,
        }
    }

    pub fn doc(&self) -> &'a Document {
        match self {
            NodeRef::Node(doc, _) => doc,
            NodeRef::Attribute(doc, _, _) => doc,
        }
    }

    /// The underlying element node id, for callers (the merger) that need to
    /// go back to `Document`'s mutation API after locating a node via XPath.
    pub fn element_id(&self) -> Option<NodeId> {
        match self {
            NodeRef::Node(doc, id) if doc.is_element(*id) => Some(*id),
            _ => None,
        }
    }
}

impl<'a> PartialEq for NodeRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeRef::Node(_, a), NodeRef::Node(_, b)) => a == b,
            (NodeRef::Attribute(_, pa, ia), NodeRef::Attribute(_, pb, ib)) => pa == pb && ia == ib,
            _ => false,
        }
    }
}
impl<'a> Eq for NodeRef<'a> {}

impl<'a> Hash for NodeRef<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            NodeRef::Node(_, id) => {
                0u8.hash(state);
                id.hash(state);
            }
            NodeRef::Attribute(_, owner, index) => {
                1u8.hash(state);
                owner.hash(state);
                index.hash(state);
            }
        }
    }
}

impl<'a> PartialOrd for NodeRef<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for NodeRef<'a> {
    /// Document order: a node sorts before its own attributes, which sort
    /// before its children (arena ids are allocated depth-first in document
    /// order, so plain id comparison already gives the right order once
    /// attributes are folded in as "just after their owner").
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NodeRef::Node(_, a), NodeRef::Node(_, b)) => a.cmp(b),
            (NodeRef::Attribute(_, oa, ia), NodeRef::Attribute(_, ob, ib)) => {
                oa.cmp(ob).then_with(|| ia.cmp(ib))
            }
            (NodeRef::Node(_, a), NodeRef::Attribute(_, owner, _)) => {
                if a == owner {
                    Ordering::Less
                } else {
                    a.cmp(owner)
                }
            }
            (NodeRef::Attribute(_, owner, _), NodeRef::Node(_, b)) => {
                if owner == b {
                    Ordering::Greater
                } else {
                    owner.cmp(b)
                }
            }
        }
    }
}

impl<'a> DataSourceNode<'a> for NodeRef<'a> {
    fn node_type(&self) -> NodeType {
        match self {
            NodeRef::Attribute(..) => NodeType::Attribute,
            NodeRef::Node(doc, id) => match &doc.record(*id).kind {
                NodeKind::Root => NodeType::Root,
                NodeKind::Element { .. } => NodeType::Element,
                NodeKind::Text(_) | NodeKind::RawText(_) => NodeType::Text,
                NodeKind::Comment(_) => NodeType::Comment,
                NodeKind::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
                NodeKind::EntityReference(_) => NodeType::EntityReference,
            },
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            NodeRef::Attribute(doc, owner, index) => {
                doc.attributes(*owner).get(*index).map(|attr| QName {
                    prefix: attr.name.prefix.as_deref(),
                    local_part: attr.name.local.as_str(),
                    uri: attr.name.uri.as_deref(),
                })
            }
            NodeRef::Node(doc, id) => match &doc.record(*id).kind {
                NodeKind::Element { name, .. } => Some(QName {
                    prefix: name.prefix.as_deref(),
                    local_part: name.local.as_str(),
                    uri: name.uri.as_deref(),
                }),
                NodeKind::ProcessingInstruction { target, .. } => Some(QName {
                    prefix: None,
                    local_part: target.as_str(),
                    uri: None,
                }),
                NodeKind::EntityReference(name) => Some(QName {
                    prefix: None,
                    local_part: name.as_str(),
                    uri: None,
                }),
                _ => None,
            },
        }
    }

    fn string_value(&self) -> String {
        match self {
            NodeRef::Attribute(doc, owner, index) => doc
                .attributes(*owner)
                .get(*index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
            NodeRef::Node(doc, id) => match &doc.record(*id).kind {
                NodeKind::Text(text) | NodeKind::RawText(text) => text.clone(),
                NodeKind::Comment(text) => text.clone(),
                NodeKind::ProcessingInstruction { value, .. } => value.clone(),
                NodeKind::EntityReference(_) => String::new(),
                NodeKind::Root | NodeKind::Element { .. } => {
                    let mut out = String::new();
                    collect_text(doc, *id, &mut out);
                    out
                }
            },
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            NodeRef::Attribute(..) => Box::new(std::iter::empty()),
            NodeRef::Node(doc, id) => {
                let count = doc.attributes(*id).len();
                let doc = *doc;
                let owner = *id;
                Box::new((0..count).map(move |index| NodeRef::Attribute(doc, owner, index)))
            }
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            NodeRef::Attribute(..) => Box::new(std::iter::empty()),
            NodeRef::Node(doc, id) => {
                let doc = *doc;
                Box::new(doc.children(*id).iter().map(move |&child| NodeRef::Node(doc, child)))
            }
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            NodeRef::Attribute(doc, owner, _) => Some(NodeRef::Node(doc, *owner)),
            NodeRef::Node(doc, id) => doc.parent(*id).map(|parent| NodeRef::Node(doc, parent)),
        }
    }
}

fn collect_text(doc: &Document, id: NodeId, out: &mut String) {
    for &child in doc.children(id) {
        match &doc.record(child).kind {
            NodeKind::Text(text) | NodeKind::RawText(text) => out.push_str(text),
            NodeKind::Element { .. } | NodeKind::Root => collect_text(doc, child, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn attribute_nodes_report_correct_name_and_value() {
        let doc = Document::parse(r#"<root><item id="123" status="active">Text</item></root>"#).unwrap();
        let root = NodeRef::root(&doc);
        let item = root.children().next().unwrap().children().next().unwrap();
        let attrs: Vec<_> = item.attributes().collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name().unwrap().local_part, "id");
        assert_eq!(attrs[0].string_value(), "123");
        assert_eq!(attrs[0].parent().unwrap(), item);
    }

    #[test]
    fn element_string_value_concatenates_descendant_text() {
        let doc = Document::parse(r#"<p>Hello <b>World</b>!</p>"#).unwrap();
        let root = NodeRef::root(&doc);
        let p = root.children().next().unwrap();
        assert_eq!(p.string_value(), "Hello World!");
    }

    #[test]
    fn document_order_places_attributes_between_owner_and_children() {
        let doc = Document::parse(r#"<p id="x">Hello</p>"#).unwrap();
        let root = NodeRef::root(&doc);
        let p = root.children().next().unwrap();
        let attr = p.attributes().next().unwrap();
        let text = p.children().next().unwrap();
        assert!(p < attr);
        assert!(attr < text);
    }
}
