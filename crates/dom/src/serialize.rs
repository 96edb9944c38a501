//! Serializes a `Document` back to XML text with `quick-xml`, used after the
//! merger has mutated the arena in place.

use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Document, NodeId, NodeKind};
use crate::error::DomError;

pub fn serialize(doc: &Document) -> Result<String, DomError> {
    let mut writer = Writer::new(Vec::new());
    for &child in doc.children(doc.root()) {
        write_node(&mut writer, doc, child)?;
    }
    let bytes = writer.into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_node<W: std::io::Write>(
    writer: &mut Writer<W>,
    doc: &Document,
    id: NodeId,
) -> Result<(), DomError> {
    match &doc.record(id).kind {
        NodeKind::Root => {
            for &child in doc.children(id) {
                write_node(writer, doc, child)?;
            }
        }
        NodeKind::Element { name, attributes, .. } => {
            let tag = qualified(name);
            let mut start = BytesStart::new(tag.clone());
            for attr in attributes {
                start.push_attribute((qualified(&attr.name).as_str(), attr.value.as_str()));
            }
            let children = doc.children(id);
            if children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for &child in children {
                    write_node(writer, doc, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
        }
        NodeKind::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        NodeKind::RawText(text) => {
            writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?;
        }
        NodeKind::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::new(text)))?;
        }
        NodeKind::ProcessingInstruction { target, value } => {
            let content = if value.is_empty() {
                target.clone()
            } else {
                format!("{target} {value}")
            };
            writer.write_event(Event::PI(BytesPI::new(content)))?;
        }
        NodeKind::EntityReference(name) => {
            writer.write_event(Event::Text(BytesText::from_escaped(format!("&{name};"))))?;
        }
    }
    Ok(())
}

fn qualified(name: &crate::document::OwnedQName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.clone(),
    }
}
