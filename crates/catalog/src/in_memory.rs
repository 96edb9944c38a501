//! A `Vec<Message>`-backed catalog: the extractor's default sink, and (once
//! populated with `msgstr`s, e.g. by loading a PO file) the merger's lookup
//! source. Neither a `msgfmt`/`msgmerge` reimplementation nor a full gettext
//! PO parser — see `po.rs` for the minimal subset this crate reads/writes.

use itstool_core::extractor::{Position, Sink};
use itstool_core::merger::Catalog as MergeCatalog;
use itstool_core::text::WhitespaceMode;

use crate::message::Message;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    messages: Vec<Message>,
    /// The source file name recorded on every message emitted into this
    /// catalog, used for `#:` reference comments when writing PO (the
    /// extractor itself only knows line/column, not a file name — §6's
    /// `emit(..., file, line, ...)` signature names a parameter the core
    /// does not otherwise need to track across a whole document).
    source_file: String,
}

impl InMemoryCatalog {
    pub fn new(source_file: impl Into<String>) -> Self {
        InMemoryCatalog {
            messages: Vec::new(),
            source_file: source_file.into(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Used when loading a translated PO file into a catalog that will back
    /// a merge pass: the loaded entries already have `msgstr` populated.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl Sink for InMemoryCatalog {
    fn emit(
        &mut self,
        msgctxt: Option<&str>,
        msgid: &str,
        position: Position,
        comment: Option<&str>,
        marker: &str,
        _whitespace_mode: WhitespaceMode,
    ) {
        self.messages.push(Message::new(
            msgctxt.map(str::to_string),
            msgid.to_string(),
            position,
            comment.map(str::to_string),
            marker.to_string(),
        ));
    }
}

impl MergeCatalog for InMemoryCatalog {
    fn lookup(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.msgctxt.as_deref() == msgctxt && m.msgid == msgid && !m.msgstr.is_empty())
            .map(|m| m.msgstr.as_str())
    }
}
