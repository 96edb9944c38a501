//! `PoCatalog`: an `InMemoryCatalog` that loads from and saves to the
//! PO-subset format in `po.rs`. This is the concrete type the CLI hands to
//! `extract`/`merge`.

use std::path::Path;

use itstool_core::extractor::{Position, Sink};
use itstool_core::merger::Catalog as MergeCatalog;
use itstool_core::text::WhitespaceMode;

use crate::error::CatalogError;
use crate::in_memory::InMemoryCatalog;
use crate::message::Message;
use crate::po;

#[derive(Debug, Clone, Default)]
pub struct PoCatalog {
    inner: InMemoryCatalog,
}

impl PoCatalog {
    pub fn new(source_file: impl Into<String>) -> Self {
        PoCatalog {
            inner: InMemoryCatalog::new(source_file),
        }
    }

    /// Loads a PO-subset file, e.g. a file of translator-supplied `msgstr`s
    /// to back a merge pass.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let messages = po::parse_file(path)?;
        let mut catalog = InMemoryCatalog::new("");
        for message in messages {
            catalog.push(message);
        }
        Ok(PoCatalog { inner: catalog })
    }

    pub fn messages(&self) -> &[Message] {
        self.inner.messages()
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        po::write_to_file(self.inner.messages(), path)
    }

    pub fn write_to_string(&self) -> String {
        po::write(self.inner.messages())
    }
}

impl Sink for PoCatalog {
    fn emit(
        &mut self,
        msgctxt: Option<&str>,
        msgid: &str,
        position: Position,
        comment: Option<&str>,
        marker: &str,
        whitespace_mode: WhitespaceMode,
    ) {
        self.inner.emit(msgctxt, msgid, position, comment, marker, whitespace_mode);
    }
}

impl MergeCatalog for PoCatalog {
    fn lookup(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&str> {
        self.inner.lookup(msgctxt, msgid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_catalog_writes_and_reloads_round_trip() {
        let mut catalog = PoCatalog::new("doc.xml");
        catalog.emit(
            None,
            "Hello",
            Position { line: 1, column: 1 },
            Some("greeting"),
            "root/p",
            WhitespaceMode::Normalize,
        );
        let text = catalog.write_to_string();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.po");
        std::fs::write(&path, &text).unwrap();
        let reloaded = PoCatalog::load_file(&path).unwrap();
        assert_eq!(reloaded.messages().len(), 1);
        assert_eq!(reloaded.messages()[0].msgid, "Hello");
    }
}
