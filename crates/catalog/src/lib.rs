//! The external collaborator boundary spec §1/§6 place out of scope beyond
//! two callback interfaces: the message-catalog file format, `msgfmt`,
//! `msgmerge`, `xgettext`, format-string validators, charset canonicalization,
//! and source-language extractors all stay unimplemented. This crate supplies
//! just enough of a concrete catalog to exercise the core end-to-end and
//! back the CLI: the `Message` boundary type, the `Sink`/`Catalog` traits
//! (re-exported from `itstool-core`), an in-memory catalog, and a minimal
//! PO-subset reader/writer.

pub mod error;
pub mod in_memory;
pub mod message;
pub mod po;
pub mod po_catalog;

pub use error::CatalogError;
pub use in_memory::InMemoryCatalog;
pub use itstool_core::merger::Catalog;
pub use itstool_core::extractor::Sink;
pub use message::Message;
pub use po_catalog::PoCatalog;
