//! The ITS-driven XML translation engine.
//!
//! This crate is THE CORE of the workspace: the value store (C1), the rule
//! model (C2), the rule set (C3), the text collector (C4), the
//! translatable-node locator (C5), the extractor (C6), the merger (C7), and
//! the micro-XML/HTML validator-parser (C8). It depends on `itstool-xpath`
//! for selector evaluation and `itstool-dom` for the document tree, and
//! exposes `Sink`/`Catalog` traits that `itstool-catalog` implements.

pub mod error;
pub mod extractor;
pub mod locator;
pub mod merger;
pub mod microxml;
pub mod rule;
pub mod ruleset;
pub mod select;
pub mod text;
pub mod unit;
pub mod value;

pub use error::ItsError;
pub use extractor::{Position, Sink, extract};
pub use locator::{extract_units, is_translation_unit, locate_all};
pub use merger::{Catalog, MergeMode, merge, middle_ground_escape};
pub use rule::{GETTEXT_EXTENSION_NS, Rule, RuleCommon};
pub use ruleset::{ITS_NS, RuleSet, RuleSetWarning};
pub use text::WhitespaceMode;
pub use unit::{UnitValues, compute_unit_values};
pub use value::{NodeKey, ValueMap, ValuePool};
