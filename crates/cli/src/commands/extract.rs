//! `itstool extract`: load a rule set, apply it to a source document, and
//! write every translation unit's msgid to a PO-subset catalog.

use anyhow::{Context, Result};
use itstool_catalog::PoCatalog;
use itstool_core::ruleset::RuleSet;
use itstool_dom::Document;

use crate::args::ExtractArgs;

pub fn run(args: ExtractArgs) -> Result<()> {
    let (mut rule_set, warnings) = RuleSet::load_from_file(&args.rules)
        .with_context(|| format!("loading rules file {}", args.rules.display()))?;
    for warning in &warnings {
        log::warn!("[CLI] {warning}");
    }

    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading source document {}", args.source.display()))?;
    let doc = Document::parse(&source)
        .with_context(|| format!("parsing source document {}", args.source.display()))?;
    rule_set.apply(&doc);

    let source_file = args.source.display().to_string();
    let mut catalog = PoCatalog::new(source_file);
    itstool_core::extractor::extract(&doc, &rule_set, &mut catalog);

    catalog
        .write_to_file(&args.catalog)
        .with_context(|| format!("writing catalog {}", args.catalog.display()))?;
    log::info!(
        "[CLI] extracted {} message(s) to {}",
        catalog.messages().len(),
        args.catalog.display()
    );
    Ok(())
}
