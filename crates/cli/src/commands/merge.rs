//! `itstool merge`: load a rule set and a translated catalog, then install
//! translations back into the source document and write the result.

use anyhow::{Context, Result};
use itstool_catalog::PoCatalog;
use itstool_core::merger::{self, MergeMode};
use itstool_core::ruleset::RuleSet;
use itstool_dom::Document;

use crate::args::{MergeArgs, MergeModeArg};

pub fn run(args: MergeArgs) -> Result<()> {
    let (mut rule_set, warnings) = RuleSet::load_from_file(&args.rules)
        .with_context(|| format!("loading rules file {}", args.rules.display()))?;
    for warning in &warnings {
        log::warn!("[CLI] {warning}");
    }

    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading source document {}", args.source.display()))?;
    let mut doc = Document::parse(&source)
        .with_context(|| format!("parsing source document {}", args.source.display()))?;
    rule_set.apply(&doc);

    let catalog = PoCatalog::load_file(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;

    let mode = match args.mode {
        MergeModeArg::Replace => MergeMode::ReplaceInPlace,
        MergeModeArg::Duplicate => MergeMode::DuplicateAsSibling,
    };
    merger::merge(&mut doc, &rule_set, &catalog, &args.lang, mode);

    let output = itstool_dom::serialize(&doc)
        .with_context(|| format!("serializing merged document for {}", args.output.display()))?;
    std::fs::write(&args.output, output)
        .with_context(|| format!("writing merged document {}", args.output.display()))?;
    log::info!("[CLI] wrote merged document to {}", args.output.display());
    Ok(())
}
