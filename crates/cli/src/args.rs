//! CLI argument definitions using clap's derive API (mirrors the reference
//! workspace's own plain-struct CLI args, generalized to two subcommands).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "itstool", author, version, about = "ITS-driven XML translation extraction and merge", long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract translatable strings from a source XML document into a message catalog
    Extract(ExtractArgs),
    /// Merge translated strings from a message catalog back into a source XML document
    Merge(MergeArgs),
}

#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Path to the ITS rules file
    #[arg(long)]
    pub rules: PathBuf,

    /// Path to write the extracted message catalog (PO-subset format)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Path to the source XML document
    pub source: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergeModeArg {
    Replace,
    Duplicate,
}

#[derive(Debug, Parser)]
pub struct MergeArgs {
    /// Path to the ITS rules file
    #[arg(long)]
    pub rules: PathBuf,

    /// Path to the translated message catalog (PO-subset format)
    #[arg(long)]
    pub catalog: PathBuf,

    /// BCP-47 language tag installed as xml:lang on translated nodes
    #[arg(long)]
    pub lang: String,

    /// Whether a translated unit replaces the original in place or is
    /// inserted as a duplicate sibling
    #[arg(long, value_enum, default_value_t = MergeModeArg::Replace)]
    pub mode: MergeModeArg,

    /// Path to the source XML document
    pub source: PathBuf,

    /// Path to write the merged document
    #[arg(short, long)]
    pub output: PathBuf,
}
