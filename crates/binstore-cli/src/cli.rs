use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Config file read when `--config` is not given, if present.
pub const DEFAULT_CONFIG: &str = "binstore.toml";

#[derive(Parser)]
#[command(name = "binstore", about = "Binstore: pluggable binary content storage", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Service configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum EncodingArg {
    Hex,
    Base64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check whether content exists
    Exists(ContentArgs),
    /// Write content to stdout or a file
    Get(GetArgs),
    /// Store content from stdin or a file
    Put(PutArgs),
    /// Delete content
    Purge(ContentArgs),
    /// Compute the digest of a file or stdin
    Digest(DigestArgs),
    /// List supported digest algorithms
    Algorithms,
    /// List configured partitions
    Partitions,
    /// Mint fresh identifiers in a partition
    Mint(MintArgs),
    /// Show which resolver handles an identifier
    Resolver(ResolverArgs),
}

#[derive(Args)]
pub struct ContentArgs {
    pub partition: String,
    pub identifier: String,
}

#[derive(Args)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: ContentArgs,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PutArgs {
    #[command(flatten)]
    pub target: ContentArgs,
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Args)]
pub struct DigestArgs {
    #[arg(short, long, default_value = "SHA-256")]
    pub algorithm: String,
    /// Overrides the configured encoding
    #[arg(short, long)]
    pub encoding: Option<EncodingArg>,
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct MintArgs {
    pub partition: String,
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,
}

#[derive(Args)]
pub struct ResolverArgs {
    pub identifier: String,
}
