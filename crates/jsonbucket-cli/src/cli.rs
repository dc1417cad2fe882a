use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "jsonbucket",
    about = "Store, retrieve, tag and list JSON documents in S3 buckets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Target bucket.
    #[arg(short, long, global = true, env = "BUCKET_NAME")]
    pub bucket: Option<String>,

    /// TOML file with region / endpoint / profile settings.
    #[arg(long, global = true)]
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

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the JSON document stored at a key
    Get(GetArgs),
    /// Write a JSON document to a key, encrypted at rest
    Set(SetArgs),
    /// Show the tags attached to a key
    Tags(TagsArgs),
    /// List objects under a prefix (one page)
    Ls(LsArgs),
    /// Write a sample document, read it back, and compare
    Smoke(SmokeArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub key: String,
    /// Inline JSON document. Read from --file or stdin when omitted.
    #[arg(short, long, conflicts_with = "file")]
    pub data: Option<String>,
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Tag to attach after the write, as NAME=VALUE. Repeatable.
    #[arg(short = 't', long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct TagsArgs {
    pub key: String,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Key prefix ("folder"). Empty lists the whole bucket.
    #[arg(default_value = "")]
    pub prefix: String,
    #[arg(short = 'n', long)]
    pub max_keys: Option<i32>,
    #[arg(long)]
    pub start_after: Option<String>,
    #[arg(long)]
    pub delimiter: Option<String>,
    #[arg(long)]
    pub continuation_token: Option<String>,
    #[arg(long)]
    pub fetch_owner: bool,
}

#[derive(Args, Debug)]
pub struct SmokeArgs {
    #[arg(default_value = "test/content.json")]
    pub key: String,
}

/// Parse a `NAME=VALUE` tag argument.
pub fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {raw:?}")),
    }
}
