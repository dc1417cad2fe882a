use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use colored::Colorize;
use jsonbucket_s3::{S3Backend, S3Config};
use jsonbucket_store::{
    ListOptions, ListingResult, ObjectStore, ObjectStoreFolder, StorageBackend, TagSet,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub backend: Arc<dyn StorageBackend>,
    pub bucket: String,
    pub format: OutputFormat,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => S3Config::load(path)?,
        None => S3Config::default(),
    }
    .with_env()?;
    let bucket = cli
        .bucket
        .context("no bucket given: pass --bucket or set BUCKET_NAME")?;
    debug!(bucket = %bucket, ?config, "resolved settings");
    let backend: Arc<dyn StorageBackend> = Arc::new(S3Backend::from_config(&config).await);
    let ctx = Context {
        backend,
        bucket,
        format: cli.format,
    };
    let mut stdout = std::io::stdout().lock();
    execute(&cli.command, &ctx, &mut stdout).await
}

pub async fn execute(command: &Command, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::Get(args) => cmd_get(args, ctx, out).await,
        Command::Set(args) => cmd_set(args, ctx, out).await,
        Command::Tags(args) => cmd_tags(args, ctx, out).await,
        Command::Ls(args) => cmd_ls(args, ctx, out).await,
        Command::Smoke(args) => cmd_smoke(args, ctx, out).await,
    }
}

fn store(ctx: &Context, key: &str) -> anyhow::Result<ObjectStore> {
    Ok(ObjectStore::new(ctx.backend.clone(), ctx.bucket.as_str(), key)?)
}

async fn cmd_get(args: &GetArgs, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = store(ctx, &args.key)?;
    let doc = store
        .get_value()
        .await
        .with_context(|| format!("failed to read {}", store.address()))?;
    match (ctx.format, doc) {
        (OutputFormat::Json, doc) => writeln!(out, "{}", doc.unwrap_or(Value::Null))?,
        (OutputFormat::Text, Some(doc)) => writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?,
        (OutputFormat::Text, None) => {
            writeln!(out, "{}", format!("No document at {}", store.address()).dimmed())?
        }
    }
    Ok(())
}

fn read_document(args: &SetArgs) -> anyhow::Result<Value> {
    let text = match (&args.data, &args.file) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read document from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("document is not valid JSON")
}

async fn cmd_set(args: &SetArgs, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = store(ctx, &args.key)?;
    let doc = read_document(args)?;
    let tags: TagSet = args.tags.iter().cloned().collect();
    let receipt = store
        .set(&doc, Some(&tags))
        .await
        .with_context(|| format!("failed to write {}", store.address()))?;

    match ctx.format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&receipt)?)?,
        OutputFormat::Text => {
            writeln!(out, "{} Wrote {}", "✓".green().bold(), store.address().to_string().bold())?;
            if let Some(e_tag) = &receipt.e_tag {
                writeln!(out, "  ETag: {}", e_tag.yellow())?;
            }
            if let Some(sse) = &receipt.server_side_encryption {
                writeln!(out, "  Encryption: {}", sse.cyan())?;
            }
            if !tags.is_empty() {
                writeln!(out, "  Tags: {}", tags.len())?;
            }
        }
    }
    Ok(())
}

async fn cmd_tags(args: &TagsArgs, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = store(ctx, &args.key)?;
    let tags = store
        .tags()
        .await
        .with_context(|| format!("failed to read tags of {}", store.address()))?;
    match ctx.format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&tags)?)?,
        OutputFormat::Text if tags.is_empty() => writeln!(out, "No tags.")?,
        OutputFormat::Text => {
            for tag in &tags {
                writeln!(out, "{} = {}", tag.key.bold(), tag.value)?;
            }
        }
    }
    Ok(())
}

async fn cmd_ls(args: &LsArgs, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let folder = ObjectStoreFolder::new(ctx.backend.clone(), ctx.bucket.as_str(), args.prefix.as_str())?;
    let options = ListOptions {
        max_keys: args.max_keys,
        start_after: args.start_after.clone(),
        delimiter: args.delimiter.clone(),
        continuation_token: args.continuation_token.clone(),
        fetch_owner: args.fetch_owner.then_some(true),
    };
    let listing = folder
        .list_contents(&options)
        .await
        .with_context(|| format!("failed to list {}", folder.folder()))?;
    match ctx.format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&listing)?)?,
        OutputFormat::Text => print_listing(&listing, out)?,
    }
    Ok(())
}

fn print_listing(listing: &ListingResult, out: &mut dyn Write) -> anyhow::Result<()> {
    for prefix in &listing.common_prefixes {
        writeln!(out, "{:>10}  {:<25}  {}", "PRE".dimmed(), "", prefix.blue())?;
    }
    for entry in &listing.contents {
        let modified = entry
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let size = entry.size.map(|s| s.to_string()).unwrap_or_default();
        writeln!(out, "{size:>10}  {modified:<25}  {}", entry.key)?;
    }
    if listing.is_truncated {
        let token = listing.next_continuation_token.as_deref().unwrap_or("");
        writeln!(out, "{} --continuation-token {}", "More results:".yellow(), token)?;
    }
    Ok(())
}

/// Write a fixed sample, read it back, and fail unless they match.
async fn cmd_smoke(args: &SmokeArgs, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = store(ctx, &args.key)?;
    let content = json!({ "foo": "bar", "count": 123 });
    store.set(&content, None).await.context("smoke write failed")?;
    let retrieved = store.get_value().await.context("smoke read failed")?;

    writeln!(out, "Set\n{}", serde_json::to_string_pretty(&content)?)?;
    match &retrieved {
        Some(doc) => writeln!(out, "Get\n{}", serde_json::to_string_pretty(doc)?)?,
        None => writeln!(out, "Get\nnull")?,
    }
    if retrieved.as_ref() != Some(&content) {
        bail!("round trip mismatch at {}", store.address());
    }
    writeln!(out, "{} Round trip OK", "✓".green().bold())?;
    Ok(())
}
