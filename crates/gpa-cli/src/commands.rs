use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use gpa_resolver::{Archiver, ResolverConfig, StreamResolver};
use gpa_server::{ArchiveServer, ServerConfig};
use gpa_store::FsObjectStore;
use gpa_types::ObjectKey;
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Resolve(args) => cmd_resolve(args, format).await,
        Command::Playlist(args) => cmd_playlist(args, format).await,
        Command::Info(args) => cmd_info(args, format).await,
        Command::Download(args) => cmd_download(args, format).await,
        Command::List(args) => cmd_list(args, format).await,
        Command::Upload(args) => cmd_upload(args, format).await,
    }
}

fn resolver_config(upstream: &UpstreamArgs, archive_dir: Option<PathBuf>) -> ResolverConfig {
    let mut config = ResolverConfig {
        timeout_secs: upstream.timeout,
        proxy: upstream.proxy.clone(),
        ..Default::default()
    };
    if let Some(dir) = archive_dir {
        config.archive_dir = dir;
    }
    debug!(?config, "resolver configuration");
    config
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = args.root {
        config.archive_root = root;
    }
    if let Some(static_root) = args.static_root {
        config.static_root = Some(static_root);
    }
    println!(
        "GP Archive gateway on {} (archive: {})",
        config.bind_addr.to_string().bold(),
        config.archive_root.display()
    );
    ArchiveServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resolver = StreamResolver::from_config(resolver_config(&args.upstream, None))?;
    let stream = resolver.resolve(&args.url).await?;
    if format == OutputFormat::Json {
        return print_json(&stream);
    }
    println!("{} {}", "✓".green().bold(), stream.url.bold());
    println!("  Program:  {}", stream.program_id.to_string().yellow());
    println!("  Strategy: {}", stream.strategy);
    if stream.is_hls() {
        println!("  HLS playlist; run {} for the best variant", "gpa playlist <url>".cyan());
    }
    Ok(())
}

async fn cmd_playlist(args: PlaylistArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resolver = StreamResolver::from_config(resolver_config(&args.upstream, None))?;
    let variant = resolver.resolve_playlist(&args.url).await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "playlist": args.url, "variant": variant })),
        OutputFormat::Text => {
            println!("{} {}", "✓".green().bold(), variant.bold());
            Ok(())
        }
    }
}

async fn cmd_info(args: InfoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resolver = StreamResolver::from_config(resolver_config(&args.upstream, None))?;
    let info = resolver.program_info(&args.url).await;
    if format == OutputFormat::Json {
        return print_json(&info);
    }
    println!("\n{}", "Program Information:".bold());
    println!("  Title:       {}", info.title.yellow());
    println!("  Description: {}", info.description);
    println!("  Episode:     {}", info.episode);
    println!("  Duration:    {}", info.duration);
    println!("  URL:         {}", info.original_url);
    Ok(())
}

async fn cmd_download(args: DownloadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolver_config(&args.upstream, args.archive_dir);
    let archiver = Archiver::from_config(&config)?;
    let resolver = StreamResolver::from_config(config)?;
    let outcome = archiver
        .download(&resolver, &args.url, args.filename.as_deref())
        .await
        .with_context(|| format!("download of {} failed", args.url))?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    println!("\n{} Download Summary:", "✓".green().bold());
    println!("  Title:    {}", outcome.info.title.yellow());
    println!("  Audio:    {}", outcome.audio_file.display());
    println!("  Metadata: {}", outcome.metadata_file.display());
    Ok(())
}

async fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = ResolverConfig::default();
    if let Some(dir) = args.archive_dir {
        config.archive_dir = dir;
    }
    let archiver = Archiver::from_config(&config)?;
    let shows = archiver.list_archived().await?;
    if format == OutputFormat::Json {
        return print_json(&shows);
    }
    if shows.is_empty() {
        println!("No archived shows in {}", archiver.archive_dir().display());
        return Ok(());
    }
    println!("{}", "Archived shows:".bold());
    for (i, show) in shows.iter().enumerate() {
        println!("{}. {} ({:.2} MB)", i + 1, show.name, show.size_mb());
    }
    Ok(())
}

async fn cmd_upload(args: UploadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let name = match args.key {
        Some(key) => key,
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("upload source has no file name")?,
    };
    let key = ObjectKey::new(name)?;
    let store = FsObjectStore::new(&args.root);
    let meta = store.import(&args.file, &key).await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "key": meta.key, "size": meta.size, "url": meta.key.audio_path() }));
    }
    println!(
        "{} Stored {} ({} bytes) at {}",
        "✓".green().bold(),
        meta.key.to_string().bold(),
        meta.size,
        meta.key.audio_path().cyan()
    );
    Ok(())
}
