mod cli;

use ffbatch::{config, jobfile, Supervisor};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ffb_av::{args, check_binary, CapabilityProbe, CliProbe, FfmpegLauncher, DEFAULT_BINARY};
use ffb_core::{Catalog, CatalogStore, EncoderStatus, EventBus, EventPayload, QueueItemStatus};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ffbatch=trace,ffb_av=trace,ffb_core=trace".to_string()
        } else {
            "ffbatch=debug,ffb_av=debug,ffb_core=info".to_string()
        }
    });

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { json } => probe_catalog(cli.config.as_deref(), json),
        Commands::Info { file, json } => media_info(&file, cli.config.as_deref(), json),
        Commands::Args { jobs } => print_args(&jobs, cli.config.as_deref()),
        Commands::Run { jobs } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_jobs(jobs, config))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("ffbatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cli_probe(config: &config::Config) -> CliProbe {
    CliProbe::new(config.encoder.binary_path.clone(), config.probe.timeouts())
}

fn probe_catalog(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = cli_probe(&config)
        .refresh_catalog()
        .context("Failed to probe encoder")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!("Video encoders: {}", catalog.video_encoders().len());
    for codec in catalog.video_encoders() {
        println!("  {:<20} {}", codec.name, codec.pretty_name);
    }

    println!("\nAudio encoders: {}", catalog.audio_encoders().len());
    for codec in catalog.audio_encoders() {
        println!("  {:<20} {}", codec.name, codec.pretty_name);
    }

    println!("\nMuxers: {}", catalog.muxers().len());
    for muxer in catalog.muxers() {
        print!("  {:<20} {}", muxer.name, muxer.pretty_name);
        if !muxer.extensions.is_empty() {
            print!(" [{}]", muxer.extensions.join(", "));
        }
        if muxer.is_sequence {
            print!(" (sequence)");
        }
        println!();
    }

    Ok(())
}

fn media_info(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let probe = cli_probe(&config);
    let catalog = probe.refresh_catalog().context("Failed to probe encoder")?;
    let media = probe.media_info(file, &catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media)?);
        return Ok(());
    }

    println!("File: {}", media.path.display());
    if let Some(ref muxer) = media.muxer {
        println!("Container: {}", muxer);
    }
    let secs = media.duration_secs as u64;
    println!(
        "Duration: {:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );

    if media.has_video {
        let video = &media.video;
        print!(
            "Video: {} {}x{}",
            video.codec.as_deref().unwrap_or("?"),
            video.width,
            video.height
        );
        if video.framerate > 0.0 {
            print!(", {:.3} fps", video.framerate);
        }
        if video.bitrate > 0 {
            print!(", {} kb/s", video.bitrate / 1000);
        }
        println!();
    }
    if media.has_audio {
        let audio = &media.audio;
        print!("Audio: {}", audio.codec.as_deref().unwrap_or("?"));
        if audio.sampling_rate > 0 {
            print!(", {} Hz", audio.sampling_rate);
        }
        if audio.bitrate > 0 {
            print!(", {} kb/s", audio.bitrate / 1000);
        }
        println!();
    }

    Ok(())
}

/// Probe for name resolution, falling back to an empty catalog.
fn catalog_or_empty(config: &config::Config) -> Catalog {
    match cli_probe(config).refresh_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!("Probe failed, codec and muxer names will be ignored: {e}");
            Catalog::default()
        }
    }
}

fn print_args(jobs: &[PathBuf], config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = catalog_or_empty(&config);
    let program = config
        .encoder
        .binary_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_BINARY.to_string());

    for job in jobs {
        let item = jobfile::load_job(job, &catalog)?;
        let line: Vec<String> = args::build(&item, &catalog)
            .into_iter()
            .map(|arg| quote_arg(&arg))
            .collect();
        println!("# {}", job.display());
        println!("{} {}", program, line.join(" "));
    }

    Ok(())
}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

async fn run_jobs(jobs: Vec<PathBuf>, config: config::Config) -> Result<()> {
    let catalog = Arc::new(CatalogStore::default());
    let events = Arc::new(EventBus::default());
    let launcher = Arc::new(FfmpegLauncher::new(config.encoder.binary_path.clone()));
    let supervisor = Arc::new(
        Supervisor::new(launcher, Arc::clone(&catalog), Arc::clone(&events))
            .with_stop_timeout(config.encoder.stop_timeout()),
    );

    supervisor
        .refresh_catalog(&cli_probe(&config))
        .context("Failed to probe encoder")?;

    let snapshot = catalog.snapshot();
    let items = jobs
        .iter()
        .map(|job| jobfile::load_job(job, &snapshot))
        .collect::<Result<Vec<_>>>()?;
    let total = items.len();

    let shutdown = CancellationToken::new();
    let runner = {
        let supervisor = Arc::clone(&supervisor);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { supervisor.run(shutdown).await })
    };

    let mut rx = events.subscribe();
    supervisor.encode_items(items)?;

    while supervisor.status() == EncoderStatus::Encoding {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                supervisor.stop().await;
                break;
            }
            event = rx.recv() => match event {
                Ok(event) => match event.payload {
                    EventPayload::EncodingStarted { item_id } => {
                        println!("Encoding {}", item_id);
                    }
                    EventPayload::Progress { snapshot, .. } => {
                        print!(
                            "\rframe={} size={}kB bitrate={}kbit/s speed={:.2}x remaining={}s   ",
                            snapshot.frame,
                            snapshot.size_bytes / 1024,
                            snapshot.bitrate_bps / 1024,
                            snapshot.speed,
                            snapshot.remaining_secs
                        );
                        std::io::stdout().flush()?;
                    }
                    EventPayload::EncodingFinished { item_id } => {
                        println!("\nFinished {}", item_id);
                    }
                    EventPayload::StatusChanged { status } if status != EncoderStatus::Encoding => {
                        break;
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    shutdown.cancel();
    runner.await?;

    let history = supervisor.history();
    let finished = history
        .iter()
        .filter(|item| item.status() == QueueItemStatus::Finished)
        .count();
    println!("\n{}/{} jobs finished", finished, total);

    if let Some(err) = supervisor.last_error() {
        anyhow::bail!("{}", err.message());
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tool = check_binary(config.encoder.binary_path.as_deref());

    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);

    if let Some(ref version) = tool.version {
        print!(" ({})", version);
    }

    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }

    println!();
    println!();
    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("The encoder is missing. Install ffmpeg or set encoder.binary_path.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    match config.encoder.binary_path {
        Some(ref binary) => println!("  Encoder: {}", binary.display()),
        None => println!("  Encoder: {} (from PATH)", DEFAULT_BINARY),
    }
    println!("  Stop timeout: {} ms", config.encoder.stop_timeout_ms);
    for (name, secs) in config.probe.entries() {
        println!("  Probe {} timeout: {} s", name, secs);
    }

    Ok(())
}
