#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, Command, OnceConfig, RunConfig, SinkConfig, WordlistArgs};
use seedgen::{
    DefaultEngine, FileSink, NullSink, Sink,
    pipeline::{run_pipeline, spawn_signal_listener},
    wordlist,
};
use std::{
    io::{self, Write},
    sync::Arc,
};
use telemetry::init_telemetry;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let providers = init_telemetry()?;
    let result = async {
        match args.command {
            Command::Run(run) => run_continuous(RunConfig::try_from(run)?).await,
            Command::Once(once) => run_once(&OnceConfig::try_from(once)?),
            Command::Wordlist(list) => run_wordlist(&list),
        }
    }
    .await;
    providers.shutdown();
    result
}

fn open_sink(config: &SinkConfig) -> anyhow::Result<Box<dyn Sink>> {
    Ok(match &config.path {
        Some(path) => Box::new(
            FileSink::open(path, config.format)
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(NullSink),
    })
}

async fn run_continuous(config: RunConfig) -> anyhow::Result<()> {
    let sink = open_sink(&config.sink)?;

    if cfg!(debug_assertions) {
        tracing::info!("Starting generation with full config: {config:#?}");
    } else {
        tracing::info!(
            "Starting {}-word generation with {} workers",
            config.strength.word_count(),
            config.pipeline.num_workers
        );
    }
    println!("Press Ctrl+C to stop");

    let cancel = CancellationToken::new();
    let listener = spawn_signal_listener(cancel.clone());

    let summary = run_pipeline(
        &config.pipeline,
        config.jobs,
        Arc::new(DefaultEngine::default()),
        sink,
        io::stdout(),
        cancel.clone(),
    )
    .await;

    cancel.cancel();
    let interrupted = listener.await.unwrap_or(false);

    let summary = summary?;
    if interrupted {
        println!("Generation stopped by user. Total generated: {}", summary.generated);
    } else {
        println!("Generation stopped. Total generated: {}", summary.generated);
    }
    println!("{summary}");
    Ok(())
}

fn run_once(config: &OnceConfig) -> anyhow::Result<()> {
    let engine = DefaultEngine::default();
    let preview = engine.preview(config.strength, &config.networks)?;

    let rule = "=".repeat(50);
    println!("Generated Seed Phrase:\n{rule}\n{}\n{rule}", preview.artifact.phrase);
    if !preview.addresses.is_empty() {
        println!("\nAddresses:");
    }
    for (network, address) in &preview.addresses {
        match address {
            Ok(address) => println!("{network}: {address}"),
            Err(e) => println!("{network}: unavailable ({e})"),
        }
    }

    let mut sink = open_sink(&config.sink)?;
    sink.write_batch(core::slice::from_ref(&preview.artifact))
        .and_then(|()| sink.close())
        .with_context(|| format!("failed to save to {}", sink.target()))?;
    if config.sink.path.is_some() {
        println!("\nSaved to {}", sink.target());
    }

    println!("\nWARNING: Store this seed phrase securely! Never share it with anyone!");
    println!("Anyone with access to this phrase can access your crypto assets.");
    Ok(())
}

fn run_wordlist(args: &WordlistArgs) -> anyhow::Result<()> {
    if !args.show && !args.save {
        anyhow::bail!("nothing to do: pass --show and/or --save");
    }

    if args.show {
        let rule = "=".repeat(50);
        let mut out = io::stdout().lock();
        writeln!(out, "Complete list of 2048 BIP39 words:\n{rule}")?;
        wordlist::write_numbered(&mut out)?;
        writeln!(out, "{rule}")?;
    }

    if args.save {
        let (txt, json) = wordlist::export(&args.output_dir).with_context(|| {
            format!("failed to export word list to {}", args.output_dir.display())
        })?;
        println!("Wordlist saved to {} and {}", txt.display(), json.display());
    }
    Ok(())
}
