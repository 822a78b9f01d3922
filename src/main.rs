use anyhow::{Context, Result};
use clap::Parser;
use dns_replay_diff::cli::Args;
use dns_replay_diff::config::ReplayConfig;
use dns_replay_diff::replay::{QueryTransport, RecordEmitter, ReplayDriver};
use log::{info, warn};
use std::io::{self, BufWriter};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let config = ReplayConfig::try_from(&args)?;

    let mut capture = dns_replay_diff::pcap::CaptureLoader::open(config.pcap_file.as_deref())?;

    let transport = QueryTransport::bind(
        config.destination,
        config.timeout,
        config.validate_answers,
    )
    .await
    .context("Cannot open UDP socket")?;

    let mut emitter = RecordEmitter::new(BufWriter::new(io::stdout().lock()));
    emitter
        .write_header(&config.label, &config.destination)
        .context("Cannot write output header")?;

    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => token_clone.cancel(),
            Err(e) => warn!("Cannot listen for Ctrl-C: {e}"),
        }
    });

    let mut driver = ReplayDriver::new(transport, emitter, config.extract, config.sequence);
    let stats = driver.run(&mut capture, &cancel_token).await?;

    info!(
        "Done: {} frames read, {} records written, {} dropped, {} without answer",
        stats.frames, stats.emitted, stats.dropped, stats.failed
    );
    Ok(())
}
