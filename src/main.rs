use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chainlog::{ChainLogConfig, ChainLogger};

fn cli() -> Command {
    Command::new("chainlog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tamper-evident append-only log with external hash anchoring")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to TOML configuration (CHAINLOG__* variables override it)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log errors")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("log")
                .about("Append a payload (JSON literal, or plain text)")
                .arg(Arg::new("payload").required(true)),
        )
        .subcommand(
            Command::new("read")
                .about("Print logged payloads, one JSON value per line")
                .arg(
                    Arg::new("consistent")
                        .long("consistent")
                        .action(ArgAction::SetTrue)
                        .help("Only entries passing chain validation and anchor cross-check"),
                ),
        )
        .subcommand(Command::new("tip").about("Print the hash the next entry will chain to"))
        .subcommand(Command::new("verify").about("Check the stored chain and report rejected entries"))
        .subcommand(Command::new("retry-anchors").about("Publish deferred anchor hashes"))
}

fn init_tracing(matches: &ArgMatches) {
    let default_filter = if matches.get_flag("quiet") {
        "chainlog=error"
    } else if matches.get_flag("verbose") {
        "chainlog=debug"
    } else {
        "chainlog=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Treat the argument as JSON when it parses, otherwise as a string
fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn run(matches: &ArgMatches) -> Result<bool> {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let config = ChainLogConfig::load(config_path.as_deref())?;
    config.validate_standalone()?;
    let logger: ChainLogger<Value> = config.build_logger()?;

    match matches.subcommand() {
        Some(("log", sub)) => {
            let raw = sub
                .get_one::<String>("payload")
                .ok_or_else(|| anyhow!("payload is required"))?;
            let hash = logger.log(parse_payload(raw)).await?;
            println!("{}", hash);
        }
        Some(("read", sub)) => {
            for payload in logger.get_logged_data(sub.get_flag("consistent")).await? {
                println!("{}", serde_json::to_string(&payload)?);
            }
        }
        Some(("tip", _)) => {
            println!("{}", logger.get_most_recent_hash().await?);
        }
        Some(("verify", _)) => {
            let report = logger.verify().await?;
            println!("{}", report.summary());
            println!("{}", report.detailed_status());
            for hash in &report.rejected_hashes {
                println!("  rejected: {}", hash);
            }
            return Ok(report.is_consistent());
        }
        Some(("retry-anchors", _)) => {
            let published = logger.retry_pending_anchors().await?;
            info!(
                "Published {} anchors, {} still pending",
                published,
                logger.pending_anchor_count().await
            );
        }
        Some((other, _)) => return Err(anyhow!("Unknown command: {}", other)),
        None => return Err(anyhow!("No command given")),
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(&matches);

    match run(&matches).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("chainlog failed: {}", e);
            Err(e)
        }
    }
}
