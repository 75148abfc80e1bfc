// src/main.rs

//! A minimal line terminal: connects to the configured peer, logs every
//! inbound message, and forwards each line typed on stdin.

use anyhow::Result;
use ircline::config::Config;
use ircline::{Connection, IrcMessage};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("IRCLINE_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("ircline version {VERSION}");
        return Ok(());
    }

    // The config path may be given via --config; otherwise "ircline.toml".
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("ircline.toml");

    let config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();

    if let Err(e) = run(config).await {
        error!("ircline runtime error: {e}");
        return Err(e);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let conn = Connection::new(config.connection.clone());
    let mut inbound = conn.connect().await?;

    for line in &config.on_connect {
        conn.write_line(line).await?;
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            message = inbound.recv() => match message {
                Some(message) => log_message(&message),
                None => {
                    info!("Link closed.");
                    break;
                }
            },
            line = stdin.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if let Err(e) = conn.write_line(&line).await {
                        warn!("Write failed: {e}");
                    }
                }
                Ok(None) => {
                    info!("stdin closed, disconnecting.");
                    conn.close().await?;
                    conn.closed().await;
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    conn.close().await?;
                    conn.closed().await;
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting.");
                conn.close().await?;
                conn.closed().await;
                break;
            }
        }
    }

    Ok(())
}

fn log_message(message: &IrcMessage) {
    info!(
        source = message.source.as_deref().unwrap_or("-"),
        command = %message.command,
        "{}",
        message.params.join(" ")
    );
}
