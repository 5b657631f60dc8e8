mod bus;
mod config;
mod platform;
mod tools;
mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bus::{Channel, MessageBus};
use crate::config::Config;
use crate::platform::telegram::TelegramSender;
use crate::platform::OutboundDispatcher;
use crate::tools::output::BoundedOutput;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for tool output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mimibot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::resolve(explicit.as_deref(), Path::new("config.toml"))?;

    info!("Configuration loaded successfully");
    info!("  Outbound queue capacity: {}", config.bus.outbound_capacity);
    info!("  Tool output capacity: {}", config.tool.output_capacity);

    let mut dispatcher = OutboundDispatcher::new();
    if let Some(token) = config.telegram_token() {
        dispatcher.register(Channel::Telegram, Arc::new(TelegramSender::new(token)));
    }
    for channel in Channel::ALL {
        if !dispatcher.has_sender(channel) {
            warn!("No sender configured for {}; its messages will be dropped", channel);
        }
    }

    let (bus, outbound_rx) = MessageBus::new(config.bus.outbound_capacity);
    let dispatcher_task = tokio::spawn(dispatcher.run(outbound_rx));

    for def in tools::builtin_tool_definitions() {
        debug!("Tool available: {} - {}", def.function.name, def.function.description);
    }

    // One send_message request per input line
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut output = BoundedOutput::with_capacity(config.tool.output_capacity);

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let status = tools::execute_builtin_tool("send_message", line, &mut output, &bus);
        if !status.is_ok() {
            debug!("send_message rejected request: {:?}", status);
        }

        stdout
            .write_all(format!("{}\n", output).as_bytes())
            .await
            .context("Failed to write to stdout")?;
        stdout.flush().await.context("Failed to flush stdout")?;
    }

    // Closing the bus lets the dispatcher drain what is left and stop
    drop(bus);
    dispatcher_task
        .await
        .context("Outbound dispatcher task panicked")?;

    info!("Shutting down");
    Ok(())
}
