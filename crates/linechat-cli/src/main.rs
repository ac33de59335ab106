//! Linechat console client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server on the default port
//! linechat --name ana
//!
//! # Stamp messages in UTC+2
//! linechat --name ana --utc-offset 120
//!
//! # Remote server, no timestamps, verbose client logs on stderr
//! linechat --address chat.example.net --port 6000 --no-timestamp --log-level debug
//! ```

mod console;
mod format;

use std::{io, time::Duration};

use clap::Parser;
use linechat_client::{ClientConfig, DEFAULT_ADDRESS, DEFAULT_PORT};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{console::CliError, format::Profile};

/// Linechat console client
#[derive(Parser, Debug)]
#[command(name = "linechat")]
#[command(about = "Line-oriented TCP chat client")]
#[command(version)]
struct Args {
    /// Server host name or IP address
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Display name (prompted for if omitted)
    #[arg(short, long)]
    name: Option<String>,

    /// Do not prefix messages with a clock stamp
    #[arg(long)]
    no_timestamp: bool,

    /// Clock stamp offset from UTC in minutes (stamps are UTC by default)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    utc_offset: i32,

    /// Connect timeout in seconds
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Stdout belongs to the conversation.
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut config = ClientConfig::new(args.address, args.port);
    config.connect_timeout = Duration::from_secs(args.connect_timeout);

    let mut input = console::stdin_lines();
    let mut out = io::stdout();

    let name = match args.name {
        Some(name) => format::display_name(&name),
        None => console::prompt_name(&mut input, &mut out).await?,
    };
    let profile = Profile::new(&name, !args.no_timestamp).with_utc_offset(args.utc_offset);

    tracing::info!(endpoint = %config.endpoint(), name = %profile.name, "starting console");

    match console::run(&config, &profile, input, &mut out).await {
        Ok(exit) => {
            tracing::debug!(?exit, "console exited");
            Ok(())
        },
        Err(err) => {
            tracing::error!(error = %err, "console failed");
            Err(err)
        },
    }
}
