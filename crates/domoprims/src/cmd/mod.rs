use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod codes;
pub mod get;
pub mod set;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a group address to a setting value.
    Set(SetArgs),
    /// Query a group address and print the first matching event.
    Get(GetArgs),
    /// Register for state feedback and print events until interrupted.
    Watch(WatchArgs),
    /// Print the protocol's component, command and setting code tables.
    Codes(CodesArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Set(args) => set::run(args, format).await,
        Command::Get(args) => get::run(args, format).await,
        Command::Watch(args) => watch::run(args, format).await,
        Command::Codes(args) => codes::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Gateway endpoint as host:port.
    pub endpoint: String,
    /// Component category (e.g. relay, dimmer).
    #[arg(long, short = 'c', default_value = "relay")]
    pub component: String,
    /// Group address.
    #[arg(long, short = 'a')]
    pub address: u8,
    /// Setting: on, off, toggle, or a raw value 0-255.
    #[arg(long, short = 's')]
    pub setting: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Gateway endpoint as host:port.
    pub endpoint: String,
    /// Component category (e.g. relay, dimmer).
    #[arg(long, short = 'c', default_value = "relay")]
    pub component: String,
    /// Group address.
    #[arg(long, short = 'a')]
    pub address: u8,
    /// Maximum time to wait for the state event (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Gateway endpoint as host:port.
    pub endpoint: String,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct CodesArgs {}

pub fn parse_endpoint(input: &str) -> CliResult<(String, u16)> {
    let (host, port) = input
        .rsplit_once(':')
        .ok_or_else(|| CliError::new(USAGE, format!("endpoint must be host:port, got {input}")))?;
    if host.is_empty() {
        return Err(CliError::new(USAGE, format!("endpoint has no host: {input}")));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid port in endpoint: {input}")))?;
    Ok((host.to_string(), port))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
