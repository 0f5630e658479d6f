use std::{
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod parse;
mod sink;

use crate::{
    config::{Config, RawConfig},
    parse::{parse_line, Event},
    sink::{JsonLinesSink, LogSink, Record, Sink},
};

/// Serial lines buffered between the reader and the sink
const LINE_CHANNEL_CAPACITY: usize = 64;

/// Upper bound for a single serial read. The reader thread only notices a
/// shutdown between reads.
const SERIAL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(about, author = "Danilo Bargen", version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read log lines from the lock and store them (default)
    Listen,
    /// Switch the lock's continuous alert on or off
    Alert {
        #[arg(value_enum)]
        state: AlertState,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum AlertState {
    On,
    Off,
}

impl AlertState {
    /// The single byte command understood by the lock
    fn command_byte(self) -> u8 {
        match self {
            Self::On => b'F',
            Self::Off => b'S',
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Parse config
    let raw_config = match RawConfig::load(&args.config) {
        Ok(val) => val,
        Err(e) => {
            println!("Error: Failed to load config: {:#}", e);
            println!();
            println!(
                "Example config:\n\n{}",
                toml::to_string(&RawConfig::example())?
            );
            return Ok(());
        }
    };
    let config: Config = raw_config.try_into()?;

    match args.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(config).await,
        Command::Alert { state } => send_alert(&config, state),
    }
}

fn open_port(config: &Config) -> anyhow::Result<Box<dyn serialport::SerialPort>> {
    let path = config.serial.port.to_string_lossy();
    serialport::new(path, config.serial.baudrate)
        .timeout(SERIAL_TIMEOUT)
        .open()
        .context(format!(
            "Failed to open serial port at {:?}",
            config.serial.port
        ))
}

fn send_alert(config: &Config, state: AlertState) -> anyhow::Result<()> {
    let mut port = open_port(config)?;
    port.write_all(&[state.command_byte()])
        .context("Failed to write alert command")?;
    port.flush().context("Failed to flush serial port")?;
    info!(state = ?state, "alert_command_sent");
    Ok(())
}

async fn listen(config: Config) -> anyhow::Result<()> {
    // Connect to serial device
    let raw_port = open_port(&config)?;
    info!(port = ?config.serial.port, baudrate = config.serial.baudrate, "serial_connected");

    let mut sink: Box<dyn Sink> = match &config.sink {
        config::Sink::Log => Box::new(LogSink),
        config::Sink::JsonLines(path) => {
            info!(path = ?path, "sink_json_lines");
            Box::new(JsonLinesSink::new(path))
        }
    };

    // Serial reads block, so they run on their own thread
    let (tx, mut rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || read_lines(BufReader::new(raw_port), tx));

    // Main loop
    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => process_line(sink.as_mut(), &line).await,
                None => {
                    warn!("serial_reader_stopped");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown");
                break;
            }
        }
    }

    Ok(())
}

/// Forward lines until the receiving side goes away.
fn read_lines<R: BufRead>(mut port: R, tx: mpsc::Sender<String>) {
    let mut line_buffer = String::new();
    while !tx.is_closed() {
        match port.read_line(&mut line_buffer) {
            Ok(0) => {
                warn!("serial_eof");
                std::thread::sleep(Duration::from_secs(1));
            }
            Ok(_size) => {
                if tx.blocking_send(line_buffer.trim().to_string()).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!("serial_read_timeout");
            }
            Err(e) => {
                error!(error = %e, "serial_read_failed");
                std::thread::sleep(Duration::from_secs(1));
            }
        }
        line_buffer.clear();
    }
}

async fn process_line(sink: &mut dyn Sink, line: &str) {
    match parse_line(line) {
        Some(Event::Access(entry)) => {
            let record = Record::from_entry(entry, Local::now());
            // The lock never depends on the sink, so failures are only logged
            if let Err(e) = sink.insert(&record).await {
                error!(error = %format!("{:#}", e), uid = %record.uid, "sink_insert_failed");
            }
        }
        Some(Event::Ready) => info!("lock_ready"),
        Some(Event::Reset) => warn!("lock_reset_after_failed_scans"),
        None => debug!(line = %line, "unparsed_line"),
    }
}
