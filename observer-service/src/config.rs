use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawConfig {
    pub serial: Serial,
    pub sink: Option<RawSink>,
}

impl RawConfig {
    /// Parse the config file at the specified path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file at {:?}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file to string")?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn example() -> Self {
        Self {
            serial: Serial {
                port: PathBuf::from_str("/dev/ttyACM0").unwrap(),
                baudrate: 9600,
            },
            sink: Some(RawSink {
                path: PathBuf::from_str("access_log.jsonl").unwrap(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Serial {
    /// The serial port.
    pub port: PathBuf,

    /// The baud rate.
    pub baudrate: u32,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawSink {
    /// File that access records are appended to, one JSON object per line
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct Config {
    pub serial: Serial,
    pub sink: Sink,
}

#[derive(Debug, PartialEq)]
pub enum Sink {
    /// Records are only logged
    Log,
    /// Records are appended to a JSON lines file
    JsonLines(PathBuf),
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        if raw_config.serial.baudrate == 0 {
            bail!("Serial baud rate must not be 0");
        }
        if raw_config.serial.port.to_str().is_none() {
            bail!("Serial port path {:?} is not valid UTF-8", raw_config.serial.port);
        }

        let sink = match raw_config.sink {
            Some(raw_sink) => {
                if raw_sink.path.as_os_str().is_empty() {
                    bail!("Sink path must not be empty");
                }
                Sink::JsonLines(raw_sink.path)
            }
            None => Sink::Log,
        };

        Ok(Config {
            serial: raw_config.serial,
            sink,
        })
    }
}
