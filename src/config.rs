use crate::cli::{Args, ExtractArg, SequenceArg};
use crate::dns::ExtractMode;
use crate::replay::SequenceMode;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no log label given, it is mandatory (use -l)")]
    MissingLabel,

    #[error("invalid port {0}, a non-zero port number is required")]
    InvalidPort(u16),

    #[error("invalid timeout, it must be at least 1 ms")]
    InvalidTimeout,
}

/// Nameserver every query is replayed against. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination(SocketAddr);

impl Destination {
    pub fn new(ip: IpAddr, port: u16) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        Ok(Self(SocketAddr::new(ip, port)))
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub destination: Destination,
    pub label: String,
    pub pcap_file: Option<PathBuf>,
    pub timeout: Duration,
    pub extract: ExtractMode,
    pub sequence: SequenceMode,
    pub validate_answers: bool,
}

impl TryFrom<&Args> for ReplayConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let label = match args.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => return Err(ConfigError::MissingLabel),
        };

        let destination = Destination::new(args.address, args.port)?;

        if args.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let extract = match args.extract {
            ExtractArg::Fixed => ExtractMode::Fixed,
            ExtractArg::Headers => ExtractMode::Headers,
        };
        let sequence = match args.sequence {
            SequenceArg::Frame => SequenceMode::Frame,
            SequenceArg::Record => SequenceMode::Record,
        };

        Ok(Self {
            destination,
            label,
            pcap_file: args.pcap_file.clone(),
            timeout: Duration::from_millis(args.timeout_ms),
            extract,
            sequence,
            validate_answers: args.validate_answers,
        })
    }
}
