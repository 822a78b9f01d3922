use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dns-replay-diff")]
#[command(
    about = "Replay DNS queries from a pcap capture and log query/answer pairs for diffing",
    long_about = "Replays every DNS query found in PCAP_FILE (or standard input) against a \
                  nameserver over UDP and prints one record per answered query:\n\n  \
                  ; header information\n  \
                  (decimal) packet sequence number\n  \
                  (decimal) query size in bytes\n  \
                  hex dump of query\n  \
                  (decimal) answer size in bytes\n  \
                  hex dump of answer"
)]
pub struct Args {
    /// Nameserver address to send the queries to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: IpAddr,

    /// Nameserver port
    #[arg(short, long, default_value_t = 53)]
    pub port: u16,

    /// Label written into the output header (mandatory)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Capture file to read; standard input is used when omitted
    pub pcap_file: Option<PathBuf>,

    /// How long to wait for each answer, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = ExtractArg::Fixed)]
    pub extract: ExtractArg,

    #[arg(long, value_enum, default_value_t = SequenceArg::Frame)]
    pub sequence: SequenceArg,

    /// Ignore datagrams that are not from the destination or do not answer the query just sent
    #[arg(long)]
    pub validate_answers: bool,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractArg {
    /// Skip a fixed Ethernet + IPv4 + UDP header block
    Fixed,
    /// Walk the Ethernet, IP and UDP headers
    Headers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SequenceArg {
    /// Number records by frame position in the capture
    Frame,
    /// Number records consecutively as they are written
    Record,
}
