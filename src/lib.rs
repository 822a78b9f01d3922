//! Replays the DNS queries found in a packet capture against a nameserver and
//! logs every query/answer pair in a line based format meant for diffing two
//! runs against each other.

pub mod cli;
pub mod config;
pub mod dns;
pub mod pcap;
pub mod replay;
