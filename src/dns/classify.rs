use super::ExtractMode;
use crate::pcap::CapturedFrame;
use thiserror::Error;

pub const ETHERNET_HEADER_LEN: usize = 14;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_IPV6: u16 = 0x86DD;

/// Link-layer protocol of a frame, taken from its EtherType field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ipv4,
    Ipv6,
    Arp,
    Other(u16),
    /// Frame too short to carry an EtherType
    Unknown,
}

impl LinkType {
    pub fn from_ethertype(ethertype: u16) -> Self {
        match ethertype {
            ETHERTYPE_IPV4 => Self::Ipv4,
            ETHERTYPE_IPV6 => Self::Ipv6,
            ETHERTYPE_ARP => Self::Arp,
            other => Self::Other(other),
        }
    }

    /// Ethernet Frame:
    /// [0-5]: Destination MAC (6 bytes)
    /// [6-11]: Source MAC (6 bytes)
    /// [12-13]: EtherType (2 bytes)
    pub fn of(data: &[u8]) -> Self {
        match data.get(12..ETHERNET_HEADER_LEN) {
            Some(&[hi, lo]) => Self::from_ethertype(u16::from_be_bytes([hi, lo])),
            _ => Self::Unknown,
        }
    }
}

/// Why a frame was not replayed. None of these stop the run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    #[error("IPv6 packet dropped")]
    Ipv6,

    #[error("ARP packet dropped")]
    Arp,

    #[error("non-IP packet dropped (ethertype {0:#06x})")]
    NonIp(u16),

    #[error("non-IP packet dropped (no Ethernet header)")]
    NoLinkHeader,

    #[error("truncated frame dropped ({caplen} bytes captured, {needed} needed)")]
    TruncatedFrame { caplen: usize, needed: usize },

    #[error("non-UDP packet dropped (IP protocol {0})")]
    NotUdp(u8),

    #[error("IPv4 fragment dropped")]
    Fragment,

    #[error("packet with malformed {0} header dropped")]
    Malformed(&'static str),
}

impl DropReason {
    /// IPv6 is out of scope in fixed-offset mode and is skipped without noise.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Ipv6)
    }
}

/// Decides whether a frame goes on to payload extraction.
///
/// IPv4 always proceeds. IPv6 proceeds only when headers are walked, since the
/// fixed offset assumes an IPv4 header.
pub fn classify(frame: &CapturedFrame<'_>, mode: ExtractMode) -> Result<LinkType, DropReason> {
    match LinkType::of(frame.bytes()) {
        LinkType::Ipv4 => Ok(LinkType::Ipv4),
        LinkType::Ipv6 if mode == ExtractMode::Headers => Ok(LinkType::Ipv6),
        LinkType::Ipv6 => Err(DropReason::Ipv6),
        LinkType::Arp => Err(DropReason::Arp),
        LinkType::Other(ethertype) => Err(DropReason::NonIp(ethertype)),
        LinkType::Unknown => Err(DropReason::NoLinkHeader),
    }
}
