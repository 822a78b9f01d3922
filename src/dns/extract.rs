use super::classify::{DropReason, ETHERNET_HEADER_LEN, LinkType};
use crate::pcap::CapturedFrame;

/// Ethernet (14) + IPv4 without options (20) + UDP (8)
pub const DNS_UDP_OFFSET: usize = 42;

const UDP_HEADER_LEN: usize = 8;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
const IPPROTO_UDP: u8 = 17;

/// How the start of the DNS message inside a frame is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Skip [`DNS_UDP_OFFSET`] bytes, assuming Ethernet + option-less IPv4 + UDP.
    #[default]
    Fixed,
    /// Walk the Ethernet, IPv4/IPv6 and UDP headers.
    Headers,
}

/// Returns the DNS message carried by an IP frame, borrowed from the frame.
pub fn extract_payload<'a>(
    frame: &CapturedFrame<'a>,
    link: LinkType,
    mode: ExtractMode,
) -> Result<&'a [u8], DropReason> {
    let data = frame.bytes();
    match mode {
        ExtractMode::Fixed => fixed_offset(data),
        ExtractMode::Headers => walk_headers(data, link),
    }
}

fn fixed_offset(data: &[u8]) -> Result<&[u8], DropReason> {
    data.get(DNS_UDP_OFFSET..).ok_or(DropReason::TruncatedFrame {
        caplen: data.len(),
        needed: DNS_UDP_OFFSET,
    })
}

fn walk_headers(data: &[u8], link: LinkType) -> Result<&[u8], DropReason> {
    let ip_header_len = match link {
        LinkType::Ipv4 => ipv4_header_len(data)?,
        LinkType::Ipv6 => ipv6_header_len(data)?,
        LinkType::Arp => return Err(DropReason::Arp),
        LinkType::Other(ethertype) => return Err(DropReason::NonIp(ethertype)),
        LinkType::Unknown => return Err(DropReason::NoLinkHeader),
    };

    let udp_start = ETHERNET_HEADER_LEN + ip_header_len;
    udp_payload(data, udp_start)
}

/// Parse IPv4 header (RFC 791)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Version|  IHL  |Type of Service|          Total Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Identification        |Flags|      Fragment Offset    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Time to Live |    Protocol   |         Header Checksum       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// IHL counts 32-bit words, so options are included in the returned length.
/// Fragments are rejected: only the first one carries the UDP header and
/// the DNS message would be incomplete anyway.
fn ipv4_header_len(data: &[u8]) -> Result<usize, DropReason> {
    let ip = ip_header(data, IPV4_MIN_HEADER_LEN)?;
    if ip[0] >> 4 != 4 {
        return Err(DropReason::Malformed("IPv4"));
    }

    let ihl = (ip[0] & 0x0F) as usize * 4;
    if ihl < IPV4_MIN_HEADER_LEN {
        return Err(DropReason::Malformed("IPv4"));
    }
    if ip.len() < ihl {
        return Err(truncated(data.len(), ETHERNET_HEADER_LEN + ihl));
    }

    // MF flag or a non-zero fragment offset
    let frag = u16::from_be_bytes([ip[6], ip[7]]);
    if frag & 0x3FFF != 0 {
        return Err(DropReason::Fragment);
    }

    if ip[9] != IPPROTO_UDP {
        return Err(DropReason::NotUdp(ip[9]));
    }

    Ok(ihl)
}

/// Parse IPv6 header (RFC 2460). Fixed 40 bytes; extension headers are not
/// followed, so the Next Header field must already be UDP.
fn ipv6_header_len(data: &[u8]) -> Result<usize, DropReason> {
    let ip = ip_header(data, IPV6_HEADER_LEN)?;
    if ip[0] >> 4 != 6 {
        return Err(DropReason::Malformed("IPv6"));
    }
    if ip[6] != IPPROTO_UDP {
        return Err(DropReason::NotUdp(ip[6]));
    }
    Ok(IPV6_HEADER_LEN)
}

/// Everything after the Ethernet header, provided at least `min_len` bytes of
/// it were captured.
fn ip_header(data: &[u8], min_len: usize) -> Result<&[u8], DropReason> {
    let needed = ETHERNET_HEADER_LEN + min_len;
    if data.len() < needed {
        return Err(truncated(data.len(), needed));
    }
    Ok(&data[ETHERNET_HEADER_LEN..])
}

/// UDP Header: 8 bytes
/// [0-1]: Source Port
/// [2-3]: Destination Port
/// [4-5]: Length (header + payload)
/// [6-7]: Checksum
///
/// The length field trims Ethernet padding off short datagrams. A snapped
/// frame yields whatever part of the payload was captured.
fn udp_payload(data: &[u8], udp_start: usize) -> Result<&[u8], DropReason> {
    let payload_start = udp_start + UDP_HEADER_LEN;
    if data.len() < payload_start {
        return Err(truncated(data.len(), payload_start));
    }

    let udp_len = u16::from_be_bytes([data[udp_start + 4], data[udp_start + 5]]) as usize;
    if udp_len < UDP_HEADER_LEN {
        return Err(DropReason::Malformed("UDP"));
    }

    let payload_end = (udp_start + udp_len).min(data.len());
    Ok(&data[payload_start..payload_end])
}

fn truncated(caplen: usize, needed: usize) -> DropReason {
    DropReason::TruncatedFrame { caplen, needed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::fixtures::{captured, ipv4_udp_frame, ipv6_udp_frame};
    use proptest::prelude::*;

    #[test]
    fn fixed_offset_skips_42_bytes() {
        let dns = [0xAB, 0xCD, 0x01, 0x00];
        let frame = ipv4_udp_frame(&dns, 0);
        let payload = extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Fixed);
        assert_eq!(payload, Ok(&dns[..]));
    }

    #[test]
    fn fixed_offset_of_exactly_42_bytes_is_empty() {
        let frame = vec![0u8; DNS_UDP_OFFSET];
        let payload = extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Fixed);
        assert_eq!(payload, Ok(&[0u8; 0][..]));
    }

    #[test]
    fn fixed_offset_misreads_ip_options_but_headers_mode_does_not() {
        let dns = [0x12, 0x34, 0x01, 0x00, 0x00, 0x01];
        let frame = ipv4_udp_frame(&dns, 8);

        let fixed = extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Fixed).unwrap();
        assert_ne!(fixed, &dns[..]);

        let walked = extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Headers);
        assert_eq!(walked, Ok(&dns[..]));
    }

    #[test]
    fn headers_mode_trims_ethernet_padding() {
        let dns = [0x12, 0x34];
        let mut frame = ipv4_udp_frame(&dns, 0);
        frame.resize(60, 0);

        let walked = extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Headers);
        assert_eq!(walked, Ok(&dns[..]));
    }

    #[test]
    fn headers_mode_extracts_ipv6() {
        let dns = [0xBE, 0xEF, 0x01, 0x00];
        let frame = ipv6_udp_frame(&dns);
        let walked = extract_payload(&captured(&frame), LinkType::Ipv6, ExtractMode::Headers);
        assert_eq!(walked, Ok(&dns[..]));
    }

    #[test]
    fn headers_mode_rejects_tcp_and_fragments() {
        let mut tcp = ipv4_udp_frame(&[0; 12], 0);
        tcp[ETHERNET_HEADER_LEN + 9] = 6;
        assert_eq!(
            extract_payload(&captured(&tcp), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::NotUdp(6))
        );

        let mut fragment = ipv4_udp_frame(&[0; 12], 0);
        fragment[ETHERNET_HEADER_LEN + 6] = 0x20;
        assert_eq!(
            extract_payload(&captured(&fragment), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::Fragment)
        );
    }

    #[test]
    fn headers_mode_rejects_bad_ihl() {
        let mut frame = ipv4_udp_frame(&[0; 12], 0);
        frame[ETHERNET_HEADER_LEN] = 0x43;
        assert_eq!(
            extract_payload(&captured(&frame), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::Malformed("IPv4"))
        );
    }

    #[test]
    fn headers_mode_reports_truncation_against_the_whole_frame() {
        let frame = ipv4_udp_frame(&[0; 12], 0);
        let short = &frame[..ETHERNET_HEADER_LEN + 10];
        assert_eq!(
            extract_payload(&captured(short), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::TruncatedFrame {
                caplen: 24,
                needed: 34
            })
        );

        let with_options = ipv4_udp_frame(&[0; 12], 8);
        let short = &with_options[..ETHERNET_HEADER_LEN + 24];
        assert_eq!(
            extract_payload(&captured(short), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::TruncatedFrame {
                caplen: 38,
                needed: 42
            })
        );

        let v6 = ipv6_udp_frame(&[0; 12]);
        let short = &v6[..ETHERNET_HEADER_LEN + 30];
        assert_eq!(
            extract_payload(&captured(short), LinkType::Ipv6, ExtractMode::Headers),
            Err(DropReason::TruncatedFrame {
                caplen: 44,
                needed: 54
            })
        );

        let no_udp = &frame[..ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN + 4];
        assert_eq!(
            extract_payload(&captured(no_udp), LinkType::Ipv4, ExtractMode::Headers),
            Err(DropReason::TruncatedFrame {
                caplen: 38,
                needed: 42
            })
        );
    }

    proptest! {
        #[test]
        fn fixed_payload_is_caplen_minus_offset(data in proptest::collection::vec(any::<u8>(), DNS_UDP_OFFSET..1500)) {
            let payload = extract_payload(&captured(&data), LinkType::Ipv4, ExtractMode::Fixed).unwrap();
            prop_assert_eq!(payload.len(), data.len() - DNS_UDP_OFFSET);
            prop_assert_eq!(payload, &data[DNS_UDP_OFFSET..]);
        }

        #[test]
        fn short_frames_are_truncated(data in proptest::collection::vec(any::<u8>(), 0..DNS_UDP_OFFSET)) {
            let result = extract_payload(&captured(&data), LinkType::Ipv4, ExtractMode::Fixed);
            prop_assert_eq!(
                result,
                Err(DropReason::TruncatedFrame { caplen: data.len(), needed: DNS_UDP_OFFSET })
            );
        }
    }
}
