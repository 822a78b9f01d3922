//! Frame and message builders shared by the unit tests.

use crate::pcap::CapturedFrame;

pub fn captured(data: &[u8]) -> CapturedFrame<'_> {
    CapturedFrame {
        data,
        caplen: data.len() as u32,
        len: data.len() as u32,
        timestamp_ns: 0,
    }
}

fn ethernet_header(ethertype: u16) -> Vec<u8> {
    let mut header = vec![0x02, 0, 0, 0, 0, 0x01, 0x02, 0, 0, 0, 0, 0x02];
    header.extend_from_slice(&ethertype.to_be_bytes());
    header
}

fn udp_header(payload_len: usize) -> Vec<u8> {
    let mut header = Vec::with_capacity(8);
    header.extend_from_slice(&40000u16.to_be_bytes());
    header.extend_from_slice(&53u16.to_be_bytes());
    header.extend_from_slice(&((8 + payload_len) as u16).to_be_bytes());
    header.extend_from_slice(&[0, 0]);
    header
}

/// Ethernet + IPv4 (carrying `options` extra header bytes) + UDP around `dns`.
pub fn ipv4_udp_frame(dns: &[u8], options: usize) -> Vec<u8> {
    let ihl = 20 + options;
    let mut ip = vec![0u8; ihl];
    ip[0] = 0x40 | (ihl / 4) as u8;
    ip[2..4].copy_from_slice(&((ihl + 8 + dns.len()) as u16).to_be_bytes());
    ip[8] = 64;
    ip[9] = 17;
    ip[12..16].copy_from_slice(&[192, 0, 2, 1]);
    ip[16..20].copy_from_slice(&[192, 0, 2, 53]);

    let mut frame = ethernet_header(0x0800);
    frame.extend_from_slice(&ip);
    frame.extend_from_slice(&udp_header(dns.len()));
    frame.extend_from_slice(dns);
    frame
}

pub fn ipv6_udp_frame(dns: &[u8]) -> Vec<u8> {
    let mut ip = vec![0u8; 40];
    ip[0] = 0x60;
    ip[4..6].copy_from_slice(&((8 + dns.len()) as u16).to_be_bytes());
    ip[6] = 17;
    ip[7] = 64;

    let mut frame = ethernet_header(0x86DD);
    frame.extend_from_slice(&ip);
    frame.extend_from_slice(&udp_header(dns.len()));
    frame.extend_from_slice(dns);
    frame
}

pub fn arp_frame() -> Vec<u8> {
    let mut frame = ethernet_header(0x0806);
    frame.extend_from_slice(&[0, 1, 0x08, 0, 6, 4, 0, 1]);
    frame.resize(60, 0);
    frame
}

/// A recursive A/IN query for `name`.
pub fn a_query(id: u16, name: &str) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&id.to_be_bytes());
    msg.extend_from_slice(&[0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
    for label in name.split('.') {
        msg.push(label.len() as u8);
        msg.extend_from_slice(label.as_bytes());
    }
    msg.extend_from_slice(&[0, 0, 1, 0, 1]);
    msg
}

/// `query` turned into a response with a single A record pointing at the question name.
pub fn response_to(query: &[u8]) -> Vec<u8> {
    let mut msg = query.to_vec();
    msg[2] |= 0x80;
    msg[3] |= 0x80;
    msg[7] = 1;
    msg.extend_from_slice(&[0xC0, 12, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 192, 0, 2, 10]);
    msg
}
