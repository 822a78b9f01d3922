use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{info, warn};
use pcap::{Capture, Error, Linktype, Offline};
use std::path::Path;

/// One packet event as delivered by a capture source.
///
/// `data` borrows the source's internal buffer and is only valid until the
/// next call to [`FrameSource::next_frame`].
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub data: &'a [u8],
    /// Bytes actually captured (`data.len()` for well-formed sources)
    pub caplen: u32,
    /// Length of the packet on the wire
    pub len: u32,
    pub timestamp_ns: i64,
}

impl<'a> CapturedFrame<'a> {
    /// The captured bytes, never longer than `caplen`.
    pub fn bytes(&self) -> &'a [u8] {
        let caplen = (self.caplen as usize).min(self.data.len());
        &self.data[..caplen]
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        DateTime::<Local>::from(DateTime::from_timestamp_nanos(self.timestamp_ns))
    }

    pub fn is_snapped(&self) -> bool {
        self.caplen < self.len
    }
}

/// Anything that hands out captured frames in order.
pub trait FrameSource {
    /// Returns the next frame, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame<'_>>>;
}

impl FrameSource for Capture<Offline> {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame<'_>>> {
        match self.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let timestamp_ns = (header.ts.tv_sec as i64)
                    .saturating_mul(1_000_000_000)
                    .saturating_add(header.ts.tv_usec as i64 * 1_000);
                // caplen can never exceed what libpcap handed us
                let caplen = header.caplen.min(packet.data.len() as u32);
                Ok(Some(CapturedFrame {
                    data: packet.data,
                    caplen,
                    len: header.len,
                    timestamp_ns,
                }))
            }
            Err(Error::NoMorePackets) => Ok(None),
            Err(e) => Err(e).context("Error reading packet from capture"),
        }
    }
}

pub struct CaptureLoader;

impl CaptureLoader {
    /// Opens an offline capture from `path`, or from standard input when no
    /// path is given.
    pub fn open(path: Option<&Path>) -> Result<Capture<Offline>> {
        let cap = match path {
            Some(path) => {
                info!("Opening capture file: {}", path.display());
                Capture::from_file(path)
                    .with_context(|| format!("Cannot open capture {}", path.display()))?
            }
            None => {
                info!("Reading capture from standard input");
                Self::open_stdin()?
            }
        };

        let linktype = cap.get_datalink();
        if linktype != Linktype::ETHERNET {
            warn!(
                "Capture link type is {} rather than Ethernet, most frames will be dropped",
                linktype.get_name().unwrap_or_else(|_| linktype.0.to_string())
            );
        }

        Ok(cap)
    }

    #[cfg(unix)]
    fn open_stdin() -> Result<Capture<Offline>> {
        use std::os::fd::AsRawFd;

        let fd = std::io::stdin().as_raw_fd();
        // SAFETY: stdin stays open for the life of the process and libpcap
        // only reads from the descriptor.
        unsafe { Capture::from_raw_fd(fd) }.context("Cannot open capture from standard input")
    }

    #[cfg(not(unix))]
    fn open_stdin() -> Result<Capture<Offline>> {
        anyhow::bail!("Reading a capture from standard input is not supported on this platform")
    }
}

/// In-memory frames, for driving the replay loop without a capture file.
#[cfg(test)]
pub struct FrameList {
    frames: std::collections::VecDeque<Vec<u8>>,
    current: Vec<u8>,
}

#[cfg(test)]
impl FrameList {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            current: Vec::new(),
        }
    }
}

#[cfg(test)]
impl FrameSource for FrameList {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame<'_>>> {
        let Some(next) = self.frames.pop_front() else {
            return Ok(None);
        };
        self.current = next;
        let caplen = self.current.len() as u32;
        Ok(Some(CapturedFrame {
            data: &self.current,
            caplen,
            len: caplen,
            timestamp_ns: 0,
        }))
    }
}
