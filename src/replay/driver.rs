use super::record::RecordEmitter;
use super::transport::{QueryTransport, TransportError};
use crate::dns::{self, DropReason, ExtractMode};
use crate::pcap::{CapturedFrame, FrameSource};
use anyhow::{Context, Result};
use bytes::BytesMut;
use log::{debug, info, warn};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Which counter a record's sequence number comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceMode {
    /// 1-based position of the frame in the capture, whether or not it was
    /// answered. Two runs over one capture line up record for record.
    #[default]
    Frame,
    /// 1-based count of records written, without gaps.
    Record,
}

#[derive(Debug)]
pub enum FrameOutcome {
    Emitted { frame: u64, sequence: u64 },
    Dropped { frame: u64, reason: DropReason },
    Failed { frame: u64, error: TransportError },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: u64,
    pub emitted: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Pulls frames from a capture and replays the DNS query in each of them.
///
/// Every frame goes through classify, extract, send/receive and emit before
/// the next one is read. A frame that fails at any stage is reported and
/// skipped; only capture read errors and output errors end the run.
pub struct ReplayDriver<W: Write> {
    transport: QueryTransport,
    emitter: RecordEmitter<W>,
    extract: ExtractMode,
    sequence: SequenceMode,
    query: BytesMut,
    stats: ReplayStats,
}

impl<W: Write> ReplayDriver<W> {
    pub fn new(
        transport: QueryTransport,
        emitter: RecordEmitter<W>,
        extract: ExtractMode,
        sequence: SequenceMode,
    ) -> Self {
        Self {
            transport,
            emitter,
            extract,
            sequence,
            query: BytesMut::with_capacity(4096),
            stats: ReplayStats::default(),
        }
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn into_emitter(self) -> RecordEmitter<W> {
        self.emitter
    }

    /// Replays frames until the source is exhausted or `cancel` fires.
    pub async fn run<S: FrameSource>(
        &mut self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<ReplayStats> {
        info!(
            "Replaying queries against {} ({:?} extraction, {:?} numbering)",
            self.transport.destination(),
            self.extract,
            self.sequence
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Replay interrupted");
                    break;
                }
                step = self.step(source) => {
                    if step?.is_none() {
                        break;
                    }
                }
            }
        }

        Ok(self.stats)
    }

    /// Processes one frame. Returns `None` once the source is exhausted.
    pub async fn step<S: FrameSource>(&mut self, source: &mut S) -> Result<Option<FrameOutcome>> {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("{e:#}, stopping");
                return Ok(None);
            }
        };

        self.stats.frames += 1;
        let ordinal = self.stats.frames;
        debug!(
            "Frame #{ordinal} captured at {}: {} of {} bytes",
            frame.captured_at().format("%Y-%m-%d %H:%M:%S%.6f"),
            frame.caplen,
            frame.len
        );
        if frame.is_snapped() {
            debug!("Frame #{ordinal} was cut short by the capture snap length");
        }

        let outcome = match self.load_query(&frame) {
            Err(reason) => {
                self.stats.dropped += 1;
                FrameOutcome::Dropped {
                    frame: ordinal,
                    reason,
                }
            }
            Ok(()) => match self.transport.send_and_receive(&self.query).await {
                Ok(answer) => {
                    let sequence = match self.sequence {
                        SequenceMode::Frame => ordinal,
                        SequenceMode::Record => self.stats.emitted + 1,
                    };
                    self.emitter
                        .emit(sequence, &self.query, answer)
                        .context("Cannot write replay record")?;
                    self.stats.emitted += 1;
                    FrameOutcome::Emitted {
                        frame: ordinal,
                        sequence,
                    }
                }
                Err(error) => {
                    self.stats.failed += 1;
                    FrameOutcome::Failed {
                        frame: ordinal,
                        error,
                    }
                }
            },
        };
        self.query.clear();

        report(&outcome);
        Ok(Some(outcome))
    }

    /// Classifies the frame and copies its DNS message into the query buffer.
    fn load_query(&mut self, frame: &CapturedFrame<'_>) -> Result<(), DropReason> {
        let link = dns::classify(frame, self.extract)?;
        let payload = dns::extract_payload(frame, link, self.extract)?;

        self.query.clear();
        self.query.extend_from_slice(payload);
        Ok(())
    }
}

fn report(outcome: &FrameOutcome) {
    match outcome {
        FrameOutcome::Emitted { frame, sequence } => {
            debug!("Frame #{frame} answered, written as record {sequence}");
        }
        FrameOutcome::Dropped { frame, reason } if reason.is_silent() => {
            debug!("Frame #{frame}: {reason}");
        }
        FrameOutcome::Dropped { frame, reason } => warn!("Frame #{frame}: {reason}"),
        FrameOutcome::Failed { frame, error } => warn!("Frame #{frame}: {error}"),
    }
}
