mod driver;
mod record;
mod transport;

pub use driver::{FrameOutcome, ReplayDriver, ReplayStats, SequenceMode};
pub use record::{FORMAT_VERSION, RecordEmitter, RecordError, RecordReader, ReplayRecord};
pub use transport::{MAX_DNS_UDP_SIZE, QueryTransport, TransportError};
