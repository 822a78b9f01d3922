mod classify;
mod extract;
pub mod message;

#[cfg(test)]
pub(crate) mod fixtures;

pub use classify::{DropReason, LinkType, classify};
pub use extract::{DNS_UDP_OFFSET, ExtractMode, extract_payload};
