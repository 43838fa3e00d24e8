//! Typed errors for on-chain payload decoding
//!
//! Everything else in the pipeline reports through `eyre`; decoding gets its
//! own type so a malformed factory log is distinguishable from an RPC outage.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("log has no topics")]
    MissingTopic,

    #[error("unexpected event topic 0x{topic} (expected ProxyCreated)")]
    UnexpectedTopic { topic: String },

    #[error("malformed ProxyCreated log: {reason}")]
    Malformed { reason: String },
}
