//! Error types shared across the crate.
//!
//! None of these are fatal to the dashboard itself: feed errors close the stream, ingest errors
//! skip a single record and config errors are only raised before anything is running.
use derive_more::{Display, Error};

use crate::record::RecordId;

#[derive(Debug, Display, Error)]
pub enum FeedError {
    #[display("feed exhausted")]
    Exhausted,
    #[display("feed has already been subscribed")]
    AlreadySubscribed,
    #[display("malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[display("feed io error: {source}")]
    Io {
        #[error(source)]
        source: std::io::Error,
    },
    #[display("feed disconnected: {reason}")]
    Disconnected { reason: String },
}

#[derive(Debug, Display, Error, PartialEq)]
pub enum IngestError {
    #[display("record {id} has a non-finite amount")]
    NonFiniteAmount { id: RecordId },
}

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("could not read config: {source}")]
    Io {
        #[error(source)]
        source: std::io::Error,
    },
    #[display("could not parse config: {source}")]
    Parse {
        #[error(source)]
        source: serde_json::Error,
    },
    #[display("invalid config: {reason}")]
    Invalid { reason: String },
}
