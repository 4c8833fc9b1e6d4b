//! Error types for the collection pipeline.
//!
//! Collection failures never escape the collector: every variant below ends
//! as a logged diagnostic plus a published sentinel value. The variants
//! exist so the log line can say which stage failed, because the exported
//! value cannot.

use std::fmt;

/// Failure of a single endpoint's fetch-parse-compute sequence.
#[derive(Debug)]
pub enum CollectError {
    /// The outbound request failed (connection refused, DNS failure,
    /// timeout, or an error while reading the response body)
    Transport {
        /// The endpoint that was being polled
        url: String,
        /// The underlying client error
        source: reqwest::Error,
    },

    /// The response body could not be decoded as the expected JSON shape
    MalformedBody {
        /// The endpoint that was being polled
        url: String,
        /// The underlying decode error
        source: serde_json::Error,
    },

    /// The response decoded but carried no `DateLimit` value
    MissingDateLimit {
        /// The endpoint that was being polled
        url: String,
    },

    /// The `DateLimit` string did not match the expected timestamp layout
    UnparseableDate {
        /// The endpoint that was being polled
        url: String,
        /// The offending string, for the log line
        value: String,
        /// The underlying parse error
        source: chrono::ParseError,
    },
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { url, source } => {
                write!(f, "request to {} failed: {}", url, source)
            }
            Self::MalformedBody { url, source } => {
                write!(f, "response from {} is not valid JSON: {}", url, source)
            }
            Self::MissingDateLimit { url } => {
                write!(f, "response from {} carries an empty DateLimit", url)
            }
            Self::UnparseableDate { url, value, source } => {
                write!(
                    f,
                    "DateLimit {:?} from {} does not match YYYY-MM-DD HH:MM:SS: {}",
                    value, url, source
                )
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::MalformedBody { source, .. } => Some(source),
            Self::UnparseableDate { source, .. } => Some(source),
            Self::MissingDateLimit { .. } => None,
        }
    }
}
