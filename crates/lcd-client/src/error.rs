//! Error taxonomy for the client pipeline

use lcd_keyring::KeyringError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Gas or fee could not be determined
    #[error("fee estimation failed: {reason}")]
    Estimation {
        reason: String,
        gas_used: Option<u64>,
        denom: Option<String>,
    },

    /// The key at position `signer` in the signer list failed
    #[error("signer {signer} failed: {source}")]
    Signing {
        signer: usize,
        #[source]
        source: KeyringError,
    },

    #[error("account sequence mismatch: {message}")]
    SequenceConflict {
        expected: Option<u64>,
        got: Option<u64>,
        message: String,
    },

    #[error("transport error (status {status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("failed to decode node response: {0}")]
    Decode(String),

    #[error("invalid transaction: {0}")]
    InvalidTx(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Node result codes the client reacts to
pub mod codes {
    /// Codespace of errors raised by the SDK itself
    pub const SDK_CODESPACE: &str = "sdk";
    pub const OK: u32 = 0;
    /// `ErrWrongSequence`
    pub const WRONG_SEQUENCE: u32 = 32;
}

impl Error {
    pub(crate) fn estimation(reason: impl Into<String>) -> Self {
        Error::Estimation {
            reason: reason.into(),
            gas_used: None,
            denom: None,
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Sequence conflict built from a node message, with the numbers filled
    /// in when the message carries them
    pub(crate) fn sequence_conflict(message: &str) -> Self {
        let (expected, got) = parse_sequence_mismatch(message).unwrap_or((None, None));
        Error::SequenceConflict {
            expected,
            got,
            message: message.to_string(),
        }
    }

    /// True when the failing signer's key material could not be reached
    pub fn is_key_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Signing {
                source: KeyringError::KeyUnavailable(_),
                ..
            }
        )
    }
}

impl From<lcd_types::TxEncodeError> for Error {
    fn from(err: lcd_types::TxEncodeError) -> Self {
        Error::InvalidTx(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Whether a node message reports an account sequence mismatch
pub(crate) fn is_sequence_mismatch(message: &str) -> bool {
    message.contains("account sequence mismatch") || message.contains("incorrect account sequence")
}

/// Extract `(expected, got)` from `"account sequence mismatch, expected 5, got 4"`
pub(crate) fn parse_sequence_mismatch(message: &str) -> Option<(Option<u64>, Option<u64>)> {
    if !is_sequence_mismatch(message) {
        return None;
    }
    Some((number_after(message, "expected "), number_after(message, "got ")))
}

fn number_after(message: &str, marker: &str) -> Option<u64> {
    let start = message.find(marker)? + marker.len();
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
