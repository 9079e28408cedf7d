use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use bulwark_core::ActionLog;

const TRANSFER_DOMAIN: &str = "bulwark";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded action log.
pub(crate) const TRANSFER_HEADER: &str = "bulwark:v1";
/// Delimiter used to separate the prefix, tick count and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes an action log into a single-line string suitable for pasting.
///
/// The tick count segment records how many ticks schedule actions so a
/// truncated payload is caught before it is replayed.
pub(crate) fn encode(actions: &ActionLog) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(actions)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{TRANSFER_HEADER}:{}:{encoded}", actions.len()))
}

/// Decodes an action log from its transfer string.
pub(crate) fn decode(value: &str) -> Result<ActionLog, ReplayTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReplayTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(ReplayTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(ReplayTransferError::MissingVersion)?;
    let ticks = parts.next().ok_or(ReplayTransferError::MissingTickCount)?;
    let payload = parts.next().ok_or(ReplayTransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(ReplayTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(ReplayTransferError::UnsupportedVersion(version.to_owned()));
    }

    let ticks = ticks
        .trim()
        .parse::<usize>()
        .map_err(|_| ReplayTransferError::InvalidTickCount(ticks.to_owned()))?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(ReplayTransferError::InvalidEncoding)?;
    let actions: ActionLog =
        serde_json::from_slice(&bytes).map_err(ReplayTransferError::InvalidPayload)?;

    if actions.len() != ticks {
        return Err(ReplayTransferError::TickCountMismatch {
            declared: ticks,
            decoded: actions.len(),
        });
    }
    Ok(actions)
}

/// Reports whether a command-line value looks like a transfer string rather than a path.
pub(crate) fn is_transfer_string(value: &str) -> bool {
    value
        .trim()
        .strip_prefix(TRANSFER_DOMAIN)
        .is_some_and(|rest| rest.starts_with(FIELD_DELIMITER))
}

/// Errors that can occur while decoding action-log transfer strings.
#[derive(Debug)]
pub(crate) enum ReplayTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing.
    MissingPrefix,
    /// The version segment was missing.
    MissingVersion,
    /// The tick count segment was missing.
    MissingTickCount,
    /// The payload segment was missing.
    MissingPayload,
    /// The string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The tick count could not be parsed.
    InvalidTickCount(String),
    /// The declared tick count disagrees with the decoded log.
    TickCountMismatch {
        /// Tick count written in the header.
        declared: usize,
        /// Ticks present in the payload.
        decoded: usize,
    },
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for ReplayTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "action log string was empty"),
            Self::MissingPrefix => write!(f, "action log string is missing the prefix"),
            Self::MissingVersion => write!(f, "action log string is missing the version"),
            Self::MissingTickCount => write!(f, "action log string is missing the tick count"),
            Self::MissingPayload => write!(f, "action log string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "action log version '{version}' is not supported")
            }
            Self::InvalidTickCount(ticks) => write!(f, "could not parse tick count '{ticks}'"),
            Self::TickCountMismatch { declared, decoded } => write!(
                f,
                "header declares {declared} scheduled ticks but the payload holds {decoded}"
            ),
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode action log payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse action log payload: {error}")
            }
        }
    }
}

impl Error for ReplayTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}
