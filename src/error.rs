//! Error types for injagent.

use serde::Serialize;

/// Top-level error type for the transaction core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while deriving identities or building, simulating, signing,
/// and broadcasting transactions.
///
/// Simulation and broadcast variants preserve the chain-reported reason string
/// verbatim; callers branch on the variant, not on message contents.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid private key: {reason}")]
    InvalidKeyFormat { reason: String },

    #[error("Invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Account {address} not found on chain")]
    AccountNotFound { address: String },

    #[error("Network unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    #[error("Simulation failed: {reason}")]
    SimulationFailed { reason: String },

    #[error("Broadcast rejected (code {code}): {reason}")]
    BroadcastRejected {
        code: u32,
        reason: String,
        /// Gas figures from the simulate step. The transaction reached the
        /// mempool check, so the caller should know what it was asking for.
        gas_wanted: u64,
        gas_fee: String,
    },

    #[error("No unique market matches '{ticker}': {detail}")]
    AmbiguousMarket { ticker: String, detail: String },

    #[error("Request timed out: {reason}")]
    Timeout { reason: String },

    #[error("Unknown chain error: {cause}")]
    Unknown { cause: String },
}

/// Stable machine-readable error category, surfaced in execution reports.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidKeyFormat,
    InvalidArgument,
    AccountNotFound,
    NetworkUnreachable,
    SimulationFailed,
    BroadcastRejected,
    AmbiguousMarket,
    Timeout,
    Unknown,
}

/// Structured failure payload carried in execution reports.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailurePayload {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyFormat { .. } => ErrorKind::InvalidKeyFormat,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            Self::NetworkUnreachable { .. } => ErrorKind::NetworkUnreachable,
            Self::SimulationFailed { .. } => ErrorKind::SimulationFailed,
            Self::BroadcastRejected { .. } => ErrorKind::BroadcastRejected,
            Self::AmbiguousMarket { .. } => ErrorKind::AmbiguousMarket,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Whether the *read path* that produced this error may be retried.
    ///
    /// Broadcasts are never auto-retried regardless of this flag: a rejected
    /// transaction retried with a stale sequence fails again or double-spends
    /// gas. Only idempotent GET-style lookups consult this.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnreachable { .. } | Self::Timeout { .. }
        )
    }

    pub fn to_failure_payload(&self) -> FailurePayload {
        FailurePayload {
            kind: self.kind(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                reason: err.to_string(),
            }
        } else if err.is_connect() || err.is_request() {
            Self::NetworkUnreachable {
                reason: err.to_string(),
            }
        } else {
            Self::Unknown {
                cause: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_transport(err)
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unknown {
            cause: format!("response decode failed: {err}"),
        }
    }
}

/// Result type alias for the transaction core.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for chain-facing operations.
pub type ChainResult<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_rejection_keeps_gas_figures() {
        let err = ChainError::BroadcastRejected {
            code: 32,
            reason: "account sequence mismatch".to_string(),
            gas_wanted: 120_000,
            gas_fee: "0.00006 INJ".to_string(),
        };

        assert_eq!(err.kind(), ErrorKind::BroadcastRejected);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("code 32"));
        assert!(err.to_string().contains("sequence mismatch"));
    }

    #[test]
    fn transport_timeouts_are_retryable_reads() {
        let err = ChainError::Timeout {
            reason: "deadline elapsed".to_string(),
        };
        let payload = err.to_failure_payload();

        assert_eq!(payload.kind, ErrorKind::Timeout);
        assert!(payload.retryable);
    }

    #[test]
    fn simulation_failures_are_terminal() {
        let err = ChainError::SimulationFailed {
            reason: "insufficient funds".to_string(),
        };

        assert!(!err.is_retryable());
        assert_eq!(err.to_failure_payload().kind, ErrorKind::SimulationFailed);
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[test]
    fn failure_payload_serializes_snake_case_kind() {
        let payload = ChainError::AmbiguousMarket {
            ticker: "XYZ/USDT PERP".to_string(),
            detail: "no listing matched".to_string(),
        }
        .to_failure_payload();
        let value = serde_json::to_value(&payload).expect("valid json");

        assert_eq!(value["kind"], "ambiguous_market");
        assert_eq!(value["retryable"], false);
    }

    #[test]
    fn top_level_error_wraps_domains() {
        let err = Error::from(ConfigError::InvalidValue {
            key: "INJAGENT_GAS_PRICE".to_string(),
            message: "not an integer".to_string(),
        });

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("INJAGENT_GAS_PRICE"));
    }
}
