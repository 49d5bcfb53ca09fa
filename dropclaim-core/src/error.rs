//! Error types for Dropclaim.
//!
//! Every failure that crosses the data-access boundary ends up as a
//! [`ClassifiedError`]: a closed [`ErrorKind`], a human message, a free-form
//! diagnostic context, a creation timestamp, and a retryability flag that is
//! fixed when the error is built.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-form diagnostic payload attached to an error. Not validated.
pub type ErrorContext = BTreeMap<String, serde_json::Value>;

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Transport-level failure talking to the chain.
    NetworkError,
    /// The remote end did not answer in time.
    ConnectionTimeout,
    /// The remote procedure call itself failed.
    RpcError,
    /// A wallet or account key is not a valid public key.
    InvalidPublicKey,
    /// The requested account does not exist.
    AccountNotFound,
    /// The requested campaign does not exist.
    CampaignNotFound,
    /// The account exists but its data could not be decoded.
    InvalidAccountData,
    /// No wallet is connected.
    WalletNotConnected,
    /// The wallet disconnected mid-flow.
    WalletDisconnected,
    /// The wallet refused or lacks permission.
    Unauthorized,
    /// Input or record in an unexpected shape.
    InvalidDataFormat,
    /// A required field is missing from a record.
    MissingRequiredField,
    /// Input failed a domain validation rule.
    ValidationError,
    /// The claim transaction was rejected.
    TransactionFailed,
    /// The claim transaction was not confirmed in time.
    TransactionTimeout,
    /// Anything the classifier does not recognise.
    Unknown,
    /// A bug in this crate.
    Internal,
    /// Misconfiguration of the client.
    Configuration,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 18] = [
        ErrorKind::NetworkError,
        ErrorKind::ConnectionTimeout,
        ErrorKind::RpcError,
        ErrorKind::InvalidPublicKey,
        ErrorKind::AccountNotFound,
        ErrorKind::CampaignNotFound,
        ErrorKind::InvalidAccountData,
        ErrorKind::WalletNotConnected,
        ErrorKind::WalletDisconnected,
        ErrorKind::Unauthorized,
        ErrorKind::InvalidDataFormat,
        ErrorKind::MissingRequiredField,
        ErrorKind::ValidationError,
        ErrorKind::TransactionFailed,
        ErrorKind::TransactionTimeout,
        ErrorKind::Unknown,
        ErrorKind::Internal,
        ErrorKind::Configuration,
    ];

    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::RpcError => "RPC_ERROR",
            Self::InvalidPublicKey => "INVALID_PUBLIC_KEY",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::CampaignNotFound => "CAMPAIGN_NOT_FOUND",
            Self::InvalidAccountData => "INVALID_ACCOUNT_DATA",
            Self::WalletNotConnected => "WALLET_NOT_CONNECTED",
            Self::WalletDisconnected => "WALLET_DISCONNECTED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidDataFormat => "INVALID_DATA_FORMAT",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::TransactionTimeout => "TRANSACTION_TIMEOUT",
            Self::Unknown => "UNKNOWN",
            Self::Internal => "INTERNAL",
            Self::Configuration => "CONFIGURATION",
        }
    }

    /// Whether a failure of this kind may succeed if attempted again unchanged.
    pub fn default_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::ConnectionTimeout
                | Self::RpcError
                | Self::TransactionTimeout
                | Self::Unknown
        )
    }

    /// User-facing message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkError => {
                "Network connection failed. Please check your internet connection and try again."
            }
            Self::ConnectionTimeout => "The request timed out. Please try again.",
            Self::RpcError => "The blockchain node returned an error. Please try again shortly.",
            Self::InvalidPublicKey => "The provided address is not a valid public key.",
            Self::AccountNotFound => "The requested account was not found on chain.",
            Self::CampaignNotFound => "This airdrop campaign could not be found.",
            Self::InvalidAccountData => "The on-chain account data could not be read.",
            Self::WalletNotConnected => "Please connect your wallet to continue.",
            Self::WalletDisconnected => "Your wallet was disconnected. Please reconnect it.",
            Self::Unauthorized => "The wallet did not authorize this action.",
            Self::InvalidDataFormat => "The data received was in an unexpected format.",
            Self::MissingRequiredField => "Some required information is missing.",
            Self::ValidationError => "The provided input is invalid.",
            Self::TransactionFailed => "The claim transaction failed. No tokens were transferred.",
            Self::TransactionTimeout => {
                "The transaction was not confirmed in time. Check your wallet before retrying."
            }
            Self::Internal => "An internal error occurred.",
            Self::Configuration => "The application is misconfigured.",
            Self::Unknown => "An unexpected error occurred. Please try again.",
        }
    }

    /// Failures of the transport or remote node.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::ConnectionTimeout | Self::RpcError
        )
    }

    /// Failures caused by the wallet connection.
    pub fn is_wallet(&self) -> bool {
        matches!(
            self,
            Self::WalletNotConnected | Self::WalletDisconnected | Self::Unauthorized
        )
    }

    /// Lookups that found nothing. Callers treat these as legitimate absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound | Self::CampaignNotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure mapped into the [`ErrorKind`] taxonomy.
///
/// Built once and never mutated; the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    context: ErrorContext,
    timestamp: DateTime<Utc>,
    retryable: bool,
}

impl ClassifiedError {
    /// Create an error whose retryability is the kind's default.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_retryable(kind, message, kind.default_retryable())
    }

    /// Create an error with an explicit retryability.
    pub fn with_retryable(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::new(),
            timestamp: Utc::now(),
            retryable,
        }
    }

    /// Create an error carrying the kind's user-facing message.
    pub fn of_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.user_message())
    }

    /// Shorthand for the wallet precondition every per-user lookup checks.
    pub fn wallet_not_connected() -> Self {
        Self::of_kind(ErrorKind::WalletNotConnected)
    }

    /// Attach one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach several context entries. Existing keys are overwritten.
    pub fn with_context_map(mut self, context: ErrorContext) -> Self {
        self.context.extend(context);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Message to show to a user. Never the raw upstream text.
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// Result type alias for Dropclaim operations.
pub type Result<T> = std::result::Result<T, ClassifiedError>;
