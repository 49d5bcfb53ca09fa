//! Failure classifier.
//!
//! The chain-data SDK exposes no structured error codes, so failures are
//! recognised by lower-cased message substrings. The rules live in a single
//! ordered table; the first rule with a matching needle wins.

use crate::error::{ClassifiedError, ErrorContext, ErrorKind};

/// Message used when a failure carries no usable text.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Context key holding the upstream message of an unrecognised failure.
pub const ORIGINAL_ERROR_KEY: &str = "original_error";

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Lower-case substrings, any of which selects `kind`.
    pub needles: &'static [&'static str],
    pub kind: ErrorKind,
}

/// Ordered classification table.
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        needles: &["network", "fetch"],
        kind: ErrorKind::NetworkError,
    },
    ClassificationRule {
        needles: &["timeout"],
        kind: ErrorKind::ConnectionTimeout,
    },
    ClassificationRule {
        needles: &["account does not exist", "account not found"],
        kind: ErrorKind::AccountNotFound,
    },
    ClassificationRule {
        needles: &["invalid public key", "invalid address"],
        kind: ErrorKind::InvalidPublicKey,
    },
    ClassificationRule {
        needles: &["invalid account data"],
        kind: ErrorKind::InvalidAccountData,
    },
];

/// Anything a data-access call can fail with.
#[derive(Debug)]
pub enum RawFailure {
    /// Already classified; passed through untouched.
    Classified(ClassifiedError),
    /// An error value with a message.
    Error(Box<dyn std::error::Error + Send + Sync>),
    /// A bare string that is not an error value.
    Text(String),
    /// Something with no message at all.
    Opaque,
}

impl RawFailure {
    /// Wrap any error value.
    pub fn error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from(Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
    }
}

impl From<ClassifiedError> for RawFailure {
    fn from(err: ClassifiedError) -> Self {
        Self::Classified(err)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for RawFailure {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<ClassifiedError>() {
            Ok(classified) => Self::Classified(*classified),
            Err(other) => Self::Error(other),
        }
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(err: std::io::Error) -> Self {
        Self::error(err)
    }
}

impl From<serde_json::Error> for RawFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::error(err)
    }
}

impl From<String> for RawFailure {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawFailure {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Look up the kind for an error message, if any rule matches.
pub fn match_message(message: &str) -> Option<ErrorKind> {
    let lowered = message.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| lowered.contains(needle)))
        .map(|rule| rule.kind)
}

/// Map any failure into the taxonomy.
///
/// Already-classified errors are returned unchanged, so `classify` is
/// idempotent. `context` is attached to newly classified errors only.
pub fn classify(raw: impl Into<RawFailure>, context: ErrorContext) -> ClassifiedError {
    match raw.into() {
        RawFailure::Classified(err) => err,
        RawFailure::Error(err) => {
            let message = err.to_string();
            if message.is_empty() {
                return unknown(FALLBACK_MESSAGE, context);
            }
            match match_message(&message) {
                Some(kind) => ClassifiedError::new(kind, message).with_context_map(context),
                None => unknown(&message, context)
                    .with_context(ORIGINAL_ERROR_KEY, message.clone()),
            }
        }
        RawFailure::Text(text) if !text.is_empty() => unknown(&text, context),
        RawFailure::Text(_) | RawFailure::Opaque => unknown(FALLBACK_MESSAGE, context),
    }
}

fn unknown(message: &str, context: ErrorContext) -> ClassifiedError {
    ClassifiedError::new(ErrorKind::Unknown, message).with_context_map(context)
}
