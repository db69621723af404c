//! Error types for the rules layer.

use std::path::PathBuf;

use thiserror::Error;

/// A requirement string that does not follow the requirement grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse requirement '{text}': {reason}")]
pub struct ParseError {
    /// The full text that was being parsed.
    pub text: String,
    /// What went wrong, including the offending position.
    pub reason: String,
}

impl ParseError {
    pub fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by requirements, effects, and configuration.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot gain {found} from a requirement (list gains with '|', not '&')")]
    NotAGainList { found: &'static str },

    #[error("invalid tag delta '{delta}' (must start with '+' or '-')")]
    MalformedTagDelta { delta: String },

    #[error("failed to read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type alias for rules operations.
pub type RulesResult<T> = Result<T, RulesError>;
