// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald notification dispatcher.

use thiserror::Error;

/// The primary error type used across the dispatcher, its stores, and pushers.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// The controller has no active pusher or working store (never initialized, or stopped).
    #[error("dispatcher not initialized")]
    NotInitialized,

    /// Push options were rejected by the active pusher (receivers, priority, retry).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The delivery channel reported a send failure.
    #[error("delivery failed via {pusher}: {message}")]
    Delivery {
        pusher: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reading or writing a queue or history file failed.
    #[error("persistence failed: {context}: {source}")]
    Persistence {
        context: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (missing task parameters, bad cron expression, double init).
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested pusher was not found in the registry.
    #[error("pusher not found: {name}")]
    PusherNotFound { name: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Wraps an I/O or serialization error with the file operation that failed.
    pub fn persistence(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HeraldError::Persistence {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Builds a delivery error without an underlying source.
    pub fn delivery(pusher: impl Into<String>, message: impl Into<String>) -> Self {
        HeraldError::Delivery {
            pusher: pusher.into(),
            message: message.into(),
            source: None,
        }
    }
}
