// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald notification dispatcher.
//!
//! Provides the message model, push options and their validation, history
//! records, the [`Pusher`] capability trait, and the error type shared by
//! every crate in the workspace.

pub mod error;
pub mod json_file;
pub mod traits;
pub mod types;

pub use error::HeraldError;
pub use traits::Pusher;
pub use types::{
    DelayMessage, HealthStatus, HistoryRecord, MAX_PRIORITY, MAX_RETRY, Message, MessageLevel,
    PushOptions, ScheduledMessage, SendStatus, generate_message_id, validate_options,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn herald_error_has_all_variants() {
        let _ni = HeraldError::NotInitialized;
        let _v = HeraldError::Validation("test".into());
        let _d = HeraldError::delivery("log", "test");
        let _p = HeraldError::persistence("read x", std::io::Error::other("test"));
        let _c = HeraldError::Config("test".into());
        let _nf = HeraldError::PusherNotFound { name: "x".into() };
        let _i = HeraldError::Internal("test".into());
    }

    #[test]
    fn error_messages_name_the_failing_part() {
        let err = HeraldError::delivery("serverchan", "HTTP 500");
        assert_eq!(err.to_string(), "delivery failed via serverchan: HTTP 500");

        let err = HeraldError::persistence("read delay_20250101_00.json", std::io::Error::other("denied"));
        assert!(err.to_string().contains("delay_20250101_00.json"));
        assert!(err.to_string().contains("denied"));
    }

    struct Fixed;

    #[async_trait::async_trait]
    impl Pusher for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn push(&self, _message: &Message) -> Result<(), HeraldError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn pusher_defaults_validate_and_report_healthy() {
        let p = Fixed;
        assert!(p.validate(&PushOptions::to(["u"])).is_ok());
        assert!(p.validate(&PushOptions::to(Vec::<String>::new())).is_err());
        assert_eq!(p.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
