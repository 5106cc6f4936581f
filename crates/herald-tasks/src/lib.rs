// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tasks run by the cron runner.
//!
//! Each `[[tasks]]` entry in the configuration carries exactly one typed body;
//! [`build_task`] turns it into an [`herald_cron::Task`] wired to the shared
//! dispatch controller.

pub mod ahr999;
pub mod auto_buy;
pub mod notify;

use std::sync::Arc;

use herald_config::TaskConfig;
use herald_core::HeraldError;
use herald_cron::Task;
use herald_dispatch::PushController;

pub use ahr999::{Ahr999Reading, Ahr999Source, HttpAhr999Source};
pub use auto_buy::{AutoBuyConfig, AutoBuyTask, MultiplierRange, Recommendation};
pub use notify::NotifyTask;

/// Builds the task described by `config`.
///
/// `auto_buy` tasks read the AHR999 signal from the public index API.
pub fn build_task(
    config: &TaskConfig,
    controller: Arc<PushController>,
) -> Result<Arc<dyn Task>, HeraldError> {
    match (&config.auto_buy, &config.notify) {
        (Some(auto_buy), None) => {
            let settings = AutoBuyConfig::try_from(auto_buy)?;
            let source = Arc::new(HttpAhr999Source::new()?);
            Ok(Arc::new(AutoBuyTask::new(
                &config.name,
                settings,
                source,
                controller,
            )))
        }
        (None, Some(notify)) => Ok(Arc::new(NotifyTask::new(
            &config.name,
            notify.clone(),
            controller,
        ))),
        (Some(_), Some(_)) => Err(HeraldError::Config(format!(
            "task `{}` declares more than one body",
            config.name
        ))),
        (None, None) => Err(HeraldError::Config(format!(
            "task `{}` has no body; add [tasks.auto_buy] or [tasks.notify]",
            config.name
        ))),
    }
}
