// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery channels and the name-keyed registry the dispatcher selects from.
//!
//! The dispatcher never names a concrete channel: it asks the
//! [`PusherRegistry`] for a `dyn Pusher` by the name found in configuration.

pub mod log;
pub mod registry;
pub mod serverchan;

pub use log::LogPusher;
pub use registry::{PusherFactory, PusherRegistry, builtin_factories};
pub use serverchan::ServerChanPusher;
