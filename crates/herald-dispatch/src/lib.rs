// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch controller: one entry point for immediate, delayed, and
//! scheduled notifications.

pub mod controller;
pub mod settings;

pub use controller::PushController;
pub use settings::PushSettings;
