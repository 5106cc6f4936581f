// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits implemented by delivery channels.

pub mod pusher;

pub use pusher::Pusher;
