// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! - [`MockPusher`] - capturing pusher that can be switched into failure mode
//! - [`TestDirs`] - throwaway working and history directories

pub mod dirs;
pub mod mock_pusher;

pub use dirs::TestDirs;
pub use mock_pusher::MockPusher;
