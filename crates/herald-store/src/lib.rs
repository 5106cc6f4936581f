// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed queues for delayed and scheduled notifications.
//!
//! [`WorkingStore`] owns the `delay_*.json` / `scheduled_*.json` slot files,
//! merges delayed messages into a digest on flush, fires scheduled messages
//! when their minute arrives, and runs both on background loops via
//! [`start`].

pub mod delivery;
pub mod loops;
pub mod merge;
pub mod slot;
pub mod store;

pub use delivery::deliver;
pub use loops::{StoreLoops, start};
pub use merge::merge_delayed;
pub use slot::{QueueKind, SLOT_HOURS, Slot};
pub use store::{FlushOutcome, ScheduledSweep, WorkingStore, truncate_to_minute};
