// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Four-hour calendar slots used to partition queue files.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};

/// Hours per slot. Slot boundaries fall at 00, 04, 08, 12, 16 and 20.
pub const SLOT_HOURS: u32 = 4;

const DELAY_PREFIX: &str = "delay_";
const SCHEDULED_PREFIX: &str = "scheduled_";

/// Which queue a slot file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Delay,
    Scheduled,
}

/// A calendar day plus the starting hour of its 4-hour window.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    date: NaiveDate,
    hour_bucket: u32,
}

impl Slot {
    /// The slot containing `at`, in `at`'s own timezone.
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let hour = at.hour();
        Self {
            date: at.date_naive(),
            hour_bucket: hour - hour % SLOT_HOURS,
        }
    }

    /// The slot containing `at` on the local wall clock.
    pub fn local(at: DateTime<Utc>) -> Self {
        Self::of(&at.with_timezone(&Local))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour_bucket(&self) -> u32 {
        self.hour_bucket
    }

    /// `delay_YYYYMMDD_HH.json`
    pub fn delay_file_name(&self) -> String {
        format!("{DELAY_PREFIX}{self}.json")
    }

    /// `scheduled_YYYYMMDD_HH.json`
    pub fn scheduled_file_name(&self) -> String {
        format!("{SCHEDULED_PREFIX}{self}.json")
    }

    pub fn file_name(&self, kind: QueueKind) -> String {
        match kind {
            QueueKind::Delay => self.delay_file_name(),
            QueueKind::Scheduled => self.scheduled_file_name(),
        }
    }

    /// Parses a queue file name back into its kind and slot.
    pub fn parse_file_name(name: &str) -> Option<(QueueKind, Slot)> {
        let (kind, rest) = if let Some(rest) = name.strip_prefix(DELAY_PREFIX) {
            (QueueKind::Delay, rest)
        } else if let Some(rest) = name.strip_prefix(SCHEDULED_PREFIX) {
            (QueueKind::Scheduled, rest)
        } else {
            return None;
        };

        let id = rest.strip_suffix(".json")?;
        let (date, hour) = id.split_once('_')?;
        if date.len() != 8 || hour.len() != 2 {
            return None;
        }
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
        let hour_bucket: u32 = hour.parse().ok()?;
        if hour_bucket >= 24 || hour_bucket % SLOT_HOURS != 0 {
            return None;
        }
        Some((kind, Slot { date, hour_bucket }))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}", self.date.format("%Y%m%d"), self.hour_bucket)
    }
}
