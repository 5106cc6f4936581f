// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AHR999 dollar-cost-averaging advisor.
//!
//! Each run reads the current AHR999 value, picks the multiplier of the first
//! matching range, and pushes the recommended amount. Ranges are written as
//! `<x`, `>x`, `a-b` (half-open, `a <= v < b`) or an exact value `x`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use herald_config::AutoBuyTaskConfig;
use herald_core::{HeraldError, Message, PushOptions};
use herald_cron::Task;
use herald_dispatch::PushController;
use tracing::{debug, info};

use crate::ahr999::Ahr999Source;

/// A parsed multiplier range key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MultiplierRange {
    Below(f64),
    Above(f64),
    Between(f64, f64),
    Exact(f64),
}

impl MultiplierRange {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            MultiplierRange::Below(x) => value < x,
            MultiplierRange::Above(x) => value > x,
            MultiplierRange::Between(lo, hi) => value >= lo && value < hi,
            MultiplierRange::Exact(x) => value == x,
        }
    }
}

impl FromStr for MultiplierRange {
    type Err = HeraldError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let key = key.trim();
        let number = |s: &str| {
            s.trim().parse::<f64>().map_err(|_| {
                HeraldError::Config(format!("invalid multiplier range `{key}`"))
            })
        };

        if let Some(rest) = key.strip_prefix('<') {
            return Ok(MultiplierRange::Below(number(rest)?));
        }
        if let Some(rest) = key.strip_prefix('>') {
            return Ok(MultiplierRange::Above(number(rest)?));
        }
        if let Some((lo, hi)) = key.split_once('-') {
            let (lo, hi) = (number(lo)?, number(hi)?);
            if lo >= hi {
                return Err(HeraldError::Config(format!(
                    "multiplier range `{key}` is empty (lower bound must be below upper)"
                )));
            }
            return Ok(MultiplierRange::Between(lo, hi));
        }
        Ok(MultiplierRange::Exact(number(key)?))
    }
}

impl fmt::Display for MultiplierRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiplierRange::Below(x) => write!(f, "<{x}"),
            MultiplierRange::Above(x) => write!(f, ">{x}"),
            MultiplierRange::Between(lo, hi) => write!(f, "{lo}-{hi}"),
            MultiplierRange::Exact(x) => write!(f, "{x}"),
        }
    }
}

/// Validated auto-buy settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoBuyConfig {
    base_amount: f64,
    multipliers: Vec<(MultiplierRange, f64)>,
    debug: bool,
    receivers: Vec<String>,
}

/// The amount recommended for one AHR999 value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation {
    pub amount: f64,
    pub multiplier: f64,
    pub range: MultiplierRange,
}

impl TryFrom<&AutoBuyTaskConfig> for AutoBuyConfig {
    type Error = HeraldError;

    fn try_from(raw: &AutoBuyTaskConfig) -> Result<Self, Self::Error> {
        let base_amount = raw.base_amount.ok_or_else(|| {
            HeraldError::Config("auto_buy.base_amount is required".to_string())
        })?;
        if base_amount.is_nan() || base_amount <= 0.0 {
            return Err(HeraldError::Config(format!(
                "auto_buy.base_amount must be greater than 0, got {base_amount}"
            )));
        }
        if raw.multipliers.is_empty() {
            return Err(HeraldError::Config(
                "auto_buy.multipliers must contain at least one range".to_string(),
            ));
        }

        let mut multipliers = Vec::with_capacity(raw.multipliers.len());
        for (key, &multiplier) in &raw.multipliers {
            if multiplier < 0.0 {
                return Err(HeraldError::Config(format!(
                    "multiplier for range `{key}` must not be negative, got {multiplier}"
                )));
            }
            multipliers.push((key.parse::<MultiplierRange>()?, multiplier));
        }

        Ok(Self {
            base_amount,
            multipliers,
            debug: raw.debug,
            receivers: raw.receivers.clone(),
        })
    }
}

impl AutoBuyConfig {
    pub fn base_amount(&self) -> f64 {
        self.base_amount
    }

    /// Base amount scaled by the multiplier of the first range containing `ahr999`.
    pub fn recommended_amount(&self, ahr999: f64) -> Result<Recommendation, HeraldError> {
        self.multipliers
            .iter()
            .find(|(range, _)| range.contains(ahr999))
            .map(|&(range, multiplier)| Recommendation {
                amount: self.base_amount * multiplier,
                multiplier,
                range,
            })
            .ok_or_else(|| {
                HeraldError::Config(format!(
                    "no multiplier range matches AHR999 {ahr999:.3}; refusing to recommend"
                ))
            })
    }
}

/// Scheduled task that pushes the recommended DCA amount.
pub struct AutoBuyTask {
    name: String,
    config: AutoBuyConfig,
    source: Arc<dyn Ahr999Source>,
    controller: Arc<PushController>,
}

impl AutoBuyTask {
    pub fn new(
        name: impl Into<String>,
        config: AutoBuyConfig,
        source: Arc<dyn Ahr999Source>,
        controller: Arc<PushController>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            source,
            controller,
        }
    }
}

#[async_trait]
impl Task for AutoBuyTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), HeraldError> {
        let reading = self.source.latest().await?;
        let recommendation = self.config.recommended_amount(reading.ahr999)?;

        if self.config.debug {
            debug!(
                task = %self.name,
                price = reading.price,
                ahr999 = reading.ahr999,
                range = %recommendation.range,
                multiplier = recommendation.multiplier,
                "auto-buy evaluation"
            );
        }

        let mut title = format!("DCA BTC - ${:.2} USDT", recommendation.amount);
        if self.config.debug {
            title.insert_str(0, "[debug] ");
        }
        let content = format!(
            "Price: ${:.2}\n\nAHR999: {:.3}\n\nRange: {} (x{})\n\nRecommended: ${:.2}",
            reading.price,
            reading.ahr999,
            recommendation.range,
            recommendation.multiplier,
            recommendation.amount,
        );
        let message = Message::normal(&self.name, title, content)
            .with_metadata("ahr999", reading.ahr999)
            .with_metadata("price", reading.price)
            .with_metadata("amount", recommendation.amount);

        let sent = self
            .controller
            .push_now(message, PushOptions::to(&self.config.receivers))
            .await?;
        info!(task = %self.name, message_id = %sent.id, amount = recommendation.amount, "auto-buy summary pushed");
        Ok(())
    }
}
