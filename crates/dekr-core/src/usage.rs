//! Tier and daily-quota tracking.
//!
//! The server is the only quota enforcer. Everything here is derived display
//! state: a usage percentage, a severity band for styling and a tier label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Usage percentage at which the band turns to [`SeverityBand::Warning`].
pub const WARNING_THRESHOLD: f64 = 70.0;
/// Usage percentage at which the band turns to [`SeverityBand::Danger`].
pub const DANGER_THRESHOLD: f64 = 90.0;

/// Display severity derived from a usage or length measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Normal,
    Warning,
    Danger,
}

impl SeverityBand {
    /// Band for a usage percentage; lower bounds are inclusive.
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= DANGER_THRESHOLD {
            Self::Danger
        } else if percentage >= WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Band for the input character counter (> 4500 danger, > 4000 warning).
    pub fn for_input_length(chars: usize) -> Self {
        if chars > 4500 {
            Self::Danger
        } else if chars > 4000 {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Subscription tier reported by the server.
///
/// Any integer is accepted; values outside 1..=7 display as "Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub i64);

impl Tier {
    pub const FREEMIUM: Tier = Tier(1);

    /// Display name of the tier.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Freemium",
            2 => "Market Hours Pro",
            3 => "Premium",
            4 => "Premium Plus",
            5 => "Professional",
            6 => "Enterprise",
            7 => "Elite",
            _ => "Unknown",
        }
    }

    /// Daily message quota implied by the tier. Unknown tiers get the
    /// freemium quota.
    pub fn daily_limit(self) -> DailyLimit {
        match self.0 {
            2 => DailyLimit::Limited(50),
            3 => DailyLimit::Limited(100),
            4 => DailyLimit::Limited(200),
            5 => DailyLimit::Limited(500),
            6 => DailyLimit::Limited(1000),
            7 => DailyLimit::Unlimited,
            _ => DailyLimit::Limited(10),
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::FREEMIUM
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Daily message cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyLimit {
    Limited(u32),
    Unlimited,
}

impl fmt::Display for DailyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("∞"),
        }
    }
}

/// Current tier and counters, overwritten from server status reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageTracker {
    tier: Tier,
    daily_used: u32,
    daily_limit: DailyLimit,
    /// Requests in the last minute, when the server reports it.
    rate_limit_usage: Option<f64>,
}

impl Default for UsageTracker {
    fn default() -> Self {
        let tier = Tier::default();
        Self {
            tier,
            daily_used: 0,
            daily_limit: tier.daily_limit(),
            rate_limit_usage: None,
        }
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces tier and counters. No merging: the server is authoritative.
    pub fn apply_status(&mut self, tier: Tier, daily_used: u32, daily_limit: DailyLimit) {
        self.tier = tier;
        self.daily_used = daily_used;
        self.daily_limit = daily_limit;
    }

    pub fn set_rate_limit_usage(&mut self, usage: Option<f64>) {
        self.rate_limit_usage = usage;
    }

    /// Zeroes the daily counter after the server confirmed a history reset.
    pub fn reset_daily(&mut self) {
        self.daily_used = 0;
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn daily_used(&self) -> u32 {
        self.daily_used
    }

    pub fn daily_limit(&self) -> DailyLimit {
        self.daily_limit
    }

    pub fn rate_limit_usage(&self) -> Option<f64> {
        self.rate_limit_usage
    }

    /// Share of the daily quota consumed, clamped to `[0, 100]`.
    ///
    /// Always 0 for an unlimited quota. A zero limit reads as fully used once
    /// anything has been sent.
    pub fn percentage(&self) -> f64 {
        match self.daily_limit {
            DailyLimit::Unlimited => 0.0,
            DailyLimit::Limited(0) => {
                if self.daily_used > 0 {
                    100.0
                } else {
                    0.0
                }
            }
            DailyLimit::Limited(limit) => {
                (f64::from(self.daily_used) / f64::from(limit) * 100.0).clamp(0.0, 100.0)
            }
        }
    }

    pub fn severity_band(&self) -> SeverityBand {
        SeverityBand::for_percentage(self.percentage())
    }

    pub fn tier_label(&self) -> &'static str {
        self.tier.label()
    }

    /// `"used/limit"`, with `∞` for an unlimited quota.
    pub fn usage_label(&self) -> String {
        format!("{}/{}", self.daily_used, self.daily_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_freemium() {
        let tracker = UsageTracker::new();
        assert_eq!(tracker.tier(), Tier(1));
        assert_eq!(tracker.daily_limit(), DailyLimit::Limited(10));
        assert_eq!(tracker.usage_label(), "0/10");
    }

    #[test]
    fn test_unlimited_elite_tier() {
        let mut tracker = UsageTracker::new();
        tracker.apply_status(Tier(7), 5, DailyLimit::Unlimited);
        assert_eq!(tracker.percentage(), 0.0);
        assert_eq!(tracker.tier_label(), "Elite");
        assert_eq!(tracker.severity_band(), SeverityBand::Normal);
        assert_eq!(tracker.usage_label(), "5/∞");
    }

    #[test]
    fn test_percentage_is_clamped() {
        let mut tracker = UsageTracker::new();
        tracker.apply_status(Tier(1), 25, DailyLimit::Limited(10));
        assert_eq!(tracker.percentage(), 100.0);

        tracker.apply_status(Tier(1), 0, DailyLimit::Limited(0));
        assert_eq!(tracker.percentage(), 0.0);

        tracker.apply_status(Tier(1), 3, DailyLimit::Limited(0));
        assert_eq!(tracker.percentage(), 100.0);
    }

    #[test]
    fn test_percentage_stays_in_range() {
        let mut tracker = UsageTracker::new();
        for used in [0u32, 1, 9, 10, 11, 1000, u32::MAX] {
            for limit in [0u32, 1, 10, 1000, u32::MAX] {
                tracker.apply_status(Tier(3), used, DailyLimit::Limited(limit));
                let pct = tracker.percentage();
                assert!((0.0..=100.0).contains(&pct), "{used}/{limit} -> {pct}");
            }
        }
    }

    #[test]
    fn test_severity_thresholds_are_inclusive() {
        let mut tracker = UsageTracker::new();
        tracker.apply_status(Tier(3), 69, DailyLimit::Limited(100));
        assert_eq!(tracker.severity_band(), SeverityBand::Normal);
        tracker.apply_status(Tier(3), 70, DailyLimit::Limited(100));
        assert_eq!(tracker.severity_band(), SeverityBand::Warning);
        tracker.apply_status(Tier(3), 89, DailyLimit::Limited(100));
        assert_eq!(tracker.severity_band(), SeverityBand::Warning);
        tracker.apply_status(Tier(3), 90, DailyLimit::Limited(100));
        assert_eq!(tracker.severity_band(), SeverityBand::Danger);
    }

    #[test]
    fn test_unknown_tier_label() {
        assert_eq!(Tier(0).label(), "Unknown");
        assert_eq!(Tier(8).label(), "Unknown");
        assert_eq!(Tier(-3).label(), "Unknown");
        assert_eq!(Tier(42).daily_limit(), DailyLimit::Limited(10));
    }

    #[test]
    fn test_apply_status_overwrites() {
        let mut tracker = UsageTracker::new();
        tracker.apply_status(Tier(5), 400, DailyLimit::Limited(500));
        tracker.apply_status(Tier(2), 3, DailyLimit::Limited(50));
        assert_eq!(tracker.tier(), Tier(2));
        assert_eq!(tracker.daily_used(), 3);
        assert_eq!(tracker.daily_limit(), DailyLimit::Limited(50));
    }

    #[test]
    fn test_input_length_band() {
        assert_eq!(SeverityBand::for_input_length(4000), SeverityBand::Normal);
        assert_eq!(SeverityBand::for_input_length(4001), SeverityBand::Warning);
        assert_eq!(SeverityBand::for_input_length(4501), SeverityBand::Danger);
    }
}
