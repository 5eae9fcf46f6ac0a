//! Threshold rules evaluated on each monitoring tick.
//!
//! Every rule is a pure comparison against the record's reference valuation;
//! the engine decides what to do when one fires.

use crate::config::ThresholdConfig;

/// A sell trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TakeProfit,
    FollowUp,
    StopLoss,
    ProgressCap,
}

impl Rule {
    /// Percentage of holdings sold when this rule fires.
    pub fn sell_pct(&self, cfg: &ThresholdConfig) -> u8 {
        match self {
            Self::TakeProfit => cfg.take_profit_sell_pct,
            Self::FollowUp => cfg.follow_up_sell_pct,
            Self::StopLoss => cfg.stop_loss_sell_pct,
            Self::ProgressCap => cfg.progress_cap_sell_pct,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TakeProfit => "take-profit",
            Self::FollowUp => "take-profit follow-up",
            Self::StopLoss => "stop-loss",
            Self::ProgressCap => "progress-cap",
        };
        f.write_str(s)
    }
}

/// First take-profit tranche: one-shot per record.
pub fn take_profit_hit(
    cfg: &ThresholdConfig,
    valuation: f64,
    reference: f64,
    partial_taken: bool,
) -> bool {
    !partial_taken && valuation >= reference * cfg.take_profit_ratio
}

/// Delayed follow-up: same ratio, measured against the reference at firing time.
pub fn follow_up_hit(cfg: &ThresholdConfig, valuation: f64, reference: f64) -> bool {
    valuation >= reference * cfg.take_profit_ratio
}

pub fn stop_loss_hit(cfg: &ThresholdConfig, valuation: f64, reference: f64) -> bool {
    valuation <= reference * cfg.stop_loss_ratio
}

/// Inclusive upper bound on bonding curve progress.
pub fn progress_cap_hit(cfg: &ThresholdConfig, progress: f64) -> bool {
    progress >= cfg.progress_cap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    #[test]
    fn test_take_profit_boundary() {
        assert!(take_profit_hit(&cfg(), 125.0, 100.0, false));
        assert!(!take_profit_hit(&cfg(), 124.99, 100.0, false));
        // One-shot
        assert!(!take_profit_hit(&cfg(), 200.0, 100.0, true));
    }

    #[test]
    fn test_stop_loss_boundary() {
        assert!(stop_loss_hit(&cfg(), 90.0, 100.0));
        assert!(stop_loss_hit(&cfg(), 89.9, 100.0));
        assert!(!stop_loss_hit(&cfg(), 90.1, 100.0));
    }

    #[test]
    fn test_progress_cap_is_inclusive() {
        assert!(progress_cap_hit(&cfg(), 1.5));
        assert!(progress_cap_hit(&cfg(), 40.0));
        assert!(!progress_cap_hit(&cfg(), 1.49999));
    }

    #[test]
    fn test_follow_up_uses_given_reference() {
        assert!(follow_up_hit(&cfg(), 160.0, 125.0));
        assert!(!follow_up_hit(&cfg(), 150.0, 125.0));
    }

    #[test]
    fn test_sell_percentages() {
        let cfg = cfg();
        assert_eq!(Rule::TakeProfit.sell_pct(&cfg), 50);
        assert_eq!(Rule::FollowUp.sell_pct(&cfg), 25);
        assert_eq!(Rule::StopLoss.sell_pct(&cfg), 100);
        assert_eq!(Rule::ProgressCap.sell_pct(&cfg), 75);
    }
}
