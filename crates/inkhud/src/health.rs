//! Display health: when to force a FULL refresh.
//!
//! Every FAST refresh leaves some ghosting behind. The policy keeps a debt
//! counter: each ordinary FAST refresh adds 1.0, and once the debt reaches
//! the threshold the next ordinary request is promoted to FULL and the debt
//! is cleared. Responsive requests (menu feedback) are never promoted, but
//! while the panel is already over the threshold they cost the stress
//! multiplier instead of 1.0.

use platform::UpdateType;
use serde::{Deserialize, Serialize};

/// Resilience settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resilience {
    /// FAST refreshes allowed between FULL refreshes.
    pub fast_per_full: u8,
    /// Debt charged for a responsive FAST refresh while over the threshold.
    pub stress_multiplier: f32,
}

impl Default for Resilience {
    fn default() -> Self {
        Self {
            fast_per_full: 20,
            stress_multiplier: 1.5,
        }
    }
}

/// Ghosting debt tracker.
#[derive(Debug, Clone)]
pub struct DisplayHealth {
    config: Resilience,
    debt: f32,
    fast_since_full: u32,
}

impl DisplayHealth {
    /// Fresh panel, no debt.
    pub fn new(config: Resilience) -> Self {
        Self {
            config,
            debt: 0.0,
            fast_since_full: 0,
        }
    }

    /// Replace the settings. Accumulated debt is kept.
    pub fn reconfigure(&mut self, config: Resilience) {
        self.config = config;
    }

    /// Current settings
    pub fn config(&self) -> Resilience {
        self.config
    }

    /// Accumulated ghosting debt.
    pub fn debt(&self) -> f32 {
        self.debt
    }

    /// FAST refreshes since the last FULL one.
    pub fn fast_since_full(&self) -> u32 {
        self.fast_since_full
    }

    fn over_threshold(&self) -> bool {
        self.debt >= f32::from(self.config.fast_per_full)
    }

    /// Decide the refresh type actually run for a request, and account for it.
    ///
    /// `fast_supported` is false on panels without a partial waveform, in
    /// which case every request runs FULL.
    pub fn select(&mut self, requested: UpdateType, responsive: bool, fast_supported: bool) -> UpdateType {
        let selected = match requested {
            UpdateType::Full => UpdateType::Full,
            UpdateType::Fast if !fast_supported => UpdateType::Full,
            UpdateType::Fast if self.over_threshold() && !responsive => {
                debug!(
                    "promoting FAST to FULL after {} fast refreshes",
                    self.fast_since_full
                );
                UpdateType::Full
            }
            UpdateType::Fast => UpdateType::Fast,
        };

        match selected {
            UpdateType::Full => {
                self.debt = 0.0;
                self.fast_since_full = 0;
            }
            UpdateType::Fast => {
                let cost = if self.over_threshold() {
                    self.config.stress_multiplier
                } else {
                    1.0
                };
                self.debt += cost;
                self.fast_since_full = self.fast_since_full.saturating_add(1);
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(threshold: u8) -> DisplayHealth {
        DisplayHealth::new(Resilience {
            fast_per_full: threshold,
            stress_multiplier: 1.5,
        })
    }

    #[test]
    fn test_request_after_threshold_is_promoted() {
        let mut h = health(3);
        for _ in 0..3 {
            assert_eq!(h.select(UpdateType::Fast, false, true), UpdateType::Fast);
        }
        assert_eq!(h.select(UpdateType::Fast, false, true), UpdateType::Full);
        assert_eq!(h.fast_since_full(), 0);
        assert_eq!(h.debt(), 0.0);
        // Counter restarted
        assert_eq!(h.select(UpdateType::Fast, false, true), UpdateType::Fast);
    }

    #[test]
    fn test_explicit_full_resets_debt() {
        let mut h = health(3);
        h.select(UpdateType::Fast, false, true);
        h.select(UpdateType::Fast, false, true);
        assert_eq!(h.select(UpdateType::Full, false, true), UpdateType::Full);
        assert_eq!(h.fast_since_full(), 0);
        for _ in 0..3 {
            assert_eq!(h.select(UpdateType::Fast, false, true), UpdateType::Fast);
        }
    }

    #[test]
    fn test_responsive_requests_stay_fast_but_cost_more() {
        let mut h = health(2);
        h.select(UpdateType::Fast, false, true);
        h.select(UpdateType::Fast, false, true);
        assert_eq!(h.select(UpdateType::Fast, true, true), UpdateType::Fast);
        assert!((h.debt() - 3.5).abs() < f32::EPSILON);
        // First ordinary request afterwards pays it off.
        assert_eq!(h.select(UpdateType::Fast, false, true), UpdateType::Full);
    }

    #[test]
    fn test_panel_without_fast_always_runs_full() {
        let mut h = health(3);
        assert_eq!(h.select(UpdateType::Fast, false, false), UpdateType::Full);
        assert_eq!(h.select(UpdateType::Fast, true, false), UpdateType::Full);
    }
}
