//! Link quality classification.

/// Coarse signal strength, for a bar icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalStrength {
    /// Unknown or unusable
    None,
    /// Bad
    Bad,
    /// Fair
    Fair,
    /// Good
    Good,
}

impl SignalStrength {
    /// Score SNR (0..=2) and RSSI (0..=3) separately, then bucket the sum.
    pub fn classify(snr: f32, rssi: f32) -> Self {
        let snr_score: u8 = if snr > -17.5 {
            2
        } else if snr > -26.0 {
            1
        } else {
            0
        };
        let rssi_score: u8 = if rssi > -115.0 {
            3
        } else if rssi > -120.0 {
            2
        } else if rssi > -126.0 {
            1
        } else {
            0
        };

        match snr_score.saturating_add(rssi_score) {
            5.. => Self::Good,
            4 => Self::Fair,
            1..=3 => Self::Bad,
            0 => Self::None,
        }
    }

    /// Number of filled bars, 0..=3.
    pub fn bars(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bad => 1,
            Self::Fair => 2,
            Self::Good => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(SignalStrength::classify(-5.0, -90.0), SignalStrength::Good);
        assert_eq!(SignalStrength::classify(-20.0, -100.0), SignalStrength::Fair);
        assert_eq!(SignalStrength::classify(-17.5, -110.0), SignalStrength::Fair);
        assert_eq!(SignalStrength::classify(-17.5, -118.0), SignalStrength::Bad);
        assert_eq!(SignalStrength::classify(-30.0, -125.0), SignalStrength::Bad);
        assert_eq!(SignalStrength::classify(-30.0, -126.0), SignalStrength::None);
    }

    #[test]
    fn test_bars_follow_order() {
        assert!(SignalStrength::Good > SignalStrength::Fair);
        assert_eq!(SignalStrength::Good.bars(), 3);
        assert_eq!(SignalStrength::None.bars(), 0);
    }
}
