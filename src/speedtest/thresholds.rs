//! Bandwidth tier table

use crate::models::BandwidthTier;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Lower bounds a measurement must meet on both figures, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierFloor {
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

impl TierFloor {
    pub const fn new(download_mbps: f64, upload_mbps: f64) -> Self {
        Self { download_mbps, upload_mbps }
    }

    pub fn admits(&self, download_mbps: f64, upload_mbps: f64) -> bool {
        download_mbps >= self.download_mbps && upload_mbps >= self.upload_mbps
    }
}

/// Tier boundaries, checked from the top down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthThresholds {
    pub recommended: TierFloor,
    pub minimum: TierFloor,
    pub degraded: TierFloor,
}

impl Default for BandwidthThresholds {
    fn default() -> Self {
        Self {
            recommended: TierFloor::new(80.0, 20.0),
            minimum: TierFloor::new(20.0, 10.0),
            degraded: TierFloor::new(10.0, 5.0),
        }
    }
}

impl BandwidthThresholds {
    /// The highest tier whose floor both figures meet
    pub fn classify(&self, download_mbps: f64, upload_mbps: f64) -> BandwidthTier {
        if self.recommended.admits(download_mbps, upload_mbps) {
            BandwidthTier::Recommended
        } else if self.minimum.admits(download_mbps, upload_mbps) {
            BandwidthTier::Minimum
        } else if self.degraded.admits(download_mbps, upload_mbps) {
            BandwidthTier::Degraded
        } else {
            BandwidthTier::Insufficient
        }
    }

    /// Floors must be finite, non-negative and non-increasing down the table
    pub fn validate(&self) -> Result<()> {
        let tiers = [
            ("recommended", self.recommended),
            ("minimum", self.minimum),
            ("degraded", self.degraded),
        ];

        for (name, floor) in tiers {
            for value in [floor.download_mbps, floor.upload_mbps] {
                if !value.is_finite() || value < 0.0 {
                    return Err(AppError::validation(format!(
                        "Bandwidth threshold '{}' must be a non-negative number, got {}",
                        name, value
                    )));
                }
            }
        }

        for pair in tiers.windows(2) {
            let (upper_name, upper) = pair[0];
            let (lower_name, lower) = pair[1];
            if lower.download_mbps > upper.download_mbps || lower.upload_mbps > upper.upload_mbps {
                return Err(AppError::validation(format!(
                    "Bandwidth threshold '{}' must not exceed '{}'",
                    lower_name, upper_name
                )));
            }
        }

        Ok(())
    }
}
