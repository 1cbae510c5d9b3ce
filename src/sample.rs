// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Vehicle sample data model.

use serde::{Deserialize, Serialize};

/// A single vehicle telemetry sample, as produced by the ingestion source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Speed in mph.
    pub speed: f32,
    /// Instantaneous power in kW (negative during regenerative braking).
    pub power: f32,
    /// State of charge, percent in [0, 100].
    pub battery: i32,
    /// Heading in degrees, [0, 360).
    pub heading: i32,
    /// Trip odometer in miles, monotonically non-decreasing within a trip.
    pub odometer: f32,
}

impl Sample {
    /// Validate the documented field domains. Parsing a line that is
    /// otherwise well-formed JSON but violates these ranges is a source
    /// error, not a panic.
    pub fn validate(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.battery) {
            return Err(format!("battery {} out of range [0, 100]", self.battery));
        }
        if !(0..360).contains(&self.heading) {
            return Err(format!("heading {} out of range [0, 360)", self.heading));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_sample() -> Sample {
        Sample {
            timestamp: 0,
            speed: 65.0,
            power: 10.0,
            battery: 80,
            heading: 90,
            odometer: 0.0,
        }
    }

    #[test]
    fn accepts_in_range_fields() {
        assert!(valid_sample().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_battery() {
        let mut s = valid_sample();
        s.battery = 101;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_heading() {
        let mut s = valid_sample();
        s.heading = 360;
        assert!(s.validate().is_err());
    }
}
