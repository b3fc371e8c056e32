//! Sensor calibration
//!
//! Converts a raw analog reading (mA or V as reported by the module) into a
//! physical measurement with an explicit linear transfer function and an optional
//! valid range.

use serde::{Deserialize, Serialize};

use crate::module::AnalogReading;

fn default_decimals() -> u32 {
    1
}

/// Linear transfer function `slope * raw + intercept`, rounded to `decimals`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub slope: f64,
    pub intercept: f64,
    /// Lowest plausible measurement
    #[serde(default)]
    pub min: Option<f64>,
    /// Highest plausible measurement
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

/// Outcome of calibrating one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Value(f64),
    /// Converted, but outside the configured range
    OutOfRange(f64),
    /// No usable raw reading
    Invalid,
}

impl Calibration {
    /// Unbounded linear calibration with one decimal
    pub fn linear(slope: f64, intercept: f64) -> Self {
        Self {
            slope,
            intercept,
            min: None,
            max: None,
            decimals: default_decimals(),
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Vaisala HMT100 humidity output: 4..20 mA for 0..100 %RH
    pub fn hmt100_humidity() -> Self {
        Self::linear(6.25, -25.0).with_range(0.0, 100.0)
    }

    /// Vaisala HMT100 temperature output: 4..20 mA for -40..+80 °C
    pub fn hmt100_temperature() -> Self {
        Self::linear(7.5, -70.0).with_range(-40.0, 80.0)
    }

    /// Apply the transfer function and round
    pub fn convert(&self, raw: f64) -> f64 {
        let value = self.slope * raw + self.intercept;
        let factor = 10f64.powi(self.decimals as i32);
        (value * factor).round() / factor
    }

    /// Calibrate a reading and check it against the valid range
    pub fn apply(&self, reading: &AnalogReading) -> Measurement {
        let Some(raw) = reading.value() else {
            return Measurement::Invalid;
        };

        let value = self.convert(raw);
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            Measurement::OutOfRange(value)
        } else {
            Measurement::Value(value)
        }
    }

    /// Reject calibrations that can never produce a valid measurement
    pub fn validate(&self) -> Result<(), String> {
        if !self.slope.is_finite() || !self.intercept.is_finite() {
            return Err("slope and intercept must be finite".to_string());
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min ({}) is greater than max ({})", min, max));
            }
        }
        if self.decimals > 6 {
            return Err(format!("decimals ({}) must be at most 6", self.decimals));
        }
        Ok(())
    }
}
