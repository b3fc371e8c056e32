//! Polling cycle
//!
//! One cycle reads every configured channel once, calibrates each measurement and
//! hands it to the sink. Bus errors and implausible values are published as the
//! invalid sentinel; only an unavailable driver stops the cycle.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{Config, MeasurementConfig};
use crate::module::{Adam4017, AnalogReading, DriverError};
use crate::protocol::{Channel, Rs485Channel};
use crate::publish::{MeasurementSink, PublishValue, Topic};
use crate::sensor::{Calibration, Measurement};

/// One published measurement: where it is read and where it goes
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub channel: Channel,
    pub topic: Topic,
    pub calibration: Calibration,
}

/// Counts for one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub valid: usize,
    /// Bus errors
    pub invalid: usize,
    pub out_of_range: usize,
    pub sink_errors: usize,
}

impl PollReport {
    pub fn published(&self) -> usize {
        self.valid + self.invalid + self.out_of_range
    }
}

/// Reads configured channels and publishes their measurements
#[derive(Debug, Clone)]
pub struct Poller {
    points: Vec<MeasurementPoint>,
}

impl Poller {
    pub fn new(points: Vec<MeasurementPoint>) -> Self {
        Self { points }
    }

    /// Measurement points of a validated configuration
    pub fn from_config(config: &Config) -> Self {
        let points = config
            .measurements
            .iter()
            .filter_map(|m: &MeasurementConfig| {
                Some(MeasurementPoint {
                    channel: Channel::new(m.channel)?,
                    topic: config.topic(m),
                    calibration: m.calibration,
                })
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[MeasurementPoint] {
        &self.points
    }

    /// Run one cycle
    pub fn poll_once<C, S>(
        &self,
        driver: &mut Adam4017<C>,
        sink: &mut S,
    ) -> Result<PollReport, DriverError>
    where
        C: Rs485Channel,
        S: MeasurementSink + ?Sized,
    {
        let mut report = PollReport::default();
        // A channel feeding several measurements is read once per cycle
        let mut readings: BTreeMap<Channel, Option<AnalogReading>> = BTreeMap::new();

        for point in &self.points {
            let reading = match readings.get(&point.channel) {
                Some(reading) => reading.clone(),
                None => {
                    let reading = match driver.read_channel(point.channel) {
                        Ok(reading) => Some(reading),
                        Err(DriverError::Unavailable) => return Err(DriverError::Unavailable),
                        Err(e) => {
                            warn!(channel = %point.channel, "read failed: {}", e);
                            None
                        }
                    };
                    readings.insert(point.channel, reading.clone());
                    reading
                }
            };

            let measurement = match &reading {
                Some(reading) => point.calibration.apply(reading),
                None => Measurement::Invalid,
            };

            let value = match measurement {
                Measurement::Value(value) => {
                    info!(topic = %point.topic, value, "measurement");
                    report.valid += 1;
                    PublishValue::Reading {
                        value,
                        decimals: point.calibration.decimals,
                    }
                }
                Measurement::OutOfRange(value) => {
                    warn!(topic = %point.topic, value, "measurement outside valid range");
                    report.out_of_range += 1;
                    PublishValue::Invalid
                }
                Measurement::Invalid => {
                    warn!(topic = %point.topic, "no valid reading");
                    report.invalid += 1;
                    PublishValue::Invalid
                }
            };

            if let Err(e) = sink.publish(&point.topic, &value) {
                warn!(topic = %point.topic, "publish failed: {}", e);
                report.sink_errors += 1;
            }
        }

        debug!(?report, "poll cycle complete");
        Ok(report)
    }
}
