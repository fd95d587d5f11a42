//! Fusion of per-source forecasts into one averaged series per calendar day.
//!
//! Every provider payload is first reduced to [`DaySamples`] through
//! [`ToDaySamples`]; the aggregator never looks at provider schemas.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{ForecastDay, SourcePayload, SourceResult};

/// Temperature readings bucketed by calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaySamples {
    days: BTreeMap<NaiveDate, Vec<f64>>,
}

impl DaySamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, day: NaiveDate, temp: f64) {
        self.days.entry(day).or_default().push(temp);
    }

    /// Append all of `other`'s readings into this bucket.
    pub fn merge(&mut self, other: DaySamples) {
        for (day, temps) in other.days {
            self.days.entry(day).or_default().extend(temps);
        }
    }

    pub fn get(&self, day: NaiveDate) -> Option<&[f64]> {
        self.days.get(&day).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// One averaged record per non-empty day, ascending by date.
    pub fn into_forecast(self) -> Vec<ForecastDay> {
        self.days
            .into_iter()
            .filter(|(_, temps)| !temps.is_empty())
            .map(|(date, temps)| {
                let mean = temps.iter().sum::<f64>() / temps.len() as f64;

                ForecastDay {
                    date,
                    day_name: date.format("%a").to_string(),
                    temperature: round_to_tenth(mean),
                    data_points: temps.len(),
                }
            })
            .collect()
    }
}

/// Extraction of day-keyed samples from a provider-specific payload.
pub trait ToDaySamples {
    fn to_day_samples(&self) -> DaySamples;
}

impl ToDaySamples for SourcePayload {
    fn to_day_samples(&self) -> DaySamples {
        match self {
            SourcePayload::Hourly(hourly) => hourly.to_day_samples(),
            SourcePayload::Daily(days) => days.to_day_samples(),
        }
    }
}

/// Fuse any number of source envelopes into a sorted daily forecast.
///
/// Failed envelopes are ignored. Returns an empty vector when nothing usable
/// was supplied; the caller decides whether that is an error.
pub fn aggregate<'a, I>(results: I) -> Vec<ForecastDay>
where
    I: IntoIterator<Item = &'a SourceResult>,
{
    let mut samples = DaySamples::new();

    for result in results {
        if !result.is_success() {
            continue;
        }
        if let Some(data) = result.data() {
            samples.merge(data.to_day_samples());
        }
    }

    samples.into_forecast()
}

/// Round to one decimal place, halves away from zero.
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
