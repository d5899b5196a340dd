//! Metric-prefix selection for timing values.

use serde::{Deserialize, Serialize};

/// Time unit a report value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Milli,
    Micro,
    Nano,
}

impl TimeUnit {
    /// Parses the CLI spelling (`s`, `ms`, `us`, `ns`).
    pub fn from_cli(s: &str) -> Option<Self> {
        match s {
            "s" => Some(TimeUnit::Seconds),
            "ms" => Some(TimeUnit::Milli),
            "us" => Some(TimeUnit::Micro),
            "ns" => Some(TimeUnit::Nano),
            _ => None,
        }
    }

    /// Single-character prefix override as carried in configurations.
    pub fn from_prefix_char(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeUnit::Seconds),
            'm' => Some(TimeUnit::Milli),
            'u' => Some(TimeUnit::Micro),
            'n' => Some(TimeUnit::Nano),
            _ => None,
        }
    }

    #[must_use]
    pub fn ratio_den(&self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Milli => 1_000,
            TimeUnit::Micro => 1_000_000,
            TimeUnit::Nano => 1_000_000_000,
        }
    }

    /// Prefix symbol prepended to `s` in unit columns.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "",
            TimeUnit::Milli => "m",
            TimeUnit::Micro => "u",
            TimeUnit::Nano => "n",
        }
    }

    #[must_use]
    pub fn prefix_name(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "",
            TimeUnit::Milli => "milli",
            TimeUnit::Micro => "micro",
            TimeUnit::Nano => "nano",
        }
    }
}

/// A seconds value scaled into a metric-prefixed unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingPrefix {
    /// Value in the selected unit.
    pub value: f64,
    /// Denominator of the unit's ratio to one second (numerator is 1).
    pub ratio_den: i64,
    pub unit: TimeUnit,
}

impl TimingPrefix {
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.unit.symbol()
    }

    /// Seconds value this prefix was derived from.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.value / self.ratio_den as f64
    }
}

/// Picks the largest unit in {s, ms, µs, ns} such that the scaled value is
/// at least 1. Zero stays in seconds.
#[must_use]
pub fn timing_prefix(seconds: f64) -> TimingPrefix {
    let mut value = seconds;
    let mut den: i64 = 1;
    let mut scale = 0usize;
    while scale < 3 && value > 0.0 && value < 1.0 {
        value *= 1_000.0;
        den *= 1_000;
        scale += 1;
    }
    let unit = match scale {
        0 => TimeUnit::Seconds,
        1 => TimeUnit::Milli,
        2 => TimeUnit::Micro,
        _ => TimeUnit::Nano,
    };
    TimingPrefix {
        value,
        ratio_den: den,
        unit,
    }
}

/// Like [`timing_prefix`] but with an optional explicit unit override.
#[must_use]
pub fn timing_prefix_with(seconds: f64, unit: Option<TimeUnit>) -> TimingPrefix {
    match unit {
        None => timing_prefix(seconds),
        Some(unit) => TimingPrefix {
            value: seconds * unit.ratio_den() as f64,
            ratio_den: unit.ratio_den(),
            unit,
        },
    }
}
