use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[serde(rename = "stream")]
    Stream,
    #[serde(rename = "non-stream")]
    NonStream,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Stream => f.write_str("stream"),
            Mode::NonStream => f.write_str("non-stream"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub mode: Mode,
    pub tokens: usize,
    #[serde(serialize_with = "serialize_rounded")]
    pub elapsed_seconds: f64,
    #[serde(serialize_with = "serialize_throughput")]
    pub tokens_per_second: f64,
}

impl BenchmarkResult {
    /// Throughput is `tokens / elapsed_seconds`, or `+inf` when no time elapsed.
    pub fn new(mode: Mode, tokens: usize, elapsed_seconds: f64) -> Self {
        let tokens_per_second = if elapsed_seconds > 0.0 {
            tokens as f64 / elapsed_seconds
        } else {
            f64::INFINITY
        };
        Self { mode, tokens, elapsed_seconds, tokens_per_second }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round6(*value))
}

// JSON has no infinity literal; non-finite values are written as strings.
fn serialize_throughput<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(round6(*value))
    } else if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if *value > 0.0 {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_str("-Infinity")
    }
}
