use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, BenchError>;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::{BenchError, Result};

    pub const CONFIG_ENV: &str = "BENCH_CONFIG";

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(default)]
    pub struct BenchConfig {
        /// HuggingFace `tokenizer.json` used before any tiktoken encoding.
        pub tokenizer_file: Option<PathBuf>,
        /// Skip exact tokenizers entirely and count with the heuristic.
        pub heuristic_only: bool,
        pub request_timeout_secs: u64,
        pub stream_timeout_secs: u64,
        pub connect_timeout_secs: u64,
    }

    impl Default for BenchConfig {
        fn default() -> Self {
            Self {
                tokenizer_file: None,
                heuristic_only: false,
                request_timeout_secs: 120,
                stream_timeout_secs: 300,
                connect_timeout_secs: 10,
            }
        }
    }

    impl BenchConfig {
        /// Load from `BENCH_CONFIG` if set, otherwise defaults plus `BENCH_*` overrides.
        pub fn load() -> Result<Self> {
            Self::load_with(|key| env::var(key).ok())
        }

        pub fn load_with<F>(lookup: F) -> Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            if let Some(path) = lookup(CONFIG_ENV) {
                return Self::from_file(PathBuf::from(path));
            }
            let mut cfg = Self::default();
            if let Some(path) = lookup("BENCH_TOKENIZER_FILE") {
                cfg.tokenizer_file = Some(PathBuf::from(path));
            }
            if let Some(v) = lookup("BENCH_HEURISTIC_ONLY") {
                cfg.heuristic_only = parse_flag("BENCH_HEURISTIC_ONLY", &v)?;
            }
            if let Some(v) = lookup("BENCH_REQUEST_TIMEOUT_SECS") {
                cfg.request_timeout_secs = parse_secs("BENCH_REQUEST_TIMEOUT_SECS", &v)?;
            }
            if let Some(v) = lookup("BENCH_STREAM_TIMEOUT_SECS") {
                cfg.stream_timeout_secs = parse_secs("BENCH_STREAM_TIMEOUT_SECS", &v)?;
            }
            if let Some(v) = lookup("BENCH_CONNECT_TIMEOUT_SECS") {
                cfg.connect_timeout_secs = parse_secs("BENCH_CONNECT_TIMEOUT_SECS", &v)?;
            }
            Ok(cfg)
        }

        pub fn from_file(path: PathBuf) -> Result<Self> {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(source) => return Err(BenchError::ConfigRead { path, source }),
            };
            Self::from_yaml(&text).map_err(|source| BenchError::ConfigParse { path, source })
        }

        pub fn from_yaml(text: &str) -> core::result::Result<Self, serde_yaml::Error> {
            serde_yaml::from_str(text)
        }

        pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
        pub fn stream_timeout(&self) -> Duration { Duration::from_secs(self.stream_timeout_secs) }
        pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }
    }

    fn parse_flag(key: &'static str, value: &str) -> Result<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(BenchError::InvalidEnv { key, value: value.to_string() }),
        }
    }

    fn parse_secs(key: &'static str, value: &str) -> Result<u64> {
        value
            .trim()
            .parse()
            .map_err(|_| BenchError::InvalidEnv { key, value: value.to_string() })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> =
                pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn defaults_without_env() {
            let cfg = BenchConfig::load_with(lookup(&[])).unwrap();
            assert_eq!(cfg, BenchConfig::default());
            assert_eq!(cfg.stream_timeout(), Duration::from_secs(300));
        }

        #[test]
        fn env_overrides_apply() {
            let cfg = BenchConfig::load_with(lookup(&[
                ("BENCH_HEURISTIC_ONLY", "yes"),
                ("BENCH_REQUEST_TIMEOUT_SECS", "5"),
                ("BENCH_TOKENIZER_FILE", "/tmp/tokenizer.json"),
            ]))
            .unwrap();
            assert!(cfg.heuristic_only);
            assert_eq!(cfg.request_timeout_secs, 5);
            assert_eq!(cfg.tokenizer_file, Some(PathBuf::from("/tmp/tokenizer.json")));
            assert_eq!(cfg.connect_timeout_secs, 10);
        }

        #[test]
        fn bad_env_value_is_an_error() {
            let err = BenchConfig::load_with(lookup(&[("BENCH_STREAM_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
            assert!(matches!(err, BenchError::InvalidEnv { key: "BENCH_STREAM_TIMEOUT_SECS", .. }));
        }

        #[test]
        fn partial_yaml_keeps_defaults() {
            let cfg = BenchConfig::from_yaml("heuristic_only: true\nstream_timeout_secs: 42\n").unwrap();
            assert!(cfg.heuristic_only);
            assert_eq!(cfg.stream_timeout_secs, 42);
            assert_eq!(cfg.request_timeout_secs, 120);
        }

        #[test]
        fn missing_config_file_is_reported() {
            let err = BenchConfig::load_with(lookup(&[(CONFIG_ENV, "/nonexistent/bench.yaml")]))
                .unwrap_err();
            assert!(matches!(err, BenchError::ConfigRead { .. }));
        }
    }
}
