//! Token counting with graceful degradation.
//!
//! An exact tokenizer is used when the capability is present; every failure on
//! that path (unknown model, unreadable tokenizer file, encode error) falls
//! back to a word/punctuation heuristic instead of failing the benchmark.

use std::path::PathBuf;

use bench_common::config::BenchConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Encoding used when the model hint does not resolve to a known encoding.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

static HEURISTIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\s\w]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStrategy {
    ExactTokenizer,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCount {
    pub tokens: usize,
    /// `None` when the input was empty and nothing was invoked.
    pub strategy: Option<TokenStrategy>,
}

impl TokenCount {
    const EMPTY: Self = Self { tokens: 0, strategy: None };
}

/// Whether an exact tokenizer can be used at all in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerCapability {
    Available,
    Absent,
}

impl TokenizerCapability {
    /// Resolved once at startup from the build features and the config switch.
    pub fn detect(config: &BenchConfig) -> Self {
        if config.heuristic_only || !cfg!(feature = "exact-tokenizer") {
            Self::Absent
        } else {
            Self::Available
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TokenizerError {
    #[error("no exact tokenizer available")]
    Unavailable,
    #[error("no encoding for {name}: {reason}")]
    Resolve { name: String, reason: String },
    #[error("failed to load tokenizer from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("tokenizer failed to encode text: {0}")]
    Encode(String),
}

pub trait ExactTokenizer: Send + Sync {
    fn name(&self) -> &str;
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

#[cfg(feature = "exact-tokenizer")]
mod exact {
    use std::path::Path;

    use super::{ExactTokenizer, TokenizerError, DEFAULT_ENCODING};

    pub struct TiktokenEncoding {
        name: String,
        bpe: tiktoken_rs::CoreBPE,
    }

    impl TiktokenEncoding {
        pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
            let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| TokenizerError::Resolve {
                name: model.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Self { name: model.to_string(), bpe })
        }

        pub fn default_encoding() -> Result<Self, TokenizerError> {
            let bpe = tiktoken_rs::cl100k_base().map_err(|e| TokenizerError::Resolve {
                name: DEFAULT_ENCODING.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Self { name: DEFAULT_ENCODING.to_string(), bpe })
        }
    }

    impl ExactTokenizer for TiktokenEncoding {
        fn name(&self) -> &str { &self.name }

        /// Special tokens such as `<|endoftext|>` are rejected rather than
        /// encoded, so text carrying them is counted by the heuristic.
        fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
            let ordinary = self.bpe.encode_ordinary(text).len();
            if self.bpe.encode_with_special_tokens(text).len() != ordinary {
                return Err(TokenizerError::Encode(format!(
                    "{} found a disallowed special token in the text",
                    self.name
                )));
            }
            Ok(ordinary)
        }
    }

    pub struct HfTokenizer {
        name: String,
        inner: tokenizers::Tokenizer,
    }

    impl HfTokenizer {
        pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
            let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            Ok(Self { name: path.display().to_string(), inner })
        }
    }

    impl ExactTokenizer for HfTokenizer {
        fn name(&self) -> &str { &self.name }

        fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
            self.inner
                .encode(text, false)
                .map(|encoding| encoding.len())
                .map_err(|e| TokenizerError::Encode(e.to_string()))
        }
    }
}

#[cfg(feature = "exact-tokenizer")]
pub use exact::{HfTokenizer, TiktokenEncoding};

#[cfg(feature = "exact-tokenizer")]
fn resolve_encoding(model_hint: Option<&str>) -> Result<Box<dyn ExactTokenizer>, TokenizerError> {
    if let Some(model) = model_hint {
        match TiktokenEncoding::for_model(model) {
            Ok(encoding) => return Ok(Box::new(encoding)),
            Err(err) => tracing::debug!(%err, "falling back to {}", DEFAULT_ENCODING),
        }
    }
    Ok(Box::new(TiktokenEncoding::default_encoding()?))
}

#[cfg(not(feature = "exact-tokenizer"))]
fn resolve_encoding(_model_hint: Option<&str>) -> Result<Box<dyn ExactTokenizer>, TokenizerError> {
    Err(TokenizerError::Unavailable)
}

#[cfg(feature = "exact-tokenizer")]
fn load_tokenizer_file(path: &std::path::Path) -> Result<Box<dyn ExactTokenizer>, TokenizerError> {
    Ok(Box::new(HfTokenizer::from_file(path)?))
}

#[cfg(not(feature = "exact-tokenizer"))]
fn load_tokenizer_file(_path: &std::path::Path) -> Result<Box<dyn ExactTokenizer>, TokenizerError> {
    Err(TokenizerError::Unavailable)
}

/// Approximate count: maximal word-character runs plus each punctuation character.
pub fn heuristic_count(text: &str) -> usize {
    HEURISTIC.find_iter(text).count()
}

pub struct TokenCounter {
    capability: TokenizerCapability,
    pinned: Option<Box<dyn ExactTokenizer>>,
}

impl TokenCounter {
    pub fn new(capability: TokenizerCapability) -> Self {
        Self { capability, pinned: None }
    }

    pub fn heuristic() -> Self {
        Self::new(TokenizerCapability::Absent)
    }

    /// Detects the capability and loads `tokenizer_file` if one is configured.
    pub fn from_config(config: &BenchConfig) -> Self {
        let capability = TokenizerCapability::detect(config);
        let mut counter = Self::new(capability);
        if capability == TokenizerCapability::Available {
            if let Some(path) = &config.tokenizer_file {
                match load_tokenizer_file(path) {
                    Ok(tokenizer) => {
                        tracing::info!(tokenizer = tokenizer.name(), "using tokenizer file");
                        counter.pinned = Some(tokenizer);
                    }
                    Err(err) => tracing::warn!(%err, "ignoring tokenizer file"),
                }
            }
        }
        counter
    }

    /// Pins a tokenizer ahead of model-hint resolution. Supplying one implies
    /// the capability is available.
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn ExactTokenizer>) -> Self {
        self.capability = TokenizerCapability::Available;
        self.pinned = Some(tokenizer);
        self
    }

    pub fn capability(&self) -> TokenizerCapability {
        self.capability
    }

    /// Counts with the exact tokenizer only. Encodings for the model hint are
    /// resolved per call; a benchmark run counts once.
    pub fn try_exact(&self, text: &str, model_hint: Option<&str>) -> Result<usize, TokenizerError> {
        if self.capability == TokenizerCapability::Absent {
            return Err(TokenizerError::Unavailable);
        }
        if let Some(tokenizer) = &self.pinned {
            return tokenizer.count_tokens(text);
        }
        let model_hint = model_hint.filter(|m| !m.is_empty());
        resolve_encoding(model_hint)?.count_tokens(text)
    }

    pub fn count<'a>(&self, text: impl Into<Option<&'a str>>, model_hint: Option<&str>) -> TokenCount {
        let Some(text) = text.into().filter(|t| !t.is_empty()) else {
            return TokenCount::EMPTY;
        };
        match self.try_exact(text, model_hint) {
            Ok(tokens) => TokenCount { tokens, strategy: Some(TokenStrategy::ExactTokenizer) },
            Err(err) => {
                if !matches!(err, TokenizerError::Unavailable) {
                    tracing::warn!(%err, "exact tokenizer failed, using heuristic");
                }
                TokenCount { tokens: heuristic_count(text), strategy: Some(TokenStrategy::Heuristic) }
            }
        }
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("capability", &self.capability)
            .field("pinned", &self.pinned.as_ref().map(|t| t.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_honours_heuristic_only() {
        let config = BenchConfig { heuristic_only: true, ..BenchConfig::default() };
        assert_eq!(TokenizerCapability::detect(&config), TokenizerCapability::Absent);
    }

    #[test]
    fn unavailable_is_not_reported_as_failure() {
        let counter = TokenCounter::heuristic();
        assert!(matches!(counter.try_exact("abc", None), Err(TokenizerError::Unavailable)));
    }
}
