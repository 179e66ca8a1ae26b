use std::path::PathBuf;

use anyhow::Context;
use bench_client::{BenchClient, BenchRequest, Endpoint};
use bench_common::config::BenchConfig;
use bench_core::TokenCounter;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tps-bench", version, about = "Benchmark tokens/sec against an OpenAI-compatible server")]
struct Cli {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// API key for the Authorization header
    #[arg(long)]
    api_key: String,
    /// Model id
    #[arg(long)]
    model: String,
    /// Prompt or message to send
    #[arg(long)]
    prompt: String,
    /// Endpoint path to call: chat/completions or completions
    #[arg(long, default_value = "chat/completions")]
    endpoint: Endpoint,
    /// Use streaming responses
    #[arg(long)]
    stream: bool,
    /// max_tokens for the response
    #[arg(long, default_value_t = 512)]
    max_tokens: u32,
    /// HuggingFace tokenizer.json to count tokens with
    #[arg(long)]
    tokenizer_file: Option<PathBuf>,
    /// Count tokens with the word/punctuation heuristic only
    #[arg(long)]
    heuristic_tokens: bool,
    /// Buffered request deadline and streaming read timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(path) = &self.tokenizer_file {
            config.tokenizer_file = Some(path.clone());
        }
        if self.heuristic_tokens {
            config.heuristic_only = true;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
            config.stream_timeout_secs = secs;
        }
    }

    fn request(&self) -> BenchRequest {
        BenchRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            endpoint: self.endpoint,
            stream: self.stream,
            max_tokens: self.max_tokens,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = BenchConfig::load().context("loading configuration")?;
    cli.apply(&mut config);

    let counter = TokenCounter::from_config(&config);
    tracing::debug!(?counter, "token counter ready");

    let client = BenchClient::new(&cli.host, cli.port, cli.api_key.as_str(), &config)?;
    let result = client
        .run(&cli.request(), &counter)
        .await
        .with_context(|| format!("benchmark request to {} failed", client.url(cli.endpoint)))?;

    println!("{}", result.to_json_pretty()?);
    Ok(())
}

// Logs go to stderr; stdout carries only the result.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = ["tps-bench", "--api-key", "k", "--model", "m", "--prompt", "p"];

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(REQUIRED).unwrap();
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.endpoint, Endpoint::ChatCompletions);
        assert_eq!(cli.max_tokens, 512);
        assert!(!cli.stream);
    }

    #[test]
    fn required_flags_are_enforced() {
        assert!(Cli::try_parse_from(["tps-bench", "--model", "m", "--prompt", "p"]).is_err());
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--endpoint", "embeddings"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--endpoint", "completions", "--stream", "--heuristic-tokens", "--timeout-secs", "30"]);
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = BenchConfig::default();
        cli.apply(&mut config);
        assert!(config.heuristic_only);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.stream_timeout_secs, 30);

        let request = cli.request();
        assert_eq!(request.endpoint, Endpoint::Completions);
        assert!(request.stream);
    }
}
