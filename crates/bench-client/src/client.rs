use std::time::{Duration, Instant};

use bench_common::config::BenchConfig;
use bench_core::{BenchmarkResult, BufferedReply, Mode, StreamConsumer, StreamOutcome, TokenCounter};

use crate::error::{ClientError, Result};
use crate::request::{BenchRequest, Endpoint};

/// Issues exactly one request per run against an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct BenchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    stream_timeout: Duration,
}

impl BenchClient {
    pub fn new(host: &str, port: u16, api_key: impl Into<String>, config: &BenchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.stream_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
            api_key: api_key.into(),
            request_timeout: config.request_timeout(),
            stream_timeout: config.stream_timeout(),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/v1/{}", self.base_url, endpoint.path())
    }

    /// `deadline` bounds the whole exchange. Without one, only the client's
    /// connect and per-read timeouts apply.
    async fn send(&self, request: &BenchRequest, deadline: Option<Duration>) -> Result<reqwest::Response> {
        let url = self.url(request.endpoint);
        tracing::info!(%url, model = %request.model, stream = request.stream, "sending benchmark request");
        let mut builder = self.http.post(&url).bearer_auth(&self.api_key).json(&request.body());
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }
        let reported = deadline.unwrap_or(self.stream_timeout);
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, reported))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    /// Sends the request and reads the whole body. The elapsed time covers the
    /// full round trip.
    pub async fn fetch(&self, request: &BenchRequest) -> Result<(BufferedReply, f64)> {
        let start = Instant::now();
        let response = self.send(request, Some(self.request_timeout)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.request_timeout))?;
        let elapsed = start.elapsed().as_secs_f64();
        Ok((BufferedReply::from_slice(&body)?, elapsed))
    }

    /// Sends the request and consumes the event stream until `[DONE]` or close.
    /// A slow stream runs as long as each read arrives within the stream timeout.
    pub async fn stream(&self, request: &BenchRequest) -> Result<StreamOutcome> {
        let response = self.send(request, None).await?;
        let timeout = self.stream_timeout;
        StreamConsumer::new()
            .consume(response.bytes_stream())
            .await
            .map_err(|e| ClientError::from_reqwest(e, timeout))
    }

    pub async fn run_buffered(&self, request: &BenchRequest, counter: &TokenCounter) -> Result<BenchmarkResult> {
        let (reply, elapsed) = self.fetch(request).await?;
        let tokens = reply.tokens(counter, Some(request.model.as_str()));
        tracing::info!(tokens, elapsed, usage = reply.usage_tokens.is_some(), "buffered response complete");
        Ok(BenchmarkResult::new(Mode::NonStream, tokens, elapsed))
    }

    pub async fn run_streaming(&self, request: &BenchRequest, counter: &TokenCounter) -> Result<BenchmarkResult> {
        let outcome = self.stream(request).await?;
        let count = counter.count(outcome.full_text.as_str(), Some(request.model.as_str()));
        tracing::info!(
            tokens = count.tokens,
            strategy = ?count.strategy,
            fragments = outcome.fragments,
            elapsed = outcome.elapsed_seconds,
            termination = ?outcome.termination,
            "stream complete"
        );
        Ok(BenchmarkResult::new(Mode::Stream, count.tokens, outcome.elapsed_seconds))
    }

    pub async fn run(&self, request: &BenchRequest, counter: &TokenCounter) -> Result<BenchmarkResult> {
        if request.stream {
            self.run_streaming(request, counter).await
        } else {
            self.run_buffered(request, counter).await
        }
    }
}
