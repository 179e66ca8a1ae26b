//! Streaming timing and token accounting for throughput benchmarks.

pub mod buffered;
pub mod clock;
pub mod report;
pub mod schema;
pub mod stream;
pub mod tokens;

pub use buffered::BufferedReply;
pub use report::{BenchmarkResult, Mode};
pub use stream::{StreamConsumer, StreamOutcome, Termination};
pub use tokens::{TokenCount, TokenCounter, TokenStrategy, TokenizerCapability};
