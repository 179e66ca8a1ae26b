use bench_core::{BenchmarkResult, BufferedReply, Mode, TokenCounter};
use serde_json::json;

#[test]
fn usage_tokens_override_local_count() {
    let body = json!({"choices": [{"message": {"content": "hi"}}], "usage": {"total_tokens": 7}});
    let reply = BufferedReply::from_json(&body);
    assert_eq!(reply.text, "hi");
    assert_eq!(reply.tokens(&TokenCounter::heuristic(), None), 7);
}

#[test]
fn completion_body_without_usage_is_counted() {
    let reply = BufferedReply::from_slice(br#"{"choices":[{"text":"one, two"}]}"#).unwrap();
    assert_eq!(reply.usage_tokens, None);
    assert_eq!(reply.tokens(&TokenCounter::heuristic(), None), 3);
}

#[test]
fn odd_bodies_yield_empty_text() {
    for body in [
        json!({}),
        json!({"choices": []}),
        json!({"choices": [{"message": {"content": null}}]}),
        json!({"choices": [{"message": {"role": "assistant"}}]}),
        json!([1, 2, 3]),
    ] {
        let reply = BufferedReply::from_json(&body);
        assert_eq!(reply.text, "", "{body}");
        assert_eq!(reply.tokens(&TokenCounter::heuristic(), None), 0);
    }
}

#[test]
fn message_without_content_falls_back_to_text() {
    let reply = BufferedReply::from_json(&json!({"choices": [{"message": {}, "text": "legacy"}]}));
    assert_eq!(reply.text, "legacy");
}

#[test]
fn throughput_is_tokens_over_seconds() {
    let result = BenchmarkResult::new(Mode::NonStream, 100, 4.0);
    assert_eq!(result.tokens_per_second, 25.0);
}

#[test]
fn report_json_is_rounded() {
    let result = BenchmarkResult::new(Mode::Stream, 10, 3.0);
    let value: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "mode": "stream",
            "tokens": 10,
            "elapsed_seconds": 3.0,
            "tokens_per_second": 3.333333,
        })
    );
}

#[test]
fn zero_elapsed_reports_infinity() {
    let result = BenchmarkResult::new(Mode::Stream, 1, 0.0);
    let text = result.to_json_pretty().unwrap();
    assert!(text.contains(r#""tokens_per_second": "Infinity""#), "{text}");
    assert!(text.contains(r#""mode": "stream""#));
    assert!(text.contains(r#""elapsed_seconds": 0.0"#));
}
