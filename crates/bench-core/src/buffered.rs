use serde_json::Value;

use crate::tokens::TokenCounter;

/// Text and server-reported usage pulled from a non-streaming response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedReply {
    pub text: String,
    pub usage_tokens: Option<usize>,
}

impl BufferedReply {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(Self::from_json(&value))
    }

    /// Reads `choices[0].message.content` (chat) or `choices[0].text`
    /// (completion), and `usage.total_tokens` when present.
    pub fn from_json(body: &Value) -> Self {
        let text = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(Value::as_object)
            .and_then(|choice| match choice.get("message").and_then(Value::as_object) {
                Some(message) if message.contains_key("content") => message.get("content"),
                _ => choice.get("text"),
            })
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let usage_tokens = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64)
            .and_then(|tokens| usize::try_from(tokens).ok());
        Self { text, usage_tokens }
    }

    /// Usage tokens win over a locally computed count.
    pub fn tokens(&self, counter: &TokenCounter, model_hint: Option<&str>) -> usize {
        match self.usage_tokens {
            Some(tokens) => tokens,
            None => counter.count(self.text.as_str(), model_hint).tokens,
        }
    }
}
