//! Fragment extraction for the two streaming chunk schemas.
//!
//! Chat chunks carry text in `choices[0].delta.content`, completion chunks in
//! `choices[0].text`. The shape is picked by looking at which field is there.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentSchema {
    ChatDelta,
    CompletionText,
    /// Payload that was not JSON and is taken verbatim.
    RawUnparsed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChoiceShape<'a> {
    ChatDelta(&'a Map<String, Value>),
    CompletionText(&'a Value),
}

impl<'a> ChoiceShape<'a> {
    /// A `delta` object wins over a `text` field.
    pub fn detect(choice: &'a Value) -> Option<Self> {
        let choice = choice.as_object()?;
        if let Some(delta) = choice.get("delta").and_then(Value::as_object) {
            return Some(Self::ChatDelta(delta));
        }
        choice.get("text").map(Self::CompletionText)
    }

    pub fn schema(&self) -> FragmentSchema {
        match self {
            Self::ChatDelta(_) => FragmentSchema::ChatDelta,
            Self::CompletionText(_) => FragmentSchema::CompletionText,
        }
    }

    /// Empty when the text field is missing or not a string.
    pub fn text(&self) -> &'a str {
        match self {
            Self::ChatDelta(delta) => delta.get("content").and_then(Value::as_str).unwrap_or(""),
            Self::CompletionText(text) => text.as_str().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub schema: FragmentSchema,
}

const NON_FINITE_LITERALS: [&str; 3] = ["NaN", "Infinity", "-Infinity"];

/// Text carried by a single stream payload, or `None` when there is nothing to
/// accumulate. Payloads that are not JSON pass through unchanged.
pub fn extract_fragment(payload: &str) -> Option<ExtractedText> {
    // Non-finite literals are valid for lenient JSON readers but carry no text.
    if payload.is_empty() || NON_FINITE_LITERALS.contains(&payload) {
        return None;
    }
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => {
            return Some(ExtractedText { text: payload.to_string(), schema: FragmentSchema::RawUnparsed })
        }
    };
    let choice = value.get("choices").and_then(|choices| choices.get(0))?;
    let shape = ChoiceShape::detect(choice)?;
    let text = shape.text();
    if text.is_empty() {
        return None;
    }
    Some(ExtractedText { text: text.to_string(), schema: shape.schema() })
}
