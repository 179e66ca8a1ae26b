use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    #[default]
    ChatCompletions,
    Completions,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ChatCompletions => "chat/completions",
            Endpoint::Completions => "completions",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat/completions" => Ok(Endpoint::ChatCompletions),
            "completions" => Ok(Endpoint::Completions),
            other => Err(format!("unknown endpoint {other:?}, expected chat/completions or completions")),
        }
    }
}

/// One benchmark request, independent of where it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchRequest {
    pub model: String,
    pub prompt: String,
    pub endpoint: Endpoint,
    pub stream: bool,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestBody<'a> {
    Chat {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        stream: bool,
        max_tokens: u32,
    },
    Completion {
        model: &'a str,
        prompt: &'a str,
        stream: bool,
        max_tokens: u32,
    },
}

impl BenchRequest {
    pub fn body(&self) -> RequestBody<'_> {
        match self.endpoint {
            Endpoint::ChatCompletions => RequestBody::Chat {
                model: &self.model,
                messages: vec![ChatMessage { role: "user", content: &self.prompt }],
                stream: self.stream,
                max_tokens: self.max_tokens,
            },
            Endpoint::Completions => RequestBody::Completion {
                model: &self.model,
                prompt: &self.prompt,
                stream: self.stream,
                max_tokens: self.max_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(endpoint: Endpoint) -> BenchRequest {
        BenchRequest {
            model: "m".into(),
            prompt: "Say hi".into(),
            endpoint,
            stream: true,
            max_tokens: 16,
        }
    }

    #[test]
    fn chat_body_wraps_prompt_in_user_message() {
        let body = serde_json::to_value(request(Endpoint::ChatCompletions).body()).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "m",
                "messages": [{"role": "user", "content": "Say hi"}],
                "stream": true,
                "max_tokens": 16,
            })
        );
    }

    #[test]
    fn completion_body_sends_raw_prompt() {
        let body = serde_json::to_value(request(Endpoint::Completions).body()).unwrap();
        assert_eq!(body, json!({"model": "m", "prompt": "Say hi", "stream": true, "max_tokens": 16}));
    }

    #[test]
    fn endpoint_parses_cli_values() {
        assert_eq!("completions".parse::<Endpoint>(), Ok(Endpoint::Completions));
        assert_eq!("chat/completions".parse::<Endpoint>(), Ok(Endpoint::ChatCompletions));
        assert!("embeddings".parse::<Endpoint>().is_err());
    }
}
