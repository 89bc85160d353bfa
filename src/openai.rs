use crate::config::Provider;
use crate::error::{GitWiseError, Result};
use crate::prompt::PromptMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// One chat-completion call.
#[derive(Debug, Clone)]
pub struct Completion<'a> {
    pub model: &'a str,
    pub messages: &'a [PromptMessage],
    pub max_output_tokens: u32,
    pub temperature: f32,
}

pub trait ModelBackend {
    fn complete(&self, completion: &Completion<'_>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    max_tokens: u32,
    n: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend for any server speaking the OpenAI chat-completions protocol.
pub struct OpenAiBackend {
    api_key: String,
    endpoint: String,
    agent: ureq::Agent,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            agent: http_agent(),
        }
    }

    /// Sends a one-token request to confirm the key is accepted.
    pub fn validate_api_key(&self, model: &str) -> Result<()> {
        let messages = [PromptMessage::user("Hi")];
        self.complete(&Completion {
            model,
            messages: &messages,
            max_output_tokens: 1,
            temperature: 0.0,
        })
        .map(|_| ())
        .or_else(|e| match e {
            GitWiseError::EmptyResponse => Ok(()),
            other => Err(other),
        })
    }
}

impl ModelBackend for OpenAiBackend {
    fn complete(&self, completion: &Completion<'_>) -> Result<String> {
        let request = ChatRequest {
            model: completion.model,
            messages: completion.messages,
            max_tokens: completion.max_output_tokens,
            n: 1,
            temperature: completion.temperature,
        };
        let body = serde_json::to_string(&request)?;
        debug!(
            model = completion.model,
            max_tokens = completion.max_output_tokens,
            bytes = body.len(),
            "sending completion request"
        );

        let response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&body)
            .map_err(handle_ureq_error)?;

        let status = response.status().as_u16();
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| GitWiseError::NetworkError(e.to_string()))?;

        match status {
            200..=299 => parse_completion(&text),
            401 => Err(GitWiseError::InvalidApiKey("Authentication failed".to_string())),
            429 => Err(GitWiseError::ApiError {
                status,
                message: "Rate limited. Please wait and try again.".to_string(),
            }),
            _ => Err(GitWiseError::ApiError {
                status,
                message: text,
            }),
        }
    }
}

pub fn connect(provider: Provider, api_key: String, api_base: &str) -> Box<dyn ModelBackend> {
    match provider {
        Provider::OpenAi => Box::new(OpenAiBackend::new(api_key, api_base)),
    }
}

fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GitWiseError::EmptyResponse)
}

fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .http_status_as_error(false)
        .build()
        .new_agent()
}

fn handle_ureq_error(e: ureq::Error) -> GitWiseError {
    match e {
        ureq::Error::StatusCode(401) => {
            GitWiseError::InvalidApiKey("Authentication failed".to_string())
        }
        ureq::Error::StatusCode(status) => GitWiseError::ApiError {
            status,
            message: "API request failed".to_string(),
        },
        other => GitWiseError::NetworkError(other.to_string()),
    }
}
