use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::CompletionSettings;
use super::prompt::{Message, Prompt};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Legacy single function call, superseded by `tool_calls`.
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    pub arguments: String,
}

impl ChatCompletion {
    pub fn first_message(&self) -> Result<&ReplyMessage> {
        self.choices
            .first()
            .map(|choice| &choice.message)
            .context("No choices in completion")
    }
}

impl ReplyMessage {
    pub fn function_arguments(&self) -> Option<&str> {
        self.tool_calls
            .as_ref()
            .and_then(|calls| calls.first())
            .map(|call| &call.function)
            .or(self.function_call.as_ref())
            .map(|function| function.arguments.as_str())
    }
}

pub async fn complete(
    client: &reqwest::Client,
    settings: &CompletionSettings,
    api_key: &str,
    prompt: &Prompt,
) -> Result<ChatCompletion> {
    let request = ChatRequest {
        model: &settings.model,
        messages: &prompt.messages,
        temperature: settings.temperature,
        n: 1,
        tools: prompt
            .function
            .as_ref()
            .map(|function| vec![json!({ "type": "function", "function": function })]),
        tool_choice: prompt
            .function
            .as_ref()
            .map(|function| json!({ "type": "function", "function": { "name": function.name } })),
    };

    tracing::info!(model = %settings.model, mode = %settings.mode, "requesting completion");

    let response = client
        .post(format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        ))
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .context("Failed to send request to OpenAI API")?
        .error_for_status()
        .context("OpenAI API error")?;

    let completion: ChatCompletion = response
        .json()
        .await
        .context("Failed to parse OpenAI API response")?;

    Ok(completion)
}
