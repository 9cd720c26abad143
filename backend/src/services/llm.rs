//! Language model collaborator used by the task assistant.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use shared::{ChatRole, ChatTurn};

/// A chat model that answers one utterance given a system prompt and history
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        utterance: &str,
    ) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for any server speaking the OpenAI chat completions protocol
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        log::info!("LLM client initialized for {} ({})", base_url, model);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.llm_base_url,
            config.llm_api_key.clone(),
            &config.llm_model,
            config.llm_timeout_seconds,
        )
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn build_messages(system_prompt: &str, history: &[ChatTurn], utterance: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_prompt.to_string(),
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: role_name(turn.role).to_string(),
        content: turn.content.clone(),
    }));
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: utterance.to_string(),
    });
    messages
}

fn first_choice(response: ChatCompletionsResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("No choices in response"))
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        utterance: &str,
    ) -> Result<String> {
        let request = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: build_messages(system_prompt, history, utterance),
            temperature: 0.2,
        };

        let mut request_builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("LLM API error ({}): {}", status, error_text));
        }

        let body: ChatCompletionsResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        first_choice(body)
    }
}
