// text generation - turns plain english into sql
// the output is untrusted: it goes through the gate before anything runs

use crate::Error;
use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A backend that answers a system + user prompt with raw text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    #[default]
    Openai,
    Claude,
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Openai => "gpt-3.5-turbo",
            Self::Claude => "claude-sonnet-4-20250514",
        }
    }

    // where we look for a key when none was passed
    pub fn key_var(&self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

/// Builds the configured backend.
pub fn from_config(config: &Config) -> Result<Box<dyn Generator>, Error> {
    let api_key = config
        .api_key
        .clone()
        .ok_or(Error::MissingApiKey(config.provider.key_var()))?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| config.provider.default_model().to_string());

    Ok(match config.provider {
        Provider::Openai => Box::new(OpenAi::new(api_key, model)),
        Provider::Claude => Box::new(Claude::new(api_key, model)),
    })
}

pub fn system_prompt(schema: &str) -> String {
    format!(
        r#"You are an assistant that converts natural language into safe SQL for a database with this schema:

{schema}

Only return the SQL query. Only write SELECT queries."#
    )
}

pub fn user_prompt(prompt: &str) -> String {
    format!("Convert this to SQL: {prompt}")
}

pub struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Generator for OpenAi {
    async fn generate(&self, system: &str, user: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await?;
            return Err(Error::Generation(error));
        }

        let response: ChatResponse = response.json().await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

pub struct Claude {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

impl Claude {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Generator for Claude {
    async fn generate(&self, system: &str, user: &str) -> Result<String, Error> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: 1024,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await?;
            return Err(Error::Generation(error));
        }

        let response: ClaudeResponse = response.json().await?;

        Ok(response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_default())
    }
}
