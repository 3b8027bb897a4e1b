//! Language model drivers.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};

use crate::error::AiError;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Something that turns a query plus attached documents into text.
pub trait DescriptionService: Send + Sync {
    /// Send `query` together with `context` documents and return the answer.
    fn describe(&self, query: &str, context: &[String]) -> Result<String, AiError>;
}

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Driver {
    Gemini,
    #[strum(serialize = "openai")]
    OpenAi,
}

/// A model string split into driver and model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub driver: Driver,
    pub name: String,
}

impl ModelSpec {
    /// Parse `<driver>-<model>`. The string is lowercased first and
    /// `google` is an alias for `gemini`.
    pub fn parse(model: &str) -> Result<Self, AiError> {
        let lower = model.to_lowercase();
        let Some((driver, name)) = lower.split_once('-') else {
            return Err(AiError::InvalidModel {
                model: model.to_string(),
            });
        };
        if name.is_empty() {
            return Err(AiError::InvalidModel {
                model: model.to_string(),
            });
        }
        let driver = match driver {
            "google" => Driver::Gemini,
            other => other.parse().map_err(|_| AiError::UnknownDriver {
                driver: other.to_string(),
            })?,
        };
        Ok(Self {
            driver,
            name: name.to_string(),
        })
    }
}

/// Blocking HTTP client for Gemini and OpenAI compatible chat endpoints.
pub struct HttpDescriptionService {
    client: Client,
    spec: ModelSpec,
    api_key: String,
    endpoint: String,
}

impl HttpDescriptionService {
    pub fn new(model: &str, api_key: impl Into<String>, endpoint: Option<String>) -> Result<Self, AiError> {
        let spec = ModelSpec::parse(model)?;
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| match spec.driver {
                Driver::Gemini => GEMINI_ENDPOINT.to_string(),
                Driver::OpenAi => OPENAI_ENDPOINT.to_string(),
            });
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            spec,
            api_key: api_key.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn send<B: Serialize>(&self, request: reqwest::blocking::RequestBuilder, body: &B) -> Result<String, AiError> {
        let response = request.json(body).send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn describe_gemini(&self, query: &str, context: &[String]) -> Result<String, AiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.spec.name);
        let body = gemini_request(query, context);
        let request = self.client.post(url).query(&[("key", self.api_key.as_str())]);
        let text = self.send(request, &body)?;
        let response: GeminiResponse = serde_json::from_str(&text)?;
        Ok(response.text())
    }

    fn describe_openai(&self, query: &str, context: &[String]) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = openai_request(&self.spec.name, query, context);
        let request = self.client.post(url).bearer_auth(&self.api_key);
        let text = self.send(request, &body)?;
        let response: OpenAiResponse = serde_json::from_str(&text)?;
        Ok(response.text())
    }
}

impl DescriptionService for HttpDescriptionService {
    fn describe(&self, query: &str, context: &[String]) -> Result<String, AiError> {
        tracing::debug!(
            driver = %self.spec.driver,
            model = %self.spec.name,
            documents = context.len(),
            "sending description request"
        );
        match self.spec.driver {
            Driver::Gemini => self.describe_gemini(query, context),
            Driver::OpenAi => self.describe_openai(query, context),
        }
    }
}

fn gemini_request(query: &str, context: &[String]) -> serde_json::Value {
    let parts: Vec<_> = std::iter::once(query)
        .chain(context.iter().map(String::as_str))
        .map(|text| json!({ "text": text }))
        .collect();
    json!({ "contents": [{ "role": "user", "parts": parts }] })
}

fn openai_request(model: &str, query: &str, context: &[String]) -> serde_json::Value {
    let mut content = query.to_string();
    for document in context {
        content.push_str("\n\n");
        content.push_str(document);
    }
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
    })
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiResponse {
    fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}
