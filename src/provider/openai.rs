use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    as_data_url, classify_status, non_empty, Provider, ProviderDescriptor, ProviderError,
    ProviderName, MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use crate::config::ProviderSettings;
use crate::prompt::GenerationRequest;

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.1-8b-instant";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o";

/// OpenAI-style `/chat/completions` endpoint. Serves both Groq and OpenAI.
pub struct ChatCompletionsProvider {
    descriptor: ProviderDescriptor,
    http: Client,
    url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsProvider {
    pub fn groq(http: Client, settings: &ProviderSettings) -> Self {
        Self::with_defaults(
            ProviderDescriptor::new(ProviderName::Groq, false, 1),
            http,
            settings,
            GROQ_URL,
            GROQ_MODEL,
        )
    }

    pub fn openai(http: Client, settings: &ProviderSettings) -> Self {
        Self::with_defaults(
            ProviderDescriptor::new(ProviderName::Openai, true, 2),
            http,
            settings,
            OPENAI_URL,
            OPENAI_MODEL,
        )
    }

    fn with_defaults(
        descriptor: ProviderDescriptor,
        http: Client,
        settings: &ProviderSettings,
        url: &str,
        model: &str,
    ) -> Self {
        Self {
            descriptor,
            http,
            url: settings.base_url.clone().unwrap_or_else(|| url.to_string()),
            model: settings.model.clone().unwrap_or_else(|| model.to_string()),
            api_key: settings.api_key.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = request_body(&self.model, request);

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let body: ChatResponse = resp.json().await?;
        non_empty(extract_text(body)?)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

fn request_body(model: &str, request: &GenerationRequest) -> Value {
    let user_content = match &request.image {
        Some(image) => json!([
            { "type": "text", "text": request.user_prompt },
            { "type": "image_url", "image_url": { "url": as_data_url(image) } },
        ]),
        None => json!(request.user_prompt),
    };

    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system_instruction },
            { "role": "user", "content": user_content },
        ],
        "max_tokens": MAX_OUTPUT_TOKENS,
        "temperature": TEMPERATURE,
    })
}

fn extract_text(body: ChatResponse) -> Result<String, ProviderError> {
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| ProviderError::InvalidResponse("no choices in completion".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(image: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            system_instruction: "sys".into(),
            user_prompt: "hello".into(),
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_text_only_body() {
        let body = request_body("m", &request(None));
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_vision_body() {
        let body = request_body("m", &request(Some("QUJD")));
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["text"], "hello");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,QUJD");
    }

    #[test]
    fn test_extract_text() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{\"a\":1}"}}]}"#).unwrap();
        assert_eq!(extract_text(body).unwrap(), "{\"a\":1}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_text(empty), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = ProviderSettings {
            api_key: Some("k".into()),
            model: None,
            base_url: Some("http://localhost:8081/v1/chat/completions".into()),
        };
        let p = ChatCompletionsProvider::groq(Client::new(), &settings);
        assert_eq!(p.url, "http://localhost:8081/v1/chat/completions");
        assert_eq!(p.model, GROQ_MODEL);
        assert!(!p.descriptor().supports_vision);
    }
}
