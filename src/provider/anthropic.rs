use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    classify_status, non_empty, split_data_url, Provider, ProviderDescriptor, ProviderError,
    ProviderName, MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use crate::config::ProviderSettings;
use crate::prompt::GenerationRequest;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API.
pub struct AnthropicProvider {
    descriptor: ProviderDescriptor,
    http: Client,
    url: String,
    model: String,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(http: Client, settings: &ProviderSettings) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(ProviderName::Anthropic, true, 3),
            http,
            url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_URL.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| ANTHROPIC_MODEL.to_string()),
            api_key: settings.api_key.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request_body(&self.model, request))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let body: MessagesResponse = resp.json().await?;
        non_empty(extract_text(body))
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn request_body(model: &str, request: &GenerationRequest) -> Value {
    let mut content = vec![json!({ "type": "text", "text": request.user_prompt })];
    if let Some(image) = &request.image {
        let (media_type, data) = split_data_url(image);
        content.push(json!({
            "type": "image",
            "source": { "type": "base64", "media_type": media_type, "data": data },
        }));
    }

    json!({
        "model": model,
        "max_tokens": MAX_OUTPUT_TOKENS,
        "temperature": TEMPERATURE,
        "system": request.system_instruction,
        "messages": [{ "role": "user", "content": content }],
    })
}

// Text blocks are concatenated; other block kinds are ignored.
fn extract_text(body: MessagesResponse) -> String {
    body.content
        .into_iter()
        .filter(|b| b.kind == "text")
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_with_image() {
        let req = GenerationRequest {
            system_instruction: "sys".into(),
            user_prompt: "hi".into(),
            image: Some("data:image/jpeg;base64,QUJD".into()),
        };
        let body = request_body("m", &req);
        assert_eq!(body["system"], "sys");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["text"], "hi");
        assert_eq!(content[1]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[1]["source"]["data"], "QUJD");
    }

    #[test]
    fn test_extract_text_blocks() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"{\"a\":"},{"type":"tool_use"},{"type":"text","text":"1}"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body), "{\"a\":1}");
    }
}
