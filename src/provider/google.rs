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

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GOOGLE_MODEL: &str = "gemini-1.5-flash";

/// Gemini `generateContent`.
pub struct GoogleProvider {
    descriptor: ProviderDescriptor,
    http: Client,
    url: String,
    api_key: String,
}

impl GoogleProvider {
    pub fn new(http: Client, settings: &ProviderSettings) -> Self {
        let base = settings.base_url.as_deref().unwrap_or(GOOGLE_BASE_URL);
        let model = settings.model.as_deref().unwrap_or(GOOGLE_MODEL);
        Self {
            descriptor: ProviderDescriptor::new(ProviderName::Google, true, 4),
            http,
            url: format!("{}/models/{model}:generateContent", base.trim_end_matches('/')),
            api_key: settings.api_key.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let body: GenerateResponse = resp.json().await?;
        non_empty(extract_text(body)?)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn request_body(request: &GenerationRequest) -> Value {
    let mut parts = vec![json!({ "text": request.user_prompt })];
    if let Some(image) = &request.image {
        let (mime_type, data) = split_data_url(image);
        parts.push(json!({ "inlineData": { "mimeType": mime_type, "data": data } }));
    }

    json!({
        "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        },
    })
}

fn extract_text(body: GenerateResponse) -> Result<String, ProviderError> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no candidates returned".into()))?;

    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_settings() {
        let settings = ProviderSettings {
            api_key: Some("k".into()),
            model: Some("gemini-pro".into()),
            base_url: Some("http://localhost:9000/".into()),
        };
        let p = GoogleProvider::new(Client::new(), &settings);
        assert_eq!(p.url, "http://localhost:9000/models/gemini-pro:generateContent");
    }

    #[test]
    fn test_body_and_extract() {
        let req = GenerationRequest {
            system_instruction: "sys".into(),
            user_prompt: "hi".into(),
            image: Some("QUJD".into()),
        };
        let body = request_body(&req);
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "QUJD");

        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"x\""},{"text":":1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(resp).unwrap(), "{\"x\":1}");
    }
}
