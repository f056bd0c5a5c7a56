use crate::providers::{build_system_prompt, TranslationProvider};
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Generate-content style provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(text: &str, target_language: &str) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: build_system_prompt(target_language),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        }
    }

    async fn request_translation(&self, text: &str, target_language: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(text, target_language))
            .send()
            .await
            .context("Failed to send translation request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Gemini API error during translation ({}): {}", status, body);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini translation response")?;

        let candidate = generated
            .candidates
            .into_iter()
            .next()
            .context("Gemini translation response contained no candidates")?;

        let translated: String = candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();

        Ok(translated.trim().to_string())
    }
}

impl TranslationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        self.request_translation(text, target_language).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn create_gemini_response(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts
            .iter()
            .map(|text| serde_json::json!({ "text": text }))
            .collect();
        serde_json::json!({
            "candidates": [
                {
                    "content": { "role": "model", "parts": parts },
                    "finishReason": "STOP"
                }
            ]
        })
    }

    #[test]
    fn test_request_uses_camel_case_fields() {
        let json = serde_json::to_value(GeminiProvider::build_request("Hello", "fr"))
            .expect("Should serialize");

        assert!(json.get("systemInstruction").is_some());
        assert!(json.get("generationConfig").is_some());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_endpoint_includes_model() {
        let provider = GeminiProvider::new(
            reqwest::Client::new(),
            "https://example.test/v1beta/",
            "key",
            "gemini-1.5-flash",
        );
        assert_eq!(
            provider.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_translate_success_joins_parts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "gemini-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Good morning" }] }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_gemini_response(&["Bonjour", " à tous\n"])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = GeminiProvider::new(
            reqwest::Client::new(),
            &format!("{}/v1beta", mock_server.uri()),
            "gemini-key",
            "gemini-1.5-flash",
        );

        let result = provider
            .translate("Good morning", "fr")
            .await
            .expect("Should succeed");
        assert_eq!(result, "Bonjour à tous");
    }

    #[tokio::test]
    async fn test_translate_no_candidates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&mock_server)
            .await;

        let provider =
            GeminiProvider::new(reqwest::Client::new(), &mock_server.uri(), "k", "gemini-1.5-flash");
        let err = provider.translate("Hello", "fr").await.unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[tokio::test]
    async fn test_translate_api_error_called_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider =
            GeminiProvider::new(reqwest::Client::new(), &mock_server.uri(), "k", "gemini-1.5-flash");
        let err = provider.translate("Hello", "fr").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
