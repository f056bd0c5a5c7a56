use crate::providers::TranslationProvider;
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
}

/// Key-only Google Translate v2 backend, used when no primary provider is set.
pub struct LegacyGoogleProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl LegacyGoogleProvider {
    pub fn new(client: reqwest::Client, api_url: &str, api_key: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn request_translation(&self, text: &str, target_language: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            target: target_language,
            format: "text",
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Google Translate API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Google Translate API error ({}): {}", status, body);
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse Google Translate response")?;

        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .context("Google Translate response contained no translations")
    }
}

impl TranslationProvider for LegacyGoogleProvider {
    fn name(&self) -> &str {
        "google-translate"
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
        matchers::{body_json, header, method},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_translate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "legacy-key"))
            .and(body_json(serde_json::json!({
                "q": "Contact us",
                "target": "de",
                "format": "text"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "translations": [{ "translatedText": "Kontaktieren Sie uns" }] }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider =
            LegacyGoogleProvider::new(reqwest::Client::new(), &mock_server.uri(), "legacy-key");
        let result = provider.translate("Contact us", "de").await.expect("Should succeed");
        assert_eq!(result, "Kontaktieren Sie uns");
    }

    #[tokio::test]
    async fn test_translate_empty_translations() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "translations": [] }
            })))
            .mount(&mock_server)
            .await;

        let provider = LegacyGoogleProvider::new(reqwest::Client::new(), &mock_server.uri(), "k");
        let err = provider.translate("Hello", "de").await.unwrap_err();
        assert!(err.to_string().contains("no translations"));
    }

    #[tokio::test]
    async fn test_translate_forbidden() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = LegacyGoogleProvider::new(reqwest::Client::new(), &mock_server.uri(), "k");
        let err = provider.translate("Hello", "de").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
