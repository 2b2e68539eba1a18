//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini generation API.
//! It implements the `DocumentQaService` port from the `core` crate.
//!
//! The full document text is embedded in a single request, whatever its
//! size; prompt chunking or truncation would need its own agreed policy.
//! Provider calls are never retried and carry no client-side timeout.

const PROMPT_TEMPLATE: &str = r#"You are a helpful assistant that answers questions about PDF documents.

PDF CONTENT:
{pdf_content}

USER QUESTION:
{message}

Please provide a detailed, accurate, and helpful response based on the PDF content above."#;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

use async_trait::async_trait;
use pdf_chat_core::ports::{DocumentQaService, PortError, PortResult};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DocumentQaService` against the Gemini
/// `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Interpolates the document text and the question into the fixed
    /// prompt template. Both are embedded verbatim.
    fn build_prompt(pdf_content: &str, message: &str) -> String {
        PROMPT_TEMPLATE
            .replace("{pdf_content}", pdf_content)
            .replace("{message}", message)
    }
}

//=========================================================================================
// `DocumentQaService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentQaService for GeminiAdapter {
    async fn answer(&self, pdf_content: &str, message: &str) -> PortResult<String> {
        let prompt = Self::build_prompt(pdf_content, message);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Upstream(format!(
                "Gemini API returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| {
                PortError::Upstream("Gemini API response contained no candidates".to_string())
            })?;

        Ok(text)
    }
}
