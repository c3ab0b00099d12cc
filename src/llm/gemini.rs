use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{GenerationRequest, GenerationResponse, Usage},
    LlmError, LlmProvider,
};
use crate::store::models::Role;

/// Google Generative Language `generateContent` client.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    fn body(request: &GenerationRequest) -> Value {
        let contents: Vec<Value> = request
            .turns
            .iter()
            .map(|turn| {
                // contents only accepts user and model turns
                let role = match turn.role {
                    Role::User => "user",
                    Role::Model | Role::System => "model",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": turn.text }],
                })
            })
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": contents,
            "generationConfig": { "temperature": request.temperature },
        })
    }
}

/// Concatenated text parts of the first candidate, if there are any.
fn response_text(json: &Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingCredential(
                "Gemini API key is missing".to_string(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited);
            }
            return Err(LlmError::Api(format!("Gemini Error {}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|_| LlmError::InvalidResponse)?;

        let usage = json.get("usageMetadata").map(|u| Usage {
            input_tokens: u["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            output_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
        });

        Ok(GenerationResponse {
            text: response_text(&json),
            model: self.model.clone(),
            usage,
        })
    }
}
