use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{GenerationRequest, GenerationResponse, Usage},
    LlmError, LlmProvider,
};
use crate::store::models::Role;

/// Any endpoint speaking the OpenAI `/chat/completions` dialect.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    fn messages(request: &GenerationRequest) -> Vec<Value> {
        let mut messages = vec![json!({
            "role": "system",
            "content": request.system_instruction,
        })];
        messages.extend(request.turns.iter().map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "assistant",
                Role::System => "system",
            };
            json!({ "role": role, "content": turn.text })
        }));
        messages
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingCredential(
                "OpenAI API key is missing".to_string(),
            ));
        }

        let body = json!({
            "model": self.model,
            "messages": Self::messages(request),
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited);
            }
            return Err(LlmError::Api(format!("OpenAI Error {}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|_| LlmError::InvalidResponse)?;

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
        });

        Ok(GenerationResponse {
            text,
            model: self.model.clone(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::Turn;

    #[test]
    fn messages_lead_with_instruction_and_rename_model() {
        let request = GenerationRequest {
            system_instruction: "rules".to_string(),
            turns: vec![
                Turn {
                    role: Role::User,
                    text: "q1".to_string(),
                },
                Turn {
                    role: Role::Model,
                    text: "a1".to_string(),
                },
                Turn {
                    role: Role::System,
                    text: "note".to_string(),
                },
                Turn {
                    role: Role::User,
                    text: "q2".to_string(),
                },
            ],
            temperature: 0.3,
        };

        let messages = OpenAiProvider::messages(&request);
        let pairs: Vec<(&str, &str)> = messages
            .iter()
            .map(|m| (m["role"].as_str().unwrap(), m["content"].as_str().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("system", "rules"),
                ("user", "q1"),
                ("assistant", "a1"),
                ("system", "note"),
                ("user", "q2"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_key_fails_before_any_request() {
        let provider = OpenAiProvider::new(
            " ".to_string(),
            "http://127.0.0.1:9".to_string(),
            "gpt-4o-mini".to_string(),
        );
        let request = GenerationRequest {
            system_instruction: String::new(),
            turns: Vec::new(),
            temperature: 0.3,
        };
        assert!(matches!(
            provider.generate(&request).await,
            Err(LlmError::MissingCredential(_))
        ));
    }
}
