//! Ollama text generation adapter implementing NotePort.

use crate::domain::error::PricecastError;
use crate::ports::note_port::NotePort;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaAdapter {
    client: reqwest::blocking::Client,
    host: String,
    model: String,
}

impl OllamaAdapter {
    pub fn new(host: &str, model: &str) -> Result<Self, PricecastError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PricecastError::NoteGeneration {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

impl NotePort for OllamaAdapter {
    fn generate(&self, prompt: &str) -> Result<String, PricecastError> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| PricecastError::NoteGeneration {
                reason: format!(
                    "failed to call Ollama at {}: is it running? ({e})",
                    self.host
                ),
            })?;

        if !response.status().is_success() {
            return Err(PricecastError::NoteGeneration {
                reason: format!("Ollama returned HTTP {}", response.status()),
            });
        }

        let data: GenerateResponse =
            response.json().map_err(|e| PricecastError::NoteGeneration {
                reason: format!("unexpected Ollama response: {e}"),
            })?;

        let text = data.response.trim();
        if text.is_empty() {
            return Err(PricecastError::NoteGeneration {
                reason: "Ollama returned an empty response".to_string(),
            });
        }
        Ok(text.to_string())
    }
}
