//! HTTP-backed generation collaborators.
//!
//! Thin reqwest client speaking a small JSON protocol to a generation
//! gateway. The session never sees HTTP: errors map into the generation
//! variants and degrade like any other collaborator failure.

use crate::error::{DreamQuestError, Result};
use crate::story::generator::{ImageGenerator, SpeechGenerator, TextGenerator};
use crate::story::types::{HistoryItem, StoryTurn};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

/// Client for a generation gateway exposing `/story/new`, `/story/continue`,
/// `/image` and `/speech`.
pub struct RemoteGenerators {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewStoryRequest<'a> {
    theme: &'a str,
    protagonist: &'a str,
    language: &'a str,
}

#[derive(Serialize)]
struct ContinueRequest<'a> {
    history: &'a [HistoryItem],
    action: &'a str,
    language: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    description: &'a str,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
}

impl RemoteGenerators {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        failure: impl Fn(String) -> DreamQuestError,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| failure(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(failure(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| failure(format!("failed to read response: {}", e)))?;
        serde_json::from_str(&text).map_err(|e| failure(format!("unparseable response: {}", e)))
    }
}

#[async_trait]
impl TextGenerator for RemoteGenerators {
    async fn new_story(
        &self,
        theme: &str,
        protagonist: &str,
        language: &str,
    ) -> Result<StoryTurn> {
        let value = self
            .post_json(
                "/story/new",
                &NewStoryRequest {
                    theme,
                    protagonist,
                    language,
                },
                |message| DreamQuestError::TextGeneration { message },
            )
            .await?;
        parse_turn(value)
    }

    async fn continue_story(
        &self,
        history: &[HistoryItem],
        action: &str,
        language: &str,
    ) -> Result<StoryTurn> {
        let value = self
            .post_json(
                "/story/continue",
                &ContinueRequest {
                    history,
                    action,
                    language,
                },
                |message| DreamQuestError::TextGeneration { message },
            )
            .await?;
        parse_turn(value)
    }
}

#[async_trait]
impl ImageGenerator for RemoteGenerators {
    async fn generate(&self, description: &str) -> Result<Vec<u8>> {
        let value = self
            .post_json("/image", &ImageRequest { description }, |message| {
                DreamQuestError::ImageGeneration { message }
            })
            .await?;
        let b64 = extract_base64_field(&value, "image_base64")
            .ok_or_else(|| DreamQuestError::ImageGeneration {
                message: "response carries no image".to_string(),
            })?;
        BASE64
            .decode(b64)
            .map_err(|e| DreamQuestError::ImageGeneration {
                message: format!("image payload is not base64: {}", e),
            })
    }
}

#[async_trait]
impl SpeechGenerator for RemoteGenerators {
    async fn synthesize(&self, narrative: &str) -> Result<String> {
        let value = self
            .post_json("/speech", &SpeechRequest { text: narrative }, |message| {
                DreamQuestError::SpeechGeneration { message }
            })
            .await?;
        extract_base64_field(&value, "audio_base64")
            .map(str::to_string)
            .ok_or_else(|| DreamQuestError::SpeechGeneration {
                message: "response carries no audio".to_string(),
            })
    }
}

fn parse_turn(value: serde_json::Value) -> Result<StoryTurn> {
    serde_json::from_value(value).map_err(|e| DreamQuestError::TextGeneration {
        message: format!("turn shape mismatch: {}", e),
    })
}

fn extract_base64_field<'v>(value: &'v serde_json::Value, field: &str) -> Option<&'v str> {
    value.get(field).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}
