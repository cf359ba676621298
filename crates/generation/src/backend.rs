use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call knobs forwarded untouched to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// An external text-generation service (LLM API, local model server).
///
/// Implementations must be safe to call concurrently; the scheduler bounds
/// how many calls are outstanding.
#[async_trait]
pub trait TextGenerationBackend: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, BackendError>;
}
