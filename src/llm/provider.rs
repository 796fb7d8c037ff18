use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::{ImageData, ProviderError};

/// Incremental text from the streaming completion endpoint.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// The provider seam the agency pipeline talks through. `persona` carries
/// the system instruction for the call; `prompt` is the assembled user turn.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        persona: &str,
        prompt: &str,
        image: Option<&ImageData>,
    ) -> Result<String, ProviderError>;

    async fn generate_stream(
        &self,
        persona: &str,
        prompt: &str,
    ) -> Result<TextStream, ProviderError>;
}
