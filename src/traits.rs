use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use crate::{error::Result, models::*};

#[async_trait]
pub trait CompletionProvider: Send + Sync + std::fmt::Debug {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>>;

    fn name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    fn available_models(&self) -> Vec<&'static str>;
}
