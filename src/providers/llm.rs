use crate::core::AzureError;
use crate::providers::azure::types::{
    ChatCompletionChunk, ChatCompletionRequest, FinishReason, Message, Tool,
};
use crate::providers::azure::AzureOpenAIClient;
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

pub type BoxStream = Pin<Box<dyn Stream<Item = Result<MessageChunk, AzureError>> + Send + 'static>>;

/// One incremental piece of a streamed assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChunk {
    /// A text fragment, in arrival order
    Text(String),
    /// Start of a tool call
    ToolCallStart { id: String, name: String },
    /// Content for a tool call's arguments (typically received in multiple chunks)
    ToolCallArgument(String),
    /// The choice finished
    End(FinishReason),
}

#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Query the model with a list of messages and optional tools
    async fn query(
        &self,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<Vec<Message>, AzureError>;

    /// Query the model with streaming response and optional tools
    async fn query_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<BoxStream, AzureError>;
}

fn request_for(messages: &[Message], tools: Option<&[Tool]>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        tools: tools.map(<[Tool]>::to_vec),
        ..ChatCompletionRequest::new(messages.to_vec())
    }
}

#[async_trait]
impl LLMClient for AzureOpenAIClient {
    async fn query(
        &self,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<Vec<Message>, AzureError> {
        let completion = self.chat_completion(&request_for(messages, tools)).await?;
        Ok(completion
            .choices
            .into_iter()
            .map(|choice| choice.message)
            .collect())
    }

    async fn query_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<BoxStream, AzureError> {
        let chunks = self
            .chat_completion_stream(&request_for(messages, tools))
            .await?;
        Ok(chunks_to_messages(chunks).boxed())
    }
}

/// Flattens completion chunks of the first choice into message chunks.
pub fn chunks_to_messages(
    mut stream: impl Stream<Item = Result<ChatCompletionChunk, AzureError>> + Send + Unpin + 'static,
) -> impl Stream<Item = Result<MessageChunk, AzureError>> + Send + 'static {
    try_stream! {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for choice in chunk.choices.into_iter().filter(|choice| choice.index == 0) {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        yield MessageChunk::Text(content);
                    }
                }
                for tool_call in choice.delta.tool_calls.into_iter().flatten() {
                    if let (Some(id), Some(name)) = (tool_call.id, tool_call.function.name) {
                        yield MessageChunk::ToolCallStart { id, name };
                    }
                    if let Some(arguments) = tool_call.function.arguments {
                        if !arguments.is_empty() {
                            yield MessageChunk::ToolCallArgument(arguments);
                        }
                    }
                }
                if let Some(reason) = choice.finish_reason {
                    yield MessageChunk::End(reason);
                }
            }
        }
    }
}
