pub mod azure;
pub mod llm;

pub use azure::AzureOpenAIClient;
pub use llm::{BoxStream, LLMClient, MessageChunk};
