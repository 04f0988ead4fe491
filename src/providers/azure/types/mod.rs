pub mod audio;
pub mod chat_completion_chunk;
pub mod chat_completion_object;
pub mod chat_completion_request;
pub mod embeddings;
pub mod images;
pub mod message;
pub mod shared;

pub use audio::{AudioResponseFormat, AudioResult, TranscriptionRequest, TranslationRequest};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkAccumulator};
pub use chat_completion_object::ChatCompletionObject;
pub use chat_completion_request::{ChatCompletionRequest, StreamOptions};
pub use embeddings::{EmbeddingsRequest, EmbeddingsResponse, EncodingFormat};
pub use images::{
    ImageEditRequest, ImageGenerationRequest, ImageSize, ImageVariationRequest, ImagesResponse,
};
pub use message::{FinishReason, Message, ResponseFormat, Tool, ToolCall};
pub use shared::{ErrorResponse, FileUpload, Usage};
