pub mod cli;
pub mod codec;
pub mod core;
pub mod eventsource;
pub mod multipart;
pub mod providers;

pub use crate::core::{AzureError, Config};
pub use providers::{AzureOpenAIClient, LLMClient};
