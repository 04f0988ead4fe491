pub mod client;
pub mod types;

pub use client::{AzureOpenAIClient, Operation, TransportOwnership};
