use super::{Variant, WireShape};
use crate::core::AzureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

/// Embedding `input`: text, a batch of texts, tokens, or a batch of token lists.
///
/// An empty array decodes as `TextArray(vec![])` because string arrays are
/// probed before number arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingInput {
    Text(String),
    TextArray(Vec<String>),
    Tokens(Vec<u32>),
    TokenBatches(Vec<Vec<u32>>),
}

impl Variant for EmbeddingInput {
    const NAME: &'static str = "EmbeddingInput";
    const SHAPES: &'static [WireShape] = &[
        WireShape::String,
        WireShape::StringArray,
        WireShape::NumberArray,
        WireShape::NestedNumberArray,
    ];

    fn to_wire(&self) -> Result<Value, AzureError> {
        let wire = match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::TextArray(texts) => serde_json::to_value(texts)?,
            Self::Tokens(tokens) => serde_json::to_value(tokens)?,
            Self::TokenBatches(batches) => serde_json::to_value(batches)?,
        };
        Ok(wire)
    }

    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        let value = value.clone();
        match shape {
            WireShape::String => Ok(Self::Text(serde_json::from_value(value)?)),
            WireShape::StringArray => Ok(Self::TextArray(serde_json::from_value(value)?)),
            WireShape::NumberArray => Ok(Self::Tokens(serde_json::from_value(value)?)),
            WireShape::NestedNumberArray => Ok(Self::TokenBatches(serde_json::from_value(value)?)),
            _ => Err(AzureError::unrecognized(Self::NAME, &value)),
        }
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        Self::TextArray(texts)
    }
}

/// One embedding as returned by the service: floats, or base64 when the
/// request asked for `encoding_format = "base64"`.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingVector {
    Float(Vec<f64>),
    Base64(String),
}

impl EmbeddingVector {
    /// Encodes `values` as little-endian f32 bytes in standard base64.
    pub fn base64_from_f32(values: &[f32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::Base64(STANDARD.encode(bytes))
    }

    /// Numeric view of the vector.
    ///
    /// Base64 payloads are read as consecutive little-endian f32 values.
    /// Returns `None` when the payload is not valid base64 or its length is
    /// not a multiple of four bytes.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            Self::Float(values) => Some(values.iter().map(|&v| v as f32).collect()),
            Self::Base64(encoded) => {
                let bytes = STANDARD.decode(encoded).ok()?;
                if bytes.len() % 4 != 0 {
                    return None;
                }
                let floats = bytes
                    .chunks_exact(4)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect();
                Some(floats)
            }
        }
    }
}

impl Variant for EmbeddingVector {
    const NAME: &'static str = "EmbeddingVector";
    const SHAPES: &'static [WireShape] = &[WireShape::String, WireShape::NumberArray];

    fn to_wire(&self) -> Result<Value, AzureError> {
        match self {
            Self::Float(values) => Ok(serde_json::to_value(values)?),
            Self::Base64(encoded) => Ok(Value::String(encoded.clone())),
        }
    }

    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        match shape {
            WireShape::String => Ok(Self::Base64(serde_json::from_value(value.clone())?)),
            WireShape::NumberArray => Ok(Self::Float(serde_json::from_value(value.clone())?)),
            _ => Err(AzureError::unrecognized(Self::NAME, value)),
        }
    }
}

impl_serde_via_variant!(EmbeddingInput, EmbeddingVector);
