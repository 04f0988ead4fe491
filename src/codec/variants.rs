use super::{Variant, WireShape};
use crate::core::AzureError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `stop` accepts a single sequence or a list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopSequences {
    Single(String),
    Many(Vec<String>),
}

impl Variant for StopSequences {
    const NAME: &'static str = "StopSequences";
    const SHAPES: &'static [WireShape] = &[WireShape::String, WireShape::StringArray];

    fn to_wire(&self) -> Result<Value, AzureError> {
        match self {
            Self::Single(stop) => Ok(Value::String(stop.clone())),
            Self::Many(stops) => Ok(serde_json::to_value(stops)?),
        }
    }

    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        match shape {
            WireShape::String => Ok(Self::Single(serde_json::from_value(value.clone())?)),
            WireShape::StringArray => Ok(Self::Many(serde_json::from_value(value.clone())?)),
            _ => Err(AzureError::unrecognized(Self::NAME, value)),
        }
    }
}

impl From<&str> for StopSequences {
    fn from(stop: &str) -> Self {
        Self::Single(stop.to_string())
    }
}

impl From<Vec<String>> for StopSequences {
    fn from(stops: Vec<String>) -> Self {
        Self::Many(stops)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// One element of a multi-part message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message `content`: plain text or an array of typed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }
}

impl Variant for MessageContent {
    const NAME: &'static str = "MessageContent";
    const SHAPES: &'static [WireShape] = &[WireShape::String, WireShape::ObjectArray];

    fn to_wire(&self) -> Result<Value, AzureError> {
        match self {
            Self::Text(text) => Ok(Value::String(text.clone())),
            Self::Parts(parts) => Ok(serde_json::to_value(parts)?),
        }
    }

    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        match shape {
            WireShape::String => Ok(Self::Text(serde_json::from_value(value.clone())?)),
            WireShape::ObjectArray => Ok(Self::Parts(serde_json::from_value(value.clone())?)),
            _ => Err(AzureError::unrecognized(Self::NAME, value)),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// `tool_choice`: a mode keyword or a named function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    None,
    Auto,
    Required,
    Named(String),
}

#[derive(Serialize, Deserialize)]
struct NamedChoice {
    #[serde(rename = "type")]
    choice_type: String,
    function: NamedFunction,
}

#[derive(Serialize, Deserialize)]
struct NamedFunction {
    name: String,
}

impl Variant for ToolChoice {
    const NAME: &'static str = "ToolChoice";
    const SHAPES: &'static [WireShape] = &[WireShape::String, WireShape::Object];

    fn to_wire(&self) -> Result<Value, AzureError> {
        let wire = match self {
            Self::None => Value::from("none"),
            Self::Auto => Value::from("auto"),
            Self::Required => Value::from("required"),
            Self::Named(name) => serde_json::to_value(NamedChoice {
                choice_type: "function".to_string(),
                function: NamedFunction { name: name.clone() },
            })?,
        };
        Ok(wire)
    }

    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        match (shape, value.as_str()) {
            (WireShape::String, Some("none")) => Ok(Self::None),
            (WireShape::String, Some("auto")) => Ok(Self::Auto),
            (WireShape::String, Some("required")) => Ok(Self::Required),
            (WireShape::Object, _) => {
                let named: NamedChoice = serde_json::from_value(value.clone())?;
                if named.choice_type == "function" {
                    Ok(Self::Named(named.function.name))
                } else {
                    Err(AzureError::unrecognized(Self::NAME, value))
                }
            }
            _ => Err(AzureError::unrecognized(Self::NAME, value)),
        }
    }
}

impl_serde_via_variant!(StopSequences, MessageContent, ToolChoice);
