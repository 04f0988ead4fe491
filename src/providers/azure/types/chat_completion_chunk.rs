use super::message::{FinishReason, FunctionCall, Message, Role, ToolCall, ToolType};
use super::shared::{LogProbs, Usage};
use crate::codec::MessageContent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One streamed event. Azure sends a leading chunk with empty `choices` and
/// blank identifiers that only carries prompt filter results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<LogProbs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Delta {
    /// Present only on the first delta of a choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

/// Fragment of a tool call, addressed by its position in the call list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<ToolType>,
    #[serde(default)]
    pub function: FunctionCallDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug, Default)]
struct PendingChoice {
    content: String,
    refusal: Option<String>,
    tool_calls: BTreeMap<u32, PendingToolCall>,
    finish_reason: Option<FinishReason>,
}

/// Rebuilds full messages from deltas, concatenating fragments per choice in
/// arrival order.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    choices: BTreeMap<u32, PendingChoice>,
    usage: Option<Usage>,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        for choice in &chunk.choices {
            let pending = self.choices.entry(choice.index).or_default();
            if let Some(content) = &choice.delta.content {
                pending.content.push_str(content);
            }
            if let Some(refusal) = &choice.delta.refusal {
                pending
                    .refusal
                    .get_or_insert_with(String::new)
                    .push_str(refusal);
            }
            for call in choice.delta.tool_calls.iter().flatten() {
                let tool_call = pending.tool_calls.entry(call.index).or_default();
                if let Some(id) = &call.id {
                    tool_call.id.clone_from(id);
                }
                if let Some(name) = &call.function.name {
                    tool_call.name.push_str(name);
                }
                if let Some(arguments) = &call.function.arguments {
                    tool_call.arguments.push_str(arguments);
                }
            }
            if choice.finish_reason.is_some() {
                pending.finish_reason = choice.finish_reason;
            }
        }
    }

    pub const fn usage(&self) -> Option<Usage> {
        self.usage
    }

    pub fn finish_reason(&self, index: u32) -> Option<FinishReason> {
        self.choices.get(&index).and_then(|choice| choice.finish_reason)
    }

    /// One assistant message per choice, ordered by choice index.
    pub fn into_messages(self) -> Vec<Message> {
        self.choices
            .into_values()
            .map(|choice| {
                let tool_calls: Vec<ToolCall> = choice
                    .tool_calls
                    .into_values()
                    .map(|call| ToolCall {
                        id: call.id,
                        call_type: ToolType::Function,
                        function: FunctionCall {
                            name: call.name,
                            arguments: call.arguments,
                        },
                    })
                    .collect();
                Message::Assistant {
                    content: (!choice.content.is_empty())
                        .then(|| MessageContent::Text(choice.content)),
                    name: None,
                    refusal: choice.refusal,
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                }
            })
            .collect()
    }
}
