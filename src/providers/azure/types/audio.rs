use super::shared::FileUpload;
use crate::core::AzureError;
use crate::multipart::{MultipartForm, MultipartRequest, Part};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioResponseFormat {
    #[default]
    Json,
    Text,
    Srt,
    VerboseJson,
    Vtt,
}

impl AudioResponseFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Srt => "srt",
            Self::VerboseJson => "verbose_json",
            Self::Vtt => "vtt",
        }
    }

    /// Whether the service answers with a JSON body for this format.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::VerboseJson)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRequest {
    pub file: FileUpload,
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub response_format: Option<AudioResponseFormat>,
    pub temperature: Option<f32>,
}

impl TranscriptionRequest {
    pub fn new(file: FileUpload) -> Self {
        Self {
            file,
            language: None,
            prompt: None,
            response_format: None,
            temperature: None,
        }
    }
}

impl MultipartRequest for TranscriptionRequest {
    fn to_form(&self, boundary: &str) -> Result<MultipartForm, AzureError> {
        let mut form = MultipartForm::new(boundary);
        form.push(Part::file(
            "file",
            &self.file.filename,
            self.file.bytes.clone(),
        ))
        .push_opt("language", self.language.as_deref())
        .push_opt("prompt", self.prompt.as_deref())
        .push_opt("response_format", self.response_format.map(AudioResponseFormat::as_str))
        .push_opt("temperature", self.temperature);
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub file: FileUpload,
    pub prompt: Option<String>,
    pub response_format: Option<AudioResponseFormat>,
    pub temperature: Option<f32>,
}

impl TranslationRequest {
    pub fn new(file: FileUpload) -> Self {
        Self {
            file,
            prompt: None,
            response_format: None,
            temperature: None,
        }
    }
}

impl MultipartRequest for TranslationRequest {
    fn to_form(&self, boundary: &str) -> Result<MultipartForm, AzureError> {
        let mut form = MultipartForm::new(boundary);
        form.push(Part::file(
            "file",
            &self.file.filename,
            self.file.bytes.clone(),
        ))
        .push_opt("prompt", self.prompt.as_deref())
        .push_opt("response_format", self.response_format.map(AudioResponseFormat::as_str))
        .push_opt("temperature", self.temperature);
        Ok(form)
    }
}

/// Transcription or translation result. Plain-text formats fill only `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<AudioSegment>>,
}

impl AudioResult {
    pub fn from_text(text: String) -> Self {
        Self {
            text,
            language: None,
            duration: None,
            segments: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}
