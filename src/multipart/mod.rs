//! `multipart/form-data` body assembly with a caller-chosen boundary.

use crate::core::AzureError;

const CRLF: &[u8] = b"\r\n";
const MAX_BOUNDARY_LEN: usize = 70;
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartPayload {
    Text(String),
    Binary(Vec<u8>),
}

impl PartPayload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// One named field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub payload: PartPayload,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: PartPayload::Text(value.into()),
            filename: None,
            content_type: None,
        }
    }

    /// A file part whose content type is inferred from the filename extension.
    pub fn file(name: impl Into<String>, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename);
        Self {
            name: name.into(),
            payload: PartPayload::Binary(bytes),
            filename: Some(filename),
            content_type: Some(content_type),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Content type by extension, `application/octet-stream` when unknown.
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// An ordered list of parts framed by one boundary token.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn with_random_boundary() -> Self {
        Self::new(random_boundary())
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn push(&mut self, part: Part) -> &mut Self {
        self.parts.push(part);
        self
    }

    /// Pushes a text part only when `value` is present.
    pub fn push_opt<V: ToString>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.parts.push(Part::text(name, value.to_string()));
        }
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Serializes every part in order.
    ///
    /// Fails when the boundary is empty, too long or needs quoting, when a name
    /// or filename would break the header line, or when the boundary occurs
    /// inside a payload.
    pub fn encode(&self) -> Result<Vec<u8>, AzureError> {
        validate_boundary(&self.boundary)?;
        let delimiter = format!("--{}", self.boundary);

        let mut body = Vec::with_capacity(
            self.parts
                .iter()
                .map(|part| part.payload.as_bytes().len() + 128)
                .sum::<usize>(),
        );

        for part in &self.parts {
            let payload = part.payload.as_bytes();
            if contains(payload, delimiter.as_bytes()) {
                return Err(AzureError::EncodingError(format!(
                    "boundary occurs inside part '{}'",
                    part.name
                )));
            }

            body.extend_from_slice(delimiter.as_bytes());
            body.extend_from_slice(CRLF);
            body.extend_from_slice(part_headers(part)?.as_bytes());
            body.extend_from_slice(CRLF);
            body.extend_from_slice(payload);
            body.extend_from_slice(CRLF);
        }

        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(b"--");
        body.extend_from_slice(CRLF);
        Ok(body)
    }
}

fn part_headers(part: &Part) -> Result<String, AzureError> {
    let mut headers = format!(
        "Content-Disposition: form-data; name=\"{}\"",
        header_value(&part.name)?
    );
    if let Some(filename) = &part.filename {
        headers.push_str(&format!("; filename=\"{}\"", header_value(filename)?));
    }
    headers.push_str("\r\n");
    if let Some(content_type) = &part.content_type {
        headers.push_str(&format!("Content-Type: {}\r\n", header_value(content_type)?));
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<&str, AzureError> {
    if value.contains(['"', '\r', '\n']) {
        Err(AzureError::EncodingError(format!(
            "invalid characters in multipart header value {value:?}"
        )))
    } else {
        Ok(value)
    }
}

fn validate_boundary(boundary: &str) -> Result<(), AzureError> {
    // Boundary characters that need no quoting in the Content-Type header
    const SPECIALS: &str = "'+-._";
    let valid = !boundary.is_empty()
        && boundary.len() <= MAX_BOUNDARY_LEN
        && boundary
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c));
    if valid {
        Ok(())
    } else {
        Err(AzureError::EncodingError(format!(
            "invalid multipart boundary {boundary:?}"
        )))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn random_boundary() -> String {
    format!("----azure-genai-{}", uuid::Uuid::new_v4().simple())
}

/// Requests sent as `multipart/form-data`.
pub trait MultipartRequest {
    /// Builds the form with a fixed part order.
    fn to_form(&self, boundary: &str) -> Result<MultipartForm, AzureError>;
}
