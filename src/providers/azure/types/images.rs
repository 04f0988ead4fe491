use super::shared::FileUpload;
use crate::core::AzureError;
use crate::multipart::{MultipartForm, MultipartRequest, Part};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    S256,
    #[serde(rename = "512x512")]
    S512,
    #[serde(rename = "1024x1024")]
    S1024,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "256x256",
            Self::S512 => "512x512",
            Self::S1024 => "1024x1024",
            Self::Landscape => "1792x1024",
            Self::Portrait => "1024x1792",
        }
    }
}

impl std::str::FromStr for ImageSize {
    type Err = AzureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::S256,
            Self::S512,
            Self::S1024,
            Self::Landscape,
            Self::Portrait,
        ]
        .into_iter()
        .find(|size| size.as_str() == s)
        .ok_or_else(|| AzureError::ConfigError(format!("unsupported image size: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageQuality {
    Standard,
    Hd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    Vivid,
    Natural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageResponseFormat {
    Url,
    B64Json,
}

impl ImageResponseFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::B64Json => "b64_json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<ImageQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ImageStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ImageResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            n: None,
            size: None,
            quality: None,
            style: None,
            response_format: None,
            user: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEditRequest {
    pub image: FileUpload,
    pub prompt: String,
    pub mask: Option<FileUpload>,
    pub n: Option<u32>,
    pub size: Option<ImageSize>,
    pub response_format: Option<ImageResponseFormat>,
    pub user: Option<String>,
}

impl ImageEditRequest {
    pub fn new(image: FileUpload, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            mask: None,
            n: None,
            size: None,
            response_format: None,
            user: None,
        }
    }
}

impl MultipartRequest for ImageEditRequest {
    fn to_form(&self, boundary: &str) -> Result<MultipartForm, AzureError> {
        let mut form = MultipartForm::new(boundary);
        form.push(Part::file(
            "image",
            &self.image.filename,
            self.image.bytes.clone(),
        ))
        .push(Part::text("prompt", self.prompt.as_str()));
        if let Some(mask) = &self.mask {
            form.push(Part::file("mask", &mask.filename, mask.bytes.clone()));
        }
        form.push_opt("n", self.n)
            .push_opt("size", self.size.map(ImageSize::as_str))
            .push_opt("response_format", self.response_format.map(ImageResponseFormat::as_str))
            .push_opt("user", self.user.as_deref());
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVariationRequest {
    pub image: FileUpload,
    pub n: Option<u32>,
    pub size: Option<ImageSize>,
    pub response_format: Option<ImageResponseFormat>,
    pub user: Option<String>,
}

impl ImageVariationRequest {
    pub fn new(image: FileUpload) -> Self {
        Self {
            image,
            n: None,
            size: None,
            response_format: None,
            user: None,
        }
    }
}

impl MultipartRequest for ImageVariationRequest {
    fn to_form(&self, boundary: &str) -> Result<MultipartForm, AzureError> {
        let mut form = MultipartForm::new(boundary);
        form.push(Part::file(
            "image",
            &self.image.filename,
            self.image.bytes.clone(),
        ))
        .push_opt("n", self.n)
        .push_opt("size", self.size.map(ImageSize::as_str))
        .push_opt("response_format", self.response_format.map(ImageResponseFormat::as_str))
        .push_opt("user", self.user.as_deref());
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesResponse {
    pub created: u64,
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn part_names(form: &MultipartForm) -> Vec<&str> {
        form.parts().iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_generation_wire_shape() {
        let request = ImageGenerationRequest {
            size: Some(ImageSize::S1024),
            response_format: Some(ImageResponseFormat::B64Json),
            ..ImageGenerationRequest::new("a lighthouse")
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"prompt": "a lighthouse", "size": "1024x1024", "response_format": "b64_json"})
        );
    }

    #[test]
    fn test_edit_part_order_with_mask() {
        let request = ImageEditRequest {
            mask: Some(FileUpload::new("mask.png", vec![0])),
            n: Some(2),
            size: Some(ImageSize::S512),
            ..ImageEditRequest::new(FileUpload::new("scene.png", vec![1]), "add a moon")
        };
        let form = request.to_form("bnd").unwrap();
        assert_eq!(part_names(&form), ["image", "prompt", "mask", "n", "size"]);
    }

    #[test]
    fn test_variation_part_order() {
        let request = ImageVariationRequest {
            response_format: Some(ImageResponseFormat::Url),
            user: Some("u1".to_string()),
            ..ImageVariationRequest::new(FileUpload::new("scene.png", vec![1]))
        };
        let form = request.to_form("bnd").unwrap();
        assert_eq!(part_names(&form), ["image", "response_format", "user"]);
    }

    #[test]
    fn test_size_parsing() {
        assert_eq!("512x512".parse::<ImageSize>().unwrap(), ImageSize::S512);
        assert!("3x3".parse::<ImageSize>().is_err());
    }
}
