use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw message as submitted by a user.
///
/// Over JSON, `image_data` is a base64 string. Image bytes and filename
/// are either both present or both absent; the validator enforces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, rename = "image_data", with = "base64_bytes")]
    pub image_bytes: Option<Vec<u8>>,

    #[serde(default, rename = "image_filename")]
    pub image_filename: Option<String>,

    /// Token forwarded to the completion service.
    #[serde(default, rename = "token")]
    pub auth_token: Option<String>,

    /// Model forwarded to the completion service.
    #[serde(default, rename = "model")]
    pub model_name: Option<String>,

    /// Example of the structured output the caller expects.
    #[serde(default, rename = "output_example")]
    pub output_example_schema: Option<Map<String, Value>>,
}

impl InboundMessage {
    /// Text-only message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Attach image bytes and their original filename.
    pub fn with_image(mut self, bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        self.image_bytes = Some(bytes.into());
        self.image_filename = Some(filename.into());
        self
    }
}

/// Image bytes that passed validation.
///
/// Only the validator builds these; the upload stage consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub(crate) bytes: Vec<u8>,
    pub(crate) filename: String,
}

impl ImagePayload {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// A message that passed validation. `text` is never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMessage {
    pub(crate) text: String,
    pub(crate) image: Option<ImagePayload>,
    pub(crate) output_example: String,
}

impl ValidatedMessage {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    /// Empty when the caller supplied no example.
    pub fn output_example(&self) -> &str {
        &self.output_example
    }
}

/// A validated message whose image (if any) has been replaced by a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedMessage {
    pub text: String,
    pub image_url: Option<String>,
    pub output_example: String,
}

/// Body sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub text: String,
    pub token: String,
    pub model: String,
    pub image_url: Option<String>,
    pub output_example: Option<String>,
}

/// Serde adapter for `Option<Vec<u8>>` carried as a base64 string.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|s| STANDARD.decode(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_from_json_text_only() {
        let msg: InboundMessage = serde_json::from_value(json!({"text": "Hello World!"})).unwrap();
        assert_eq!(msg.text.as_deref(), Some("Hello World!"));
        assert!(msg.image_bytes.is_none());
        assert!(msg.image_filename.is_none());
        assert!(msg.output_example_schema.is_none());
    }

    #[test]
    fn test_inbound_image_data_is_base64() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "text": "look",
            "image_data": "iVBORw==",
            "image_filename": "a.png",
            "token": "t",
            "model": "m",
            "output_example": {"total": 0}
        }))
        .unwrap();
        assert_eq!(msg.image_bytes, Some(vec![0x89, 0x50, 0x4E, 0x47]));
        assert_eq!(msg.image_filename.as_deref(), Some("a.png"));
        assert_eq!(msg.auth_token.as_deref(), Some("t"));
        assert_eq!(msg.model_name.as_deref(), Some("m"));
        assert_eq!(msg.output_example_schema.unwrap()["total"], 0);
    }

    #[test]
    fn test_inbound_rejects_bad_base64() {
        let result = serde_json::from_value::<InboundMessage>(json!({
            "text": "x",
            "image_data": "%%%not base64%%%"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_completion_request_wire_names() {
        let req = CompletionRequest {
            text: "hi".into(),
            token: "tok".into(),
            model: "gpt".into(),
            image_url: None,
            output_example: None,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["text"], "hi");
        assert!(body["image_url"].is_null());
        assert!(body["output_example"].is_null());
        assert!(body.get("image_url").is_some());
    }
}
