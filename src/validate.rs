//! Request validation.
//!
//! [`validate`] turns a raw [`InboundMessage`] into a [`ValidatedMessage`]
//! or the first [`Failure`] found. Pure: no I/O, no logging side effects
//! beyond a debug trace.

use crate::error::{Failure, Outcome};
use crate::types::{ImagePayload, InboundMessage, ValidatedMessage};

/// Filename suffixes accepted for images (compared lower-cased).
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Validate and normalize an inbound message.
///
/// Checks run in order and the first failure wins:
/// 1. message present
/// 2. non-blank text
/// 3. image bytes and filename supplied together
/// 4. supported extension
/// 5. non-empty image bytes
pub fn validate(message: Option<InboundMessage>) -> Outcome<ValidatedMessage> {
    let message = message.ok_or_else(|| Failure::validation("Request is null"))?;

    let text = check_text(message.text.as_deref())?;
    let image = check_image(message.image_bytes, message.image_filename)?;
    let output_example = output_example_text(message.output_example_schema.as_ref());

    tracing::debug!(
        text_len = text.len(),
        has_image = image.is_some(),
        "message validated"
    );

    Ok(ValidatedMessage {
        text,
        image,
        output_example,
    })
}

fn check_text(text: Option<&str>) -> Outcome<String> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(Failure::validation("Text is required")),
    }
}

fn check_image(bytes: Option<Vec<u8>>, filename: Option<String>) -> Outcome<Option<ImagePayload>> {
    let (bytes, filename) = match (bytes, filename) {
        (None, None) => return Ok(None),
        (Some(bytes), Some(filename)) => (bytes, filename),
        _ => {
            return Err(Failure::validation(
                "Both imageData and imageFilename must be provided together or both null",
            ))
        }
    };

    if !has_supported_extension(&filename) {
        return Err(
            Failure::invalid_file_type("Only PNG, JPG and JPEG files are supported")
                .with("filename", filename),
        );
    }

    if bytes.is_empty() {
        return Err(Failure::validation("Image data cannot be empty"));
    }

    Ok(Some(ImagePayload { bytes, filename }))
}

/// Whether `filename` ends in `.png`, `.jpg` or `.jpeg`, ignoring case.
pub fn has_supported_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn output_example_text(schema: Option<&serde_json::Map<String, serde_json::Value>>) -> String {
    match schema {
        Some(map) if !map.is_empty() => serde_json::Value::Object(map.clone()).to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn kind_of(result: Outcome<ValidatedMessage>) -> ErrorKind {
        result.expect_err("expected a failure").kind
    }

    #[test]
    fn test_missing_message() {
        let err = validate(None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Request is null");
    }

    #[test]
    fn test_text_required() {
        for text in [None, Some(""), Some("   "), Some("\n\t")] {
            let msg = InboundMessage {
                text: text.map(String::from),
                ..Default::default()
            };
            let err = validate(Some(msg)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
            assert_eq!(err.message, "Text is required");
        }
    }

    #[test]
    fn test_text_is_trimmed() {
        let v = validate(Some(InboundMessage::text("  hello  "))).unwrap();
        assert_eq!(v.text(), "hello");
        assert!(v.image().is_none());
        assert_eq!(v.output_example(), "");
    }

    #[test]
    fn test_text_checked_before_image() {
        let msg = InboundMessage {
            text: None,
            ..Default::default()
        }
        .with_image(vec![1], "doc.pdf");
        let err = validate(Some(msg)).unwrap_err();
        assert_eq!(err.message, "Text is required");
    }

    #[test]
    fn test_bytes_without_filename() {
        let msg = InboundMessage {
            image_bytes: Some(vec![1, 2, 3]),
            ..InboundMessage::text("hi")
        };
        let err = validate(Some(msg)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.starts_with("Both imageData and imageFilename"));
    }

    #[test]
    fn test_filename_without_bytes() {
        let msg = InboundMessage {
            image_filename: Some("a.png".into()),
            ..InboundMessage::text("hi")
        };
        assert_eq!(kind_of(validate(Some(msg))), ErrorKind::Validation);
    }

    #[test]
    fn test_unsupported_extensions() {
        for name in ["document.pdf", "image.gif", "png", "photo.jpg.exe", "noext"] {
            let msg = InboundMessage::text("hi").with_image(vec![1], name);
            let err = validate(Some(msg)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidFileType, "{name}");
            assert_eq!(err.message, "Only PNG, JPG and JPEG files are supported");
        }
    }

    #[test]
    fn test_supported_extensions_any_case() {
        for name in ["a.png", "B.PNG", "c.jpg", "d.JpG", "e.jpeg", "f.JPEG"] {
            let msg = InboundMessage::text("hi").with_image(vec![1], name);
            let v = validate(Some(msg)).unwrap();
            assert_eq!(v.image().unwrap().filename(), name);
        }
    }

    #[test]
    fn test_extension_checked_before_emptiness() {
        let msg = InboundMessage::text("hi").with_image(Vec::new(), "a.pdf");
        assert_eq!(kind_of(validate(Some(msg))), ErrorKind::InvalidFileType);
    }

    #[test]
    fn test_empty_image_bytes() {
        let msg = InboundMessage::text("hi").with_image(Vec::new(), "a.png");
        let err = validate(Some(msg)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Image data cannot be empty");
    }

    #[test]
    fn test_output_example_serialized() {
        let schema = json!({"amount": 12.5, "category": "food"});
        let msg = InboundMessage {
            output_example_schema: schema.as_object().cloned(),
            ..InboundMessage::text("coffee 5")
        };
        let v = validate(Some(msg)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(v.output_example()).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_empty_output_example_is_empty_string() {
        let msg = InboundMessage {
            output_example_schema: Some(serde_json::Map::new()),
            ..InboundMessage::text("x")
        };
        assert_eq!(validate(Some(msg)).unwrap().output_example(), "");
    }
}
