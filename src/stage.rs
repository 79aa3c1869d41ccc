use serde::Serialize;
use std::fmt;

/// One step of the message pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    /// Skipped when the message carries no image.
    UploadImage,
    BuildRequest,
    CallCompletion,
    DecodeResponse,
}

impl Stage {
    /// All stages in the order they run.
    pub const ALL: [Stage; 5] = [
        Stage::Validate,
        Stage::UploadImage,
        Stage::BuildRequest,
        Stage::CallCompletion,
        Stage::DecodeResponse,
    ];

    /// Name used in logs, events and failure context.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::UploadImage => "upload_image",
            Stage::BuildRequest => "build_request",
            Stage::CallCompletion => "call_completion",
            Stage::DecodeResponse => "decode_response",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
