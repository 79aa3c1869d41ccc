//! Completion request assembly.

use crate::types::{CompletionRequest, MaterializedMessage};

/// Build the body sent to the completion service.
///
/// An empty output example is sent as `null`, never as `""`.
pub fn build_request(
    message: MaterializedMessage,
    token: impl Into<String>,
    model: impl Into<String>,
) -> CompletionRequest {
    let MaterializedMessage {
        text,
        image_url,
        output_example,
    } = message;

    CompletionRequest {
        text,
        token: token.into(),
        model: model.into(),
        image_url,
        output_example: Some(output_example).filter(|s| !s.is_empty()),
    }
}
