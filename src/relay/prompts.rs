//! Fixed prompts and user-facing texts

/// System prompt for stateless text replies
pub const TEXT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Keep your responses concise and clear.";

/// System prompt for image analysis
pub const IMAGE_SYSTEM_PROMPT: &str = "You are a helpful assistant analyzing images. \
First describe what's in the image, including any text content. \
Then respond to any questions or requests found in the image text.";

/// Default user instruction sent alongside an image
pub const DEFAULT_IMAGE_INSTRUCTION: &str = "Please analyze this image and describe what you see in detail. \
If there's any text in the image, include it in your response. \
If there are any questions or requests in the image, please respond to them.";

/// System prompt for stateless replies to transcribed audio
pub const AUDIO_SYSTEM_PROMPT: &str =
    "You are a helpful assistant responding to transcribed audio. Keep your responses concise and clear.";

/// Replaces an empty model answer
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a proper response.";

/// Generic failure reply for text events
pub const TEXT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

/// Generic failure reply for image events
pub const IMAGE_ERROR_REPLY: &str = "Sorry, I encountered an error processing your image.";

/// Generic failure reply for audio events
pub const AUDIO_ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your audio. Please try again later.";

/// Maximum characters of error detail appended to a failure reply
pub const ERROR_DETAIL_CHARS: usize = 100;

/// User prompt for a stateless reply to a transcription
#[must_use]
pub fn audio_user_prompt(transcription: &str) -> String {
    format!("This is a transcription of audio: {transcription}\n\nPlease respond to this.")
}

/// Thread message carrying a transcription
#[must_use]
pub fn audio_thread_message(transcription: &str) -> String {
    format!(
        "This is a transcription of an audio message I sent: '{transcription}'. Please respond to what I said."
    )
}

/// Thread message carrying an image description
#[must_use]
pub fn image_thread_message(description: &str) -> String {
    format!(
        "I've sent you an image. Here is a description of what it shows:\n\n{description}\n\nPlease respond to it."
    )
}

/// Final reply for an audio event
#[must_use]
pub fn audio_reply(transcription: &str, response: &str) -> String {
    format!("📝 Transcription: {transcription}\n\n✨ Response: {response}")
}
