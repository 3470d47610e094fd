//! Essay translation via the Gemini API.
//!
//! [`GeminiClient`] performs a single translation request and classifies
//! failures into the shared error model: quota exhaustion and overload become
//! [`EssayBridgeError::RateLimited`](essaybridge_shared::EssayBridgeError::RateLimited),
//! transport problems become `Network`, everything else is a permanent `Api` error.

pub mod gemini;
pub mod prompt;

pub use gemini::{GeminiClient, GeminiSettings};
pub use prompt::build_prompt;
