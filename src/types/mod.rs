mod ollama;

pub use ollama::{Message, OllamaRequest, OllamaResponse};
