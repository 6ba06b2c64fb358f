use erd_core::error::AppError;

/// Text-completion backend. Implementations return the raw model output.
pub trait Llm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}

pub mod ollama_llm;
