pub mod llm;
pub mod ollama;
pub mod prompts;
pub mod renderer;
pub mod settings;
