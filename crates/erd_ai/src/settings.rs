use std::path::Path;
use std::time::Duration;

use erd_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::llm::ollama_llm::OllamaLlm;
use crate::ollama::OllamaClient;
use crate::renderer::LlmLogRenderer;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub request_timeout_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        OllamaClient::new(&self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(AppError::new("CONFIG_INVALID", "model must not be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "request_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Probe the configured endpoint before offering generation to the user.
    pub fn health_check(&self) -> Result<(), AppError> {
        self.validate()?;
        OllamaClient::new(&self.base_url)?.health_check()
    }

    /// Renderer backed by the local Ollama endpoint these settings describe.
    pub fn ollama_renderer(&self) -> Result<LlmLogRenderer<OllamaLlm>, AppError> {
        self.validate()?;
        let client = OllamaClient::new(&self.base_url)?;
        Ok(LlmLogRenderer::new(
            OllamaLlm::new(client, self.request_timeout()),
            self.model.clone(),
        ))
    }
}

/// Read settings from a JSON file; a missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<GenerationSettings, AppError> {
    if !path.exists() {
        return Ok(GenerationSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new("CONFIG_READ_FAILED", "Failed to read generation settings")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let settings: GenerationSettings = serde_json::from_str(&text).map_err(|e| {
        AppError::new("CONFIG_INVALID", "Generation settings are not valid JSON")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use tempfile::tempdir;

    fn settings_for_port(port: u16) -> GenerationSettings {
        GenerationSettings {
            base_url: format!("http://127.0.0.1:{port}"),
            ..GenerationSettings::default()
        }
    }

    #[test]
    fn missing_file_gives_loopback_defaults() {
        let tmp = tempdir().unwrap();
        let s = load_settings(&tmp.path().join("absent.json")).expect("defaults");
        assert_eq!(s, GenerationSettings::default());
        assert_eq!(s.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn remote_base_url_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("ai.json");
        std::fs::write(&path, r#"{"base_url":"https://example.com"}"#).unwrap();
        assert_eq!(
            load_settings(&path).expect_err("remote").code,
            "AI_REMOTE_NOT_ALLOWED"
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("ai.json");
        std::fs::write(&path, r#"{"model":"mistral"}"#).unwrap();
        let s = load_settings(&path).expect("load");
        assert_eq!(s.model, "mistral");
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert!(s.ollama_renderer().is_ok());
    }

    #[test]
    fn health_check_accepts_a_responding_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}")
                .unwrap();
        });

        settings_for_port(port).health_check().expect("healthy");
        server.join().unwrap();
    }

    #[test]
    fn health_check_reports_unreachable_endpoint_as_retryable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = settings_for_port(port).health_check().expect_err("nothing listening");
        assert_eq!(err.code, "AI_OLLAMA_UNREACHABLE");
        assert!(err.retryable);
    }
}
