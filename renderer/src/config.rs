//! Renderer configuration

use output::OutputConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RendererError, Result};

/// Top-level configuration for a [`Renderer`](crate::Renderer)
///
/// # Example
///
/// ```rust
/// use media_renderer::RendererConfig;
///
/// let config = RendererConfig::from_json(r#"{
///     "output": "null",
///     "mime_filter": "audio,-audio/x-aiff",
///     "output_config": { "initial_volume_db": -6.0 }
/// }"#).unwrap();
///
/// assert_eq!(config.output.as_deref(), Some("null"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Output backend name; `None` selects the default
    pub output: Option<String>,

    /// Comma separated MIME filter applied to the advertised types
    pub mime_filter: Option<String>,

    /// Options passed to the output backend
    pub output_config: OutputConfig,
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.output {
            if name.trim().is_empty() {
                return Err(RendererError::Config(
                    "output name must not be empty".to_string(),
                ));
            }
        }
        self.output_config.validate()?;
        Ok(())
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output = Some(name.into());
        self
    }

    pub fn with_mime_filter(mut self, filter: impl Into<String>) -> Self {
        self.mime_filter = Some(filter.into());
        self
    }

    pub fn with_output_config(mut self, output_config: OutputConfig) -> Self {
        self.output_config = output_config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            RendererConfig::from_json("{}").unwrap(),
            RendererConfig::default()
        );
    }

    #[test]
    fn test_nested_output_config() {
        let config = RendererConfig::from_json(
            r#"{"output_config":{"buffer_duration":{"secs":1,"nanos":500000000},"audio_sink":"alsasink"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.output_config.buffer_duration,
            Duration::from_millis(1500)
        );
        assert_eq!(config.output_config.audio_sink.as_deref(), Some("alsasink"));
    }

    #[test]
    fn test_invalid_output_config_is_rejected() {
        let err = RendererConfig::from_json(
            r#"{"output_config":{"audio_sink":"alsasink","audio_pipe":"fakesink"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RendererError::Output(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RendererConfig::from_json("{output"),
            Err(RendererError::Json(_))
        ));
    }

    #[test]
    fn test_blank_output_name() {
        assert!(RendererConfig::new().with_output("  ").validate().is_err());
    }
}
