//! Configuration for media backends
//!
//! Mirrors the knobs a pipeline-based output exposes: sink selection,
//! buffering and the initial volume.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OutputError, Result};

/// Configuration handed to the selected backend at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Amount of media to buffer before playing; zero disables buffering
    /// Default: 0
    pub buffer_duration: Duration,

    /// Initial volume in decibels (0.0 = max, -6.0 = about half)
    /// Default: 0.0
    pub initial_volume_db: f64,

    /// Audio sink element (autoaudiosink, alsasink, ...)
    pub audio_sink: Option<String>,

    /// Device for the audio sink
    pub audio_device: Option<String>,

    /// Audio sink pipeline description, as an alternative to `audio_sink`
    pub audio_pipe: Option<String>,

    /// Video sink element
    pub video_sink: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            buffer_duration: Duration::ZERO,
            initial_volume_db: 0.0,
            audio_sink: None,
            audio_device: None,
            audio_pipe: None,
            video_sink: None,
        }
    }
}

impl OutputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.audio_sink.is_some() && self.audio_pipe.is_some() {
            return Err(OutputError::Config(
                "audio_sink and audio_pipe are mutually exclusive".to_string(),
            ));
        }

        if !self.initial_volume_db.is_finite() {
            return Err(OutputError::Config(
                "initial_volume_db must be a finite number".to_string(),
            ));
        }

        Ok(())
    }

    pub fn buffering_enabled(&self) -> bool {
        self.buffer_duration > Duration::ZERO
    }

    /// Volume fraction to apply at startup, if the configuration lowers it
    pub fn initial_volume(&self) -> Option<f32> {
        (self.initial_volume_db < 0.0).then(|| 10f64.powf(self.initial_volume_db / 20.0) as f32)
    }

    // Builder methods

    pub fn with_buffer_duration(mut self, duration: Duration) -> Self {
        self.buffer_duration = duration;
        self
    }

    pub fn with_initial_volume_db(mut self, db: f64) -> Self {
        self.initial_volume_db = db;
        self
    }

    pub fn with_audio_sink(mut self, sink: impl Into<String>, device: Option<String>) -> Self {
        self.audio_sink = Some(sink.into());
        self.audio_device = device;
        self
    }

    pub fn with_audio_pipe(mut self, pipe: impl Into<String>) -> Self {
        self.audio_pipe = Some(pipe.into());
        self
    }

    pub fn with_video_sink(mut self, sink: impl Into<String>) -> Self {
        self.video_sink = Some(sink.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();
        assert!(!config.buffering_enabled());
        assert_eq!(config.initial_volume(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_and_pipe_are_exclusive() {
        let config = OutputConfig::new()
            .with_audio_sink("alsasink", Some("hw:0".to_string()))
            .with_audio_pipe("audioconvert ! alsasink");
        assert!(matches!(config.validate(), Err(OutputError::Config(_))));
    }

    #[test]
    fn test_initial_volume_from_db() {
        let config = OutputConfig::new().with_initial_volume_db(-20.0);
        let volume = config.initial_volume().unwrap();
        assert!((volume - 0.1).abs() < 1e-6);

        let config = OutputConfig::new().with_initial_volume_db(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: OutputConfig =
            serde_json::from_str(r#"{"buffer_duration":{"secs":2,"nanos":0}}"#).unwrap();
        assert!(config.buffering_enabled());
        assert_eq!(config.initial_volume_db, 0.0);
    }
}
