//! Engine configuration.
//!
//! Settings are fixed when the engine is built; the voice pool, bus
//! buffers and event queue are all sized from them up front.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sample interpolation used by every voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Two-point linear interpolation.
    Linear,
    /// Four-point cubic interpolation.
    #[default]
    Cubic,
}

/// Synthesizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Fixed size of the voice pool.
    pub voice_count: usize,
    /// Largest block the render thread may request.
    pub max_frames: usize,
    /// Control events that can be pending between two render blocks.
    pub event_queue_capacity: usize,
    pub interpolation: Interpolation,
    /// Linear gain applied to every bus after mixing.
    pub master_gain: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            voice_count: 32,
            max_frames: 512,
            event_queue_capacity: 1024,
            interpolation: Interpolation::Cubic,
            master_gain: 1.0,
        }
    }
}

impl SynthConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a field has the wrong type
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Loads a configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            .map(Self::sanitized)
    }

    /// Replaces values the engine cannot run with by usable ones.
    pub fn sanitized(mut self) -> Self {
        self.sample_rate = self.sample_rate.clamp(8_000, 192_000);
        self.voice_count = self.voice_count.clamp(1, 256);
        self.max_frames = self.max_frames.clamp(16, 8192);
        self.event_queue_capacity = self.event_queue_capacity.max(16);
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            self.master_gain = 1.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SynthConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.voice_count, 32);
        assert_eq!(config.max_frames, 512);
        assert_eq!(config.interpolation, Interpolation::Cubic);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SynthConfig::from_json(r#"{ "voice_count": 8, "interpolation": "linear" }"#).unwrap();
        assert_eq!(config.voice_count, 8);
        assert_eq!(config.interpolation, Interpolation::Linear);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.master_gain, 1.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SynthConfig {
            sample_rate: 48_000,
            master_gain: 0.5,
            ..SynthConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(SynthConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(SynthConfig::from_json(r#"{ "voice_count": "many" }"#).is_err());
    }

    #[test]
    fn test_sanitized() {
        let config = SynthConfig {
            voice_count: 0,
            max_frames: 1,
            master_gain: f32::NAN,
            ..SynthConfig::default()
        }
        .sanitized();
        assert_eq!(config.voice_count, 1);
        assert_eq!(config.max_frames, 16);
        assert_eq!(config.master_gain, 1.0);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(SynthConfig::load("/nonexistent/config.json").is_err());
    }
}
