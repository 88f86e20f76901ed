//! Configuration for preprocessing and retrieval.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! [retrieval]
//! top_k = 10
//!
//! [retrieval.weights]
//! code = 0.3
//! case = 0.5
//! log_pattern = 0.2
//!
//! [preprocess]
//! extra_framework_patterns = ["internal/vendored"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Channel;
use crate::error::{Result, TriageError};

/// Per-channel fusion weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelWeights {
    pub code: f64,
    pub case: f64,
    pub log_pattern: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            code: 0.3,
            case: 0.5,
            log_pattern: 0.2,
        }
    }
}

impl ChannelWeights {
    /// Same weight for every channel.
    pub fn uniform(weight: f64) -> Self {
        Self {
            code: weight,
            case: weight,
            log_pattern: weight,
        }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Code => self.code,
            Channel::Case => self.case,
            Channel::LogPattern => self.log_pattern,
        }
    }

    fn validate(&self) -> Result<()> {
        for channel in Channel::ALL {
            let w = self.get(channel);
            if !w.is_finite() || w < 0.0 {
                return Err(TriageError::InvalidConfig(format!(
                    "weight for channel {channel} must be finite and >= 0, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Which channels participate in a hybrid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelToggles {
    pub code: bool,
    pub case: bool,
    pub log_pattern: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            code: true,
            case: true,
            log_pattern: true,
        }
    }
}

impl ChannelToggles {
    pub fn none() -> Self {
        Self {
            code: false,
            case: false,
            log_pattern: false,
        }
    }

    pub fn only(channel: Channel) -> Self {
        Self::none().with(channel, true)
    }

    pub fn with(mut self, channel: Channel, enabled: bool) -> Self {
        match channel {
            Channel::Code => self.code = enabled,
            Channel::Case => self.case = enabled,
            Channel::LogPattern => self.log_pattern = enabled,
        }
        self
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Code => self.code,
            Channel::Case => self.case,
            Channel::LogPattern => self.log_pattern,
        }
    }

    /// Enabled channels in enumeration order.
    pub fn enabled(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// Hybrid retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results per channel and after fusion.
    pub top_k: usize,
    pub weights: ChannelWeights,
    pub channels: ChannelToggles,
    /// Leading characters of the stack trace appended to the code-channel query.
    pub code_stack_chars: usize,
    /// Leading content characters used as the deduplication key.
    pub dedup_prefix_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            weights: ChannelWeights::default(),
            channels: ChannelToggles::default(),
            code_stack_chars: 500,
            dedup_prefix_chars: 100,
        }
    }
}

/// Signal-extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Extra case-insensitive regexes marking a frame's file path as framework code.
    pub extra_framework_patterns: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub retrieval: RetrievalConfig,
    pub preprocess: PreprocessConfig,
}

impl TriageConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TriageConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(TriageError::InvalidConfig(
                "retrieval.top_k must be > 0".to_string(),
            ));
        }
        if self.retrieval.dedup_prefix_chars == 0 {
            return Err(TriageError::InvalidConfig(
                "retrieval.dedup_prefix_chars must be > 0".to_string(),
            ));
        }
        self.retrieval.weights.validate()?;
        for pattern in &self.preprocess.extra_framework_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                TriageError::InvalidConfig(format!("framework pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }
}
