use crate::error::{Result, SplitterError};
use crate::sizer::{SizeMetric, TiktokenEncoding};
use crate::splitter::DEFAULT_MAX_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for splitting behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitterConfig {
    /// Maximum chunk size under `metric` (hard limit except for unsplittable leaves)
    pub max_size: usize,

    /// How chunk size is measured
    pub metric: MetricConfig,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            metric: MetricConfig::Chars,
        }
    }
}

impl SplitterConfig {
    /// Create config sized for embedding models (512 cl100k tokens)
    pub fn for_embeddings() -> Self {
        Self {
            max_size: 512,
            metric: MetricConfig::Tiktoken {
                encoding: TiktokenEncoding::Cl100kBase,
            },
        }
    }

    /// Create config sized for LLM context windows (2048 cl100k tokens)
    pub fn for_llm_context() -> Self {
        Self {
            max_size: 2048,
            metric: MetricConfig::Tiktoken {
                encoding: TiktokenEncoding::Cl100kBase,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(SplitterError::invalid_config("max_size must be > 0"));
        }

        if let MetricConfig::Huggingface { tokenizer_path } = &self.metric {
            if tokenizer_path.as_os_str().is_empty() {
                return Err(SplitterError::invalid_config(
                    "huggingface metric requires a tokenizer_path",
                ));
            }
        }

        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SplitterError::invalid_config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| SplitterError::invalid_config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON or TOML file
    ///
    /// JSON is tried first; anything that is not JSON is parsed as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let config = match serde_json::from_str::<Self>(&text) {
            Ok(config) => config,
            Err(json_err) => toml::from_str::<Self>(&text).map_err(|toml_err| {
                SplitterError::invalid_config(format!(
                    "{} is not valid JSON ({json_err}) or TOML ({toml_err})",
                    path.display()
                ))
            })?,
        };
        config.validate()?;

        log::debug!("Loaded splitter config from {}", path.display());
        Ok(config)
    }
}

/// Serializable choice of size metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricConfig {
    /// Unicode scalar values
    Chars,

    /// Whitespace-delimited words
    Words,

    /// Byte-pair encoded tokens
    Tiktoken {
        #[serde(default)]
        encoding: TiktokenEncoding,
    },

    /// Pretrained tokenizer loaded from a local `tokenizer.json`
    Huggingface { tokenizer_path: PathBuf },
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self::Chars
    }
}

impl MetricConfig {
    /// Build the runtime metric, loading encoders and tokenizers as needed
    pub fn build(&self) -> Result<SizeMetric> {
        match self {
            Self::Chars => Ok(SizeMetric::CharCount),
            Self::Words => Ok(SizeMetric::WordCount),
            Self::Tiktoken { encoding } => SizeMetric::tiktoken(*encoding),
            Self::Huggingface { tokenizer_path } => {
                SizeMetric::huggingface_from_file(tokenizer_path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizer::huggingface::tests::{tokenizer_file, WORD_LEVEL_TOKENIZER};
    use crate::sizer::Sizer;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        let config = SplitterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_size, 512);
        assert_eq!(config.metric, MetricConfig::Chars);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(SplitterConfig::for_embeddings().validate().is_ok());
        assert!(SplitterConfig::for_llm_context().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SplitterConfig {
            max_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SplitterError::InvalidConfig(_))
        ));

        config.max_size = 64;
        config.metric = MetricConfig::Huggingface {
            tokenizer_path: PathBuf::new(),
        };
        assert!(config.validate().is_err());

        config.metric = MetricConfig::Words;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = SplitterConfig::from_toml_str(
            r#"
max_size = 128

[metric]
kind = "tiktoken"
encoding = "o200k_base"
"#,
        )
        .unwrap();

        assert_eq!(
            config,
            SplitterConfig {
                max_size: 128,
                metric: MetricConfig::Tiktoken {
                    encoding: TiktokenEncoding::O200kBase,
                },
            }
        );
    }

    #[test]
    fn test_from_json_str_defaults() {
        let config = SplitterConfig::from_json_str(r#"{ "metric": { "kind": "words" } }"#).unwrap();
        assert_eq!(config.max_size, 512);
        assert_eq!(config.metric, MetricConfig::Words);

        let config =
            SplitterConfig::from_json_str(r#"{ "metric": { "kind": "tiktoken" } }"#).unwrap();
        assert_eq!(
            config.metric,
            MetricConfig::Tiktoken {
                encoding: TiktokenEncoding::Cl100kBase
            }
        );
    }

    #[test]
    fn test_rejects_unknown_fields_and_zero_size() {
        assert!(SplitterConfig::from_json_str(r#"{ "max_tokens": 10 }"#).is_err());
        assert!(matches!(
            SplitterConfig::from_toml_str("max_size = 0"),
            Err(SplitterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_file_json_and_toml() {
        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, r#"{{ "max_size": 64, "metric": {{ "kind": "words" }} }}"#).unwrap();
        let config = SplitterConfig::from_file(json.path()).unwrap();
        assert_eq!(config.max_size, 64);
        assert_eq!(config.metric, MetricConfig::Words);

        let mut toml = tempfile::NamedTempFile::new().unwrap();
        writeln!(toml, "max_size = 32").unwrap();
        writeln!(toml, "[metric]").unwrap();
        writeln!(toml, "kind = \"chars\"").unwrap();
        let config = SplitterConfig::from_file(toml.path()).unwrap();
        assert_eq!(config.max_size, 32);

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        writeln!(garbage, "max_size: [").unwrap();
        assert!(matches!(
            SplitterConfig::from_file(garbage.path()),
            Err(SplitterError::InvalidConfig(_))
        ));

        assert!(matches!(
            SplitterConfig::from_file("/nonexistent/splitter.toml"),
            Err(SplitterError::IoError(_))
        ));
    }

    #[test]
    fn test_metric_build() {
        assert_eq!(MetricConfig::Chars.build().unwrap().name(), "chars");
        assert_eq!(MetricConfig::Words.build().unwrap().name(), "words");

        let bpe = MetricConfig::Tiktoken {
            encoding: TiktokenEncoding::Cl100kBase,
        }
        .build()
        .unwrap();
        assert_eq!(bpe.size(b"I can feel the magic, can you?").unwrap(), 9);

        let file = tokenizer_file(WORD_LEVEL_TOKENIZER);
        let tokenizer = MetricConfig::Huggingface {
            tokenizer_path: file.path().to_path_buf(),
        }
        .build()
        .unwrap();
        assert_eq!(tokenizer.size(b"fn main() {}").unwrap(), 4);

        let missing = MetricConfig::Huggingface {
            tokenizer_path: PathBuf::from("/nonexistent/tokenizer.json"),
        };
        assert!(matches!(
            missing.build(),
            Err(SplitterError::TokenizerUnavailable(_))
        ));
    }
}
