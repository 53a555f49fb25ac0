use crate::error::{Result, SplitterError};
use crate::sizer::{utf8, Sizer};
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

impl Sizer for CoreBPE {
    /// Count the number of tokens in the given text.
    fn size(&self, text: &[u8]) -> Result<usize> {
        Ok(self.encode_with_special_tokens(utf8(text)?).len())
    }
}

/// Byte-pair encodings bundled with `tiktoken-rs`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiktokenEncoding {
    #[default]
    Cl100kBase,
    O200kBase,
    P50kBase,
    P50kEdit,
    R50kBase,
}

impl TiktokenEncoding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cl100kBase => "cl100k_base",
            Self::O200kBase => "o200k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::R50kBase => "r50k_base",
        }
    }

    /// Build the encoder
    pub fn load(self) -> Result<CoreBPE> {
        let bpe = match self {
            Self::Cl100kBase => tiktoken_rs::cl100k_base(),
            Self::O200kBase => tiktoken_rs::o200k_base(),
            Self::P50kBase => tiktoken_rs::p50k_base(),
            Self::P50kEdit => tiktoken_rs::p50k_edit(),
            Self::R50kBase => tiktoken_rs::r50k_base(),
        };
        bpe.map_err(|e| {
            SplitterError::tokenizer_unavailable(format!("{} encoder: {e}", self.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_bpe_size() {
        let bpe = TiktokenEncoding::Cl100kBase.load().unwrap();
        let size = bpe.size(b"I can feel the magic, can you?").unwrap();
        assert_eq!(size, 9);
    }

    #[test]
    fn test_invalid_utf8_is_metric_failure() {
        let bpe = TiktokenEncoding::Cl100kBase.load().unwrap();
        assert!(matches!(
            bpe.size(&[0xc3, 0x28]),
            Err(SplitterError::MetricFailure(_))
        ));
    }

    #[test]
    fn test_encoding_names_round_trip_through_serde() {
        let json = serde_json::to_string(&TiktokenEncoding::O200kBase).unwrap();
        assert_eq!(json, "\"o200k_base\"");
        assert_eq!(TiktokenEncoding::default().as_str(), "cl100k_base");
    }
}
