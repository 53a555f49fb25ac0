use crate::error::{Result, SplitterError};
use crate::sizer::{utf8, Sizer};
use std::path::Path;
use tokenizers::Tokenizer;

impl Sizer for Tokenizer {
    /// Count the number of tokens in the given text, without special tokens.
    fn size(&self, text: &[u8]) -> Result<usize> {
        let encoding = self
            .encode(utf8(text)?, false)
            .map_err(|e| SplitterError::metric(format!("Tokenizer encode failed: {e}")))?;
        Ok(encoding.get_ids().len())
    }
}

/// Load a pretrained tokenizer from a local `tokenizer.json`
pub fn load_tokenizer(path: impl AsRef<Path>) -> Result<Tokenizer> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SplitterError::tokenizer_unavailable(format!(
            "tokenizer file {} does not exist",
            path.display()
        )));
    }

    Tokenizer::from_file(path).map_err(|e| {
        SplitterError::tokenizer_unavailable(format!(
            "Tokenizer load failed for {}: {e}",
            path.display()
        ))
    })
}
