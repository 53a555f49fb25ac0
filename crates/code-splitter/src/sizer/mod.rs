//! Size metrics.
//!
//! A [`Sizer`] turns a byte slice into a size. Character and word counts are
//! built in; token counts come from a byte-pair encoder ([`tiktoken`]) or a
//! pretrained subword tokenizer ([`huggingface`]).

use crate::error::{Result, SplitterError};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub mod huggingface;
pub mod tiktoken;

pub use tiktoken::TiktokenEncoding;

/// Measures the size of a byte range
pub trait Sizer {
    fn size(&self, text: &[u8]) -> Result<usize>;

    /// True when the size of adjacent ranges adds up to the size of their
    /// concatenation, so a run can be measured with a running sum
    fn is_additive(&self) -> bool {
        false
    }
}

impl<S: Sizer + ?Sized> Sizer for &S {
    fn size(&self, text: &[u8]) -> Result<usize> {
        (**self).size(text)
    }

    fn is_additive(&self) -> bool {
        (**self).is_additive()
    }
}

impl<S: Sizer + ?Sized> Sizer for Box<S> {
    fn size(&self, text: &[u8]) -> Result<usize> {
        (**self).size(text)
    }

    fn is_additive(&self) -> bool {
        (**self).is_additive()
    }
}

impl<S: Sizer + ?Sized> Sizer for Arc<S> {
    fn size(&self, text: &[u8]) -> Result<usize> {
        (**self).size(text)
    }

    fn is_additive(&self) -> bool {
        (**self).is_additive()
    }
}

/// Counts Unicode scalar values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharCounter;

impl Sizer for CharCounter {
    fn size(&self, text: &[u8]) -> Result<usize> {
        Ok(lossy(text).chars().count())
    }

    /// Exact on character boundaries; a range splitting an invalid sequence
    /// can count one more replacement character than the joined range.
    fn is_additive(&self) -> bool {
        true
    }
}

/// Counts maximal runs of non-whitespace characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordCounter;

impl Sizer for WordCounter {
    fn size(&self, text: &[u8]) -> Result<usize> {
        Ok(lossy(text).split_whitespace().count())
    }
}

/// Runtime-selected size metric
#[derive(Clone)]
pub enum SizeMetric {
    CharCount,
    WordCount,
    TokenCount(Arc<dyn Sizer + Send + Sync>),
}

impl SizeMetric {
    /// Token count through any injected tokenizer
    pub fn tokens(sizer: impl Sizer + Send + Sync + 'static) -> Self {
        Self::TokenCount(Arc::new(sizer))
    }

    /// Token count with a bundled byte-pair encoding
    pub fn tiktoken(encoding: TiktokenEncoding) -> Result<Self> {
        Ok(Self::tokens(encoding.load()?))
    }

    /// Token count with a pretrained subword tokenizer
    pub fn huggingface(tokenizer: tokenizers::Tokenizer) -> Self {
        Self::tokens(tokenizer)
    }

    /// Token count with a tokenizer loaded from a `tokenizer.json` file
    pub fn huggingface_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::huggingface(huggingface::load_tokenizer(path)?))
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CharCount => "chars",
            Self::WordCount => "words",
            Self::TokenCount(_) => "tokens",
        }
    }
}

impl Sizer for SizeMetric {
    fn size(&self, text: &[u8]) -> Result<usize> {
        match self {
            Self::CharCount => CharCounter.size(text),
            Self::WordCount => WordCounter.size(text),
            Self::TokenCount(sizer) => sizer.size(text),
        }
    }

    fn is_additive(&self) -> bool {
        match self {
            Self::CharCount => true,
            Self::WordCount => false,
            Self::TokenCount(sizer) => sizer.is_additive(),
        }
    }
}

impl Default for SizeMetric {
    fn default() -> Self {
        Self::CharCount
    }
}

impl fmt::Debug for SizeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lossy(text: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(text)
}

/// Strict UTF-8 view for tokenizers, which cannot encode invalid sequences
pub(crate) fn utf8(text: &[u8]) -> Result<&str> {
    std::str::from_utf8(text)
        .map_err(|e| SplitterError::metric(format!("Cannot tokenize invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_count_uses_scalar_values() {
        assert_eq!(CharCounter.size("café".as_bytes()).unwrap(), 4);
        assert_eq!(CharCounter.size("😁".as_bytes()).unwrap(), 1);
        assert_eq!(CharCounter.size(b"").unwrap(), 0);
    }

    #[test]
    fn test_word_count() {
        let text = b"I can feel the magic, can you?";
        assert_eq!(WordCounter.size(text).unwrap(), 7);
        assert_eq!(WordCounter.size(b"  \n\t ").unwrap(), 0);
        assert_eq!(WordCounter.size(b"hello,\n\nworld!").unwrap(), 2);
    }

    #[test]
    fn test_counts_never_decrease_when_extending() {
        let text = "fn main() {\n    let café = \"naïve\";\n}\n".as_bytes();
        for metric in [SizeMetric::CharCount, SizeMetric::WordCount] {
            let mut previous = 0;
            for end in 0..=text.len() {
                if std::str::from_utf8(&text[..end]).is_err() {
                    continue;
                }
                let size = metric.size(&text[..end]).unwrap();
                assert!(size >= previous, "{metric:?} shrank at {end}");
                previous = size;
            }
        }
    }

    #[test]
    fn test_size_metric_dispatch() {
        let text = b"hello brave new world";
        assert_eq!(SizeMetric::CharCount.size(text).unwrap(), 21);
        assert_eq!(SizeMetric::WordCount.size(text).unwrap(), 4);
        assert_eq!(SizeMetric::tokens(WordCounter).size(text).unwrap(), 4);
        assert_eq!(SizeMetric::default().name(), "chars");
    }

    #[test]
    fn test_only_char_count_is_additive() {
        assert!(CharCounter.is_additive());
        assert!(!WordCounter.is_additive());
        assert!(SizeMetric::CharCount.is_additive());
        assert!(!SizeMetric::WordCount.is_additive());
        assert!(SizeMetric::tokens(CharCounter).is_additive());
        assert!(Arc::new(CharCounter).is_additive());

        // Joining "foo" and "bar" makes one word, not two.
        assert_eq!(WordCounter.size(b"foobar").unwrap(), 1);
        assert_eq!(
            WordCounter.size(b"foo").unwrap() + WordCounter.size(b"bar").unwrap(),
            2
        );
    }

    #[test]
    fn test_forwarding_impls() {
        let boxed: Box<dyn Sizer> = Box::new(CharCounter);
        assert_eq!(boxed.size(b"abc").unwrap(), 3);
        assert_eq!((&WordCounter).size(b"a b").unwrap(), 2);
        assert_eq!(Arc::new(CharCounter).size(b"ab").unwrap(), 2);
    }

    #[test]
    fn test_utf8_rejects_invalid_sequences() {
        assert!(utf8(b"ok").is_ok());
        assert!(matches!(
            utf8(&[0x66, 0xff, 0x6f]),
            Err(SplitterError::MetricFailure(_))
        ));
    }
}
