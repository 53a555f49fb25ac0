use crate::config::SplitterConfig;
use crate::error::{Result, SplitterError};
use crate::grammar::GrammarRegistry;
use crate::language::Language;
use crate::sizer::{CharCounter, SizeMetric, Sizer, TiktokenEncoding, WordCounter};
use crate::tree::{SyntaxNode, SyntaxTree};
use crate::types::{Chunk, LineIndex};
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

/// Default ceiling when none is configured
pub const DEFAULT_MAX_SIZE: usize = 512;

/// Splits documents into syntax-aligned chunks no larger than `max_size`
///
/// The splitter is stateless between calls; one instance can serve
/// concurrent `split` calls when its sizer is `Sync`.
#[derive(Debug, Clone)]
pub struct Splitter<S: Sizer> {
    sizer: S,
    max_size: usize,
    registry: Arc<GrammarRegistry>,
}

impl<S: Sizer> Splitter<S> {
    /// Create a splitter measuring chunks with `sizer`
    pub fn new(sizer: S) -> Self {
        Self {
            sizer,
            max_size: DEFAULT_MAX_SIZE,
            registry: GrammarRegistry::global(),
        }
    }

    /// Builder: set the size ceiling
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Builder: parse with a custom grammar registry
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<GrammarRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub const fn sizer(&self) -> &S {
        &self.sizer
    }

    #[must_use]
    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    /// Split `document` into chunks no larger than `max_size`
    ///
    /// The chunks partition the document: they are ordered, contiguous and
    /// their concatenation is `document`. A chunk exceeds the ceiling only
    /// when it is a single leaf (or inter-node gap) that cannot be split.
    pub fn split(&self, document: &[u8], language: Language) -> Result<Vec<Chunk>> {
        self.check_max_size()?;
        let grammar = self.registry.get(language)?;

        if document.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!(
            "Splitting {} bytes of {language} (max size {})",
            document.len(),
            self.max_size
        );
        let tree = grammar.parse(document)?;
        let chunks = self.split_tree(document, &tree)?;
        log::debug!("Split {language} document into {} chunks", chunks.len());

        Ok(chunks)
    }

    /// Split a document that has already been parsed into `tree`
    pub fn split_tree(&self, document: &[u8], tree: &SyntaxTree) -> Result<Vec<Chunk>> {
        self.check_max_size()?;
        if tree.source_len() != document.len() {
            return Err(SplitterError::invalid_argument(format!(
                "syntax tree covers {} bytes but the document has {}",
                tree.source_len(),
                document.len()
            )));
        }
        if document.is_empty() {
            return Ok(Vec::new());
        }

        let mut packer = Packer {
            sizer: &self.sizer,
            document,
            max_size: self.max_size,
            additive: self.sizer.is_additive(),
            lines: LineIndex::new(document),
            chunks: Vec::new(),
        };

        let root = tree.root();
        let size = packer.measure(root.byte_range())?;
        if size <= self.max_size {
            let mut run = Run::new(root.byte_range(), size);
            run.push(Segment::Node(root));
            packer.flush(run)?;
        } else {
            packer.pack(root, size)?;
        }

        Ok(packer.chunks)
    }

    fn check_max_size(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(SplitterError::invalid_argument("max_size must be > 0"));
        }
        Ok(())
    }
}

impl Splitter<CharCounter> {
    /// Splitter counting characters
    pub fn chars() -> Self {
        Self::new(CharCounter)
    }
}

impl Splitter<WordCounter> {
    /// Splitter counting whitespace-delimited words
    pub fn words() -> Self {
        Self::new(WordCounter)
    }
}

impl Splitter<tiktoken_rs::CoreBPE> {
    /// Splitter counting byte-pair encoded tokens
    pub fn tiktoken(encoding: TiktokenEncoding) -> Result<Self> {
        Ok(Self::new(encoding.load()?))
    }
}

impl Splitter<tokenizers::Tokenizer> {
    /// Splitter counting tokens of a pretrained tokenizer
    pub fn huggingface(tokenizer: tokenizers::Tokenizer) -> Self {
        Self::new(tokenizer)
    }
}

impl Splitter<SizeMetric> {
    /// Build a splitter from validated configuration
    pub fn from_config(config: &SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.metric.build()?).with_max_size(config.max_size))
    }
}

impl Default for Splitter<CharCounter> {
    fn default() -> Self {
        Self::chars()
    }
}

/// A node or an uncovered byte span between children
#[derive(Clone, Copy)]
enum Segment<'t> {
    Node(SyntaxNode<'t>),
    Gap(usize, usize),
}

impl Segment<'_> {
    fn range(self) -> Range<usize> {
        match self {
            Self::Node(node) => node.byte_range(),
            Self::Gap(start, end) => start..end,
        }
    }
}

/// Children of `node` interleaved with the gaps around them, skipping empty spans
fn segments(node: SyntaxNode<'_>) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.start();

    for child in node.children() {
        if child.start() > cursor {
            out.push(Segment::Gap(cursor, child.start()));
        }
        if !child.is_empty() {
            out.push(Segment::Node(child));
        }
        cursor = cursor.max(child.end());
    }
    if node.end() > cursor {
        out.push(Segment::Gap(cursor, node.end()));
    }

    out
}

/// Pending run of consecutive segments
struct Run {
    start: usize,
    end: usize,
    size: usize,
    /// Whether `size` is a running sum over more than one segment
    summed: bool,
    /// Kind and byte range of each node in the run
    members: Vec<(&'static str, Range<usize>)>,
}

impl Run {
    fn new(range: Range<usize>, size: usize) -> Self {
        Self {
            start: range.start,
            end: range.end,
            size,
            summed: false,
            members: Vec::new(),
        }
    }

    fn push(&mut self, segment: Segment<'_>) {
        if let Segment::Node(node) = segment {
            self.members.push((node.kind_name(), node.byte_range()));
        }
    }
}

/// A node whose segments are being packed
struct Frame<'t> {
    segments: Vec<Segment<'t>>,
    next: usize,
    run: Option<Run>,
}

impl<'t> Frame<'t> {
    fn new(node: SyntaxNode<'t>) -> Self {
        Self {
            segments: segments(node),
            next: 0,
            run: None,
        }
    }
}

/// State of one `split_tree` call
struct Packer<'a, S: ?Sized> {
    sizer: &'a S,
    document: &'a [u8],
    max_size: usize,
    additive: bool,
    lines: LineIndex,
    chunks: Vec<Chunk>,
}

impl<S: Sizer + ?Sized> Packer<'_, S> {
    fn measure(&self, range: Range<usize>) -> Result<usize> {
        self.sizer.size(&self.document[range])
    }

    /// Emit `node`, already measured at `size > max_size`, as chunks within the ceiling
    ///
    /// Oversized descendants are walked with an explicit stack of frames.
    fn pack(&mut self, node: SyntaxNode<'_>, size: usize) -> Result<()> {
        if node.is_leaf() {
            return self.emit_leaf(node, size);
        }

        let mut stack = vec![Frame::new(node)];

        while let Some(frame) = stack.last_mut() {
            let Some(&segment) = frame.segments.get(frame.next) else {
                if let Some(open) = frame.run.take() {
                    self.flush(open)?;
                }
                stack.pop();
                continue;
            };
            frame.next += 1;

            let range = segment.range();
            let mut alone = None;

            if let Some(open) = frame.run.as_mut() {
                let size = if self.additive {
                    let own = self.measure(range.clone())?;
                    alone = Some(own);
                    open.size + own
                } else {
                    self.measure(open.start..range.end)?
                };
                if size <= self.max_size {
                    open.end = range.end;
                    open.size = size;
                    open.summed |= self.additive;
                    open.push(segment);
                    continue;
                }
            }
            if let Some(full) = frame.run.take() {
                self.flush(full)?;
            }

            let size = match alone {
                Some(size) => size,
                None => self.measure(range.clone())?,
            };
            if size <= self.max_size {
                let mut fresh = Run::new(range, size);
                fresh.push(segment);
                frame.run = Some(fresh);
                continue;
            }

            match segment {
                Segment::Node(child) if child.is_leaf() => self.emit_leaf(child, size)?,
                Segment::Node(child) => {
                    log::trace!(
                        "Descending into `{}` at {}..{} ({size} > {})",
                        child.kind_name(),
                        child.start(),
                        child.end(),
                        self.max_size
                    );
                    stack.push(Frame::new(child));
                }
                Segment::Gap(start, end) => {
                    log::debug!("Oversized gap at {start}..{end} ({size} > {})", self.max_size);
                    self.flush(Run::new(range, size))?;
                }
            }
        }

        Ok(())
    }

    fn emit_leaf(&mut self, node: SyntaxNode<'_>, size: usize) -> Result<()> {
        log::debug!(
            "Oversized leaf `{}` at {}..{} ({size} > {})",
            node.kind_name(),
            node.start(),
            node.end(),
            self.max_size
        );
        let mut run = Run::new(node.byte_range(), size);
        run.push(Segment::Node(node));
        self.flush(run)
    }

    fn flush(&mut self, run: Run) -> Result<()> {
        // A running sum can overcount where a range boundary splits invalid UTF-8.
        let size = if run.summed {
            self.measure(run.start..run.end)?
        } else {
            run.size
        };
        let (start_line, end_line) = self.lines.span(run.start..run.end);

        let mut outline = String::new();
        for (kind, range) in run.members {
            let (first, last) = self.lines.span(range);
            if !outline.is_empty() {
                outline.push('\n');
            }
            let _ = write!(outline, "{kind} [{first}..{last}]");
        }

        self.chunks.push(Chunk {
            start_byte: run.start,
            end_byte: run.end,
            size,
            start_line,
            end_line,
            outline,
        });
        Ok(())
    }
}

/// Statistics about a chunk sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_bytes: usize,
    pub total_size: usize,
    pub avg_size_per_chunk: usize,
    pub min_size: usize,
    pub max_size: usize,
    /// Chunks above the ceiling they were produced for
    pub oversized_chunks: usize,
}

impl ChunkingStats {
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk], max_size: usize) -> Self {
        let total_size: usize = chunks.iter().map(|chunk| chunk.size).sum();
        Self {
            total_chunks: chunks.len(),
            total_bytes: chunks.iter().map(Chunk::len).sum(),
            total_size,
            avg_size_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_size / chunks.len()
            },
            min_size: chunks.iter().map(|chunk| chunk.size).min().unwrap_or(0),
            max_size: chunks.iter().map(|chunk| chunk.size).max().unwrap_or(0),
            oversized_chunks: chunks
                .iter()
                .filter(|chunk| chunk.is_oversized(max_size))
                .count(),
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Bytes: {} | Size: {} | Avg: {} | Range: {}-{} | Oversized: {}",
            self.total_chunks,
            self.total_bytes,
            self.total_size,
            self.avg_size_per_chunk,
            self.min_size,
            self.max_size,
            self.oversized_chunks
        )
    }
}
