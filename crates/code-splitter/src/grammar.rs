use crate::error::{Result, SplitterError};
use crate::language::Language;
use crate::tree::{NodeKind, SyntaxTree, TreeBuilder};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tree_sitter::{Node, Parser};

/// Capability turning a byte buffer into a [`SyntaxTree`]
///
/// Implementations are shared across threads and must not keep per-call
/// mutable state.
pub trait Grammar: Send + Sync {
    fn parse(&self, source: &[u8]) -> Result<SyntaxTree>;
}

/// Grammar backed by a compiled tree-sitter language
#[derive(Clone)]
pub struct TreeSitterGrammar {
    language: tree_sitter::Language,
    name: &'static str,
}

impl TreeSitterGrammar {
    pub fn new(language: tree_sitter::Language, name: &'static str) -> Self {
        Self { language, name }
    }

    /// Grammar for one of the built-in languages
    pub fn for_language(language: Language) -> Result<Self> {
        Ok(Self::new(language.tree_sitter_language()?, language.as_str()))
    }

    fn convert(root: Node<'_>, source_len: usize) -> Result<SyntaxTree> {
        let mut builder = TreeBuilder::with_capacity(root.descendant_count());
        let mut cursor = root.walk();
        // (first free byte, end) of each open node; ranges are clamped into them
        let mut bounds: Vec<(usize, usize)> = Vec::new();

        loop {
            let node = cursor.node();
            let (low, high) = bounds.last().copied().unwrap_or((0, source_len));
            let start = node.start_byte().clamp(low, high);
            let end = node.end_byte().clamp(start, high);
            if let Some(parent) = bounds.last_mut() {
                parent.0 = end;
            }
            builder.start_node(classify(&node), node.kind(), start, end);
            bounds.push((start, end));

            // Error spans are kept whole; descending would split inside recovered garbage.
            if !node.is_error() && cursor.goto_first_child() {
                continue;
            }
            builder.finish_node();
            bounds.pop();

            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return builder.build(source_len);
                }
                builder.finish_node();
                bounds.pop();
            }
        }
    }
}

impl Grammar for TreeSitterGrammar {
    fn parse(&self, source: &[u8]) -> Result<SyntaxTree> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).map_err(|e| {
            SplitterError::parse(format!("Failed to load {} grammar: {e}", self.name))
        })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| SplitterError::parse(format!("{} parser produced no tree", self.name)))?;

        Self::convert(tree.root_node(), source.len())
    }
}

impl fmt::Debug for TreeSitterGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSitterGrammar")
            .field("name", &self.name)
            .finish()
    }
}

fn classify(node: &Node<'_>) -> NodeKind {
    if node.is_error() {
        NodeKind::Error
    } else if node.is_missing() {
        NodeKind::Missing
    } else if node.is_named() {
        NodeKind::Named
    } else {
        NodeKind::Anonymous
    }
}

static GLOBAL_REGISTRY: Lazy<Arc<GrammarRegistry>> =
    Lazy::new(|| Arc::new(GrammarRegistry::builtin()));

/// Maps language tags to grammars
#[derive(Clone, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<Language, Arc<dyn Grammar>>,
}

impl GrammarRegistry {
    /// Registry without any grammar
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in tree-sitter grammar
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for language in Language::BUILTIN {
            match TreeSitterGrammar::for_language(language) {
                Ok(grammar) => registry.register(language, grammar),
                Err(e) => log::warn!("Skipping built-in grammar {language}: {e}"),
            }
        }
        registry
    }

    /// Shared built-in registry, created on first use
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register (or replace) the grammar for a language
    pub fn register(&mut self, language: Language, grammar: impl Grammar + 'static) {
        self.grammars.insert(language, Arc::new(grammar));
    }

    /// Grammar registered for `language`
    pub fn get(&self, language: Language) -> Result<Arc<dyn Grammar>> {
        self.grammars
            .get(&language)
            .cloned()
            .ok_or_else(|| SplitterError::unsupported_language(language.as_str()))
    }

    #[must_use]
    pub fn contains(&self, language: Language) -> bool {
        self.grammars.contains_key(&language)
    }

    /// Registered languages in a stable order
    #[must_use]
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.grammars.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Parse `source` with the grammar registered for `language`
    pub fn parse(&self, language: Language, source: &[u8]) -> Result<SyntaxTree> {
        self.get(language)?.parse(source)
    }
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}
