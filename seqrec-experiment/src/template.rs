use seqrec_core::{Error, Result, Side};
use std::collections::BTreeSet;
use std::path::Path;

/// Symbolic sequence pattern over {A, B}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pattern: String,
    symbols: Vec<Side>,
}

impl Template {
    /// Accepts `ABA` or `A_B_A`; `_` separates symbols and is otherwise ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidTemplate {
            template: text.to_string(),
            reason: reason.to_string(),
        };

        let mut symbols = Vec::with_capacity(text.len());
        for ch in text.chars().filter(|c| *c != '_') {
            match Side::from_symbol(ch) {
                Some(side) => symbols.push(side),
                None => return Err(invalid(&format!("unexpected symbol '{ch}'"))),
            }
        }
        if symbols.is_empty() {
            return Err(invalid("no symbols"));
        }

        Ok(Self {
            pattern: symbols.iter().map(Side::symbol).collect(),
            symbols,
        })
    }

    /// Canonical form without separators, e.g. `ABA`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn symbols(&self) -> &[Side] {
        &self.symbols
    }

    pub fn level(&self) -> usize {
        self.symbols.len()
    }
}

/// Ordered, read-only list of templates loaded once per session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let templates = patterns
            .into_iter()
            .map(|p| Template::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { templates })
    }

    /// One pattern per line; blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Result<Self> {
        Self::new(
            text.lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_lines(&text)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Distinct template lengths present.
    pub fn levels(&self) -> BTreeSet<usize> {
        self.templates.iter().map(Template::level).collect()
    }
}
