//! Per-call processing context.
//!
//! Everything a table projection needs for one document is passed in here
//! explicitly. Nothing in it outlives the `process` call that built it.

use chrono::NaiveDateTime;
use loanflat_model::{DocumentIndex, MappingContract, ResolvedEntity, TableLayout};
use loanflat_transform::{ChainExecutor, SourceScope, TransformOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Override the contract's `entity.required` flag.
    pub strict_entities: Option<bool>,
    /// Cut over-long text to the declared length instead of failing the field.
    pub truncate_strings: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strict_entities: None,
            truncate_strings: true,
        }
    }
}

impl EngineOptions {
    pub fn with_strict_entities(mut self, strict: bool) -> Self {
        self.strict_entities = Some(strict);
        self
    }

    pub fn with_truncate_strings(mut self, truncate: bool) -> Self {
        self.truncate_strings = truncate;
        self
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            truncate_strings: self.truncate_strings,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessingContext<'a> {
    pub contract: &'a MappingContract,
    pub document_id: &'a str,
    pub index: &'a DocumentIndex,
    pub entities: &'a [ResolvedEntity],
    pub now: NaiveDateTime,
    pub options: EngineOptions,
}

impl<'a> ProcessingContext<'a> {
    pub fn new(
        contract: &'a MappingContract,
        document_id: &'a str,
        index: &'a DocumentIndex,
        entities: &'a [ResolvedEntity],
        now: NaiveDateTime,
    ) -> Self {
        Self {
            contract,
            document_id,
            index,
            entities,
            now,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn executor(&self) -> ChainExecutor<'a> {
        ChainExecutor::new(self.contract).with_options(self.options.transform_options())
    }

    /// Source scope for a document-level record of `table`.
    pub fn scope(&self, table: &'a TableLayout) -> SourceScope<'a> {
        SourceScope {
            index: self.index,
            entities: self.entities,
            current: None,
            table,
            now: self.now,
        }
    }
}
