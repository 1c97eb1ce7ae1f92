//! Per-document entry point.

use loanflat_ingest::{Document, EntityResolver, SelectiveReader};
use loanflat_model::{MappingContract, RelationalOutput};
use tracing::{debug, debug_span, info, info_span, warn};

use crate::aggregate::OutputAggregator;
use crate::assembler::TableAssembler;
use crate::clock::Clock;
use crate::context::{EngineOptions, ProcessingContext};
use crate::error::EngineError;
use crate::report::{Diagnostic, ProcessingReport};

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutput {
    pub document_id: String,
    /// Table name → records; what the persistence layer receives.
    pub tables: RelationalOutput,
    pub report: ProcessingReport,
}

/// Maps documents with one immutable contract.
///
/// The engine holds no per-document state, so one instance can process any
/// number of documents, and independent instances never interact.
#[derive(Debug, Clone)]
pub struct MappingEngine {
    contract: MappingContract,
    options: EngineOptions,
}

impl MappingEngine {
    pub fn new(contract: MappingContract) -> Self {
        Self {
            contract,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn contract(&self) -> &MappingContract {
        &self.contract
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Flatten one document into relational records.
    ///
    /// Fails only when the document lacks its identifier, or has no admissible
    /// entity while entities are required. Field and table failures are
    /// isolated and listed in the report.
    pub fn process(
        &self,
        document: &Document,
        clock: &dyn Clock,
    ) -> Result<DocumentOutput, EngineError> {
        let contract = &self.contract;
        let (index, stats) = debug_span!("read")
            .in_scope(|| SelectiveReader::new(&contract.paths).read_with_stats(document));

        let identity = &contract.document_identity;
        let document_id = index
            .attribute(&identity.path, &identity.attribute)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::MissingDocumentId {
                path: identity.path.clone(),
                attribute: identity.attribute.clone(),
            })?
            .to_string();

        let span = info_span!("document", id = %document_id);
        let _guard = span.enter();
        debug!(
            indexed = index.len(),
            visited = stats.visited,
            pruned = stats.pruned,
            "document indexed"
        );

        let resolution = EntityResolver::new(&contract.entity).resolve(document);
        let mut report = ProcessingReport::new(&document_id);
        report.reader_skips = index.skipped();
        report.dropped_entities = resolution.dropped.len();
        report.replaced_entities = resolution.replaced;
        if resolution.replaced > 0 {
            report.add_diagnostic(Diagnostic::info(format!(
                "{} duplicate {} entities replaced by a later occurrence",
                resolution.replaced, contract.entity.element
            )));
        }
        for dropped in &resolution.dropped {
            report.add_diagnostic(Diagnostic::warning(format!(
                "{} at element {} dropped: {}",
                contract.entity.element, dropped.position, dropped.reason
            )));
        }

        if resolution.entities.is_empty() {
            let strict = self
                .options
                .strict_entities
                .unwrap_or(contract.entity.required);
            if strict {
                return Err(EngineError::NoEntities {
                    document_id,
                    element: contract.entity.element.clone(),
                });
            }
            warn!(element = %contract.entity.element, "no admissible entities");
            report.add_diagnostic(Diagnostic::warning(format!(
                "no admissible {} entities",
                contract.entity.element
            )));
        }

        let ctx = ProcessingContext::new(
            contract,
            &document_id,
            &index,
            &resolution.entities,
            clock.now(),
        )
        .with_options(self.options);
        let assembler = TableAssembler::new(ctx);

        let mut aggregator = OutputAggregator::new(report);
        for layout in &contract.tables {
            match assembler.assemble(layout) {
                Ok(batch) => aggregator.add_batch(&layout.name, batch),
                Err(error) => aggregator.add_failure(&error),
            }
        }
        let (tables, report) = aggregator.finish();

        info!(
            tables = tables.table_names().count(),
            records = report.records_emitted,
            suppressed = report.records_suppressed,
            field_errors = report.field_errors,
            table_errors = report.table_errors,
            "document processed"
        );
        Ok(DocumentOutput {
            document_id,
            tables,
            report,
        })
    }
}
