//! Relational output aggregation.
//!
//! Collects each table's batch into the document's table → records map and
//! folds the batch outcomes into the processing report. No filtering happens
//! here.

use loanflat_model::RelationalOutput;
use tracing::warn;

use crate::assembler::TableBatch;
use crate::error::TableMappingError;
use crate::report::{Diagnostic, ProcessingReport};

#[derive(Debug, Default)]
pub struct OutputAggregator {
    output: RelationalOutput,
    report: ProcessingReport,
}

impl OutputAggregator {
    pub fn new(report: ProcessingReport) -> Self {
        Self {
            output: RelationalOutput::new(),
            report,
        }
    }

    pub fn add_batch(&mut self, table: &str, batch: TableBatch) {
        let report = &mut self.report;
        report.records_emitted += batch.records.len();
        report.records_suppressed += batch.suppressed;
        report.field_errors += batch.field_errors.len();
        report.truncated_values += batch.truncated;
        report.missing_required += batch.missing_required.len();

        for failure in batch.field_errors {
            let mut diagnostic = Diagnostic::warning(failure.error.to_string())
                .with_table(table)
                .with_column(column_of(failure.error.field()));
            if let Some(entity) = failure.entity {
                diagnostic = diagnostic.with_entity(entity);
            }
            report.add_diagnostic(diagnostic);
        }
        for missing in batch.missing_required {
            let mut diagnostic = Diagnostic::warning("required column has no value")
                .with_table(table)
                .with_column(missing.column);
            if let Some(entity) = missing.entity {
                diagnostic = diagnostic.with_entity(entity);
            }
            report.add_diagnostic(diagnostic);
        }

        self.output.extend_table(table, batch.records);
    }

    pub fn add_failure(&mut self, error: &TableMappingError) {
        warn!(table = error.table(), error = %error, "table omitted from output");
        self.report.table_errors += 1;
        self.report
            .add_diagnostic(Diagnostic::error(error.to_string()).with_table(error.table()));
    }

    pub fn finish(self) -> (RelationalOutput, ProcessingReport) {
        (self.output, self.report)
    }
}

/// `table.column` → `column`.
fn column_of(target: &str) -> &str {
    target.rsplit_once('.').map_or(target, |(_, column)| column)
}
