use std::path::PathBuf;

#[derive(Debug)]
pub struct RunResult {
    pub contract_name: String,
    pub fingerprint: String,
    pub output_dir: Option<PathBuf>,
    pub documents: Vec<DocumentSummary>,
    pub failures: Vec<DocumentFailure>,
    pub has_errors: bool,
}

#[derive(Debug)]
pub struct DocumentSummary {
    pub file: String,
    pub document_id: String,
    pub tables: usize,
    pub records: usize,
    pub suppressed: usize,
    pub field_errors: usize,
    pub table_errors: usize,
    pub warnings: usize,
    pub outputs: Vec<PathBuf>,
}

/// A document the engine could not process at all.
#[derive(Debug)]
pub struct DocumentFailure {
    pub file: String,
    pub error: String,
}
