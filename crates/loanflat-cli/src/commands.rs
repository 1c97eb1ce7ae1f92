//! Command implementations.

use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::DateTime;
use indicatif::{ProgressBar, ProgressStyle};
use loanflat_cli::documents::{discover_documents, file_name, file_stem};
use loanflat_cli::logging::redact_value;
use loanflat_cli::output::{ensure_dir, write_csv, write_json};
use loanflat_contract::load_contract;
use loanflat_core::{Clock, EngineOptions, FixedClock, MappingEngine, SystemClock};
use loanflat_ingest::Document;
use tracing::{error, info, info_span};

use crate::cli::{CheckContractArgs, OutputFormatArg, TransformArgs};
use crate::summary::print_layout;
use crate::types::{DocumentFailure, DocumentSummary, RunResult};

pub fn run_check_contract(args: &CheckContractArgs) -> Result<()> {
    let contract = load_contract(&args.contract)
        .with_context(|| format!("load contract {}", args.contract.display()))?;
    info!(
        contract = %contract.name,
        version = %contract.version,
        fingerprint = %contract.fingerprint,
        "contract loaded"
    );
    print_layout(&contract);
    Ok(())
}

pub fn run_transform(args: &TransformArgs) -> Result<RunResult> {
    let contract = load_contract(&args.contract)
        .with_context(|| format!("load contract {}", args.contract.display()))?;
    let contract_name = contract.name.clone();
    let fingerprint = contract.fingerprint.clone();
    let span = info_span!("transform", contract = %contract_name, fingerprint = %fingerprint);
    let _guard = span.enter();

    let clock: Box<dyn Clock> = match &args.now {
        Some(now) => {
            let pinned = DateTime::parse_from_rfc3339(now)
                .with_context(|| format!("parse --now {now}"))?;
            Box::new(FixedClock(pinned.naive_utc()))
        }
        None => Box::new(SystemClock),
    };

    let mut options = EngineOptions::default().with_truncate_strings(!args.no_truncate);
    if args.strict_entities {
        options = options.with_strict_entities(true);
    }
    let engine = MappingEngine::new(contract).with_options(options);

    let documents = discover_documents(&args.inputs, args.shard).context("discover documents")?;
    info!(
        documents = documents.len(),
        shard = ?args.shard.map(|shard| shard.to_string()),
        "documents discovered"
    );

    let output_dir = if args.dry_run {
        None
    } else {
        ensure_dir(&args.output_dir)?;
        Some(args.output_dir.clone())
    };

    let progress = progress_bar(documents.len() as u64, args.no_progress);
    let mut summaries = Vec::new();
    let mut failures = Vec::new();
    for path in &documents {
        let file = file_name(path);
        progress.set_message(file.clone());
        let outcome = process_document(
            &engine,
            clock.as_ref(),
            path,
            output_dir.as_deref(),
            args.format,
        );
        match outcome {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                error!(file = %file, error = %format!("{err:#}"), "document failed");
                failures.push(DocumentFailure {
                    file,
                    error: format!("{err:#}"),
                });
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    let has_errors =
        !failures.is_empty() || summaries.iter().any(|summary| summary.table_errors > 0);
    Ok(RunResult {
        contract_name,
        fingerprint,
        output_dir,
        documents: summaries,
        failures,
        has_errors,
    })
}

fn process_document(
    engine: &MappingEngine,
    clock: &dyn Clock,
    path: &Path,
    output_dir: Option<&Path>,
    format: OutputFormatArg,
) -> Result<DocumentSummary> {
    let file = file_name(path);
    let document = Document::load(path).with_context(|| format!("read {}", path.display()))?;
    let output = engine
        .process(&document, clock)
        .with_context(|| format!("process {}", path.display()))?;

    let outputs = match output_dir {
        Some(dir) => {
            let stem = file_stem(path);
            match format {
                OutputFormatArg::Json => write_json(dir, &stem, &output.tables)?,
                OutputFormatArg::Csv => write_csv(dir, &stem, &output.tables)?,
            }
        }
        None => Vec::new(),
    };

    let report = &output.report;
    info!(
        document_id = %redact_value(&output.document_id),
        records = report.records_emitted,
        field_errors = report.field_errors,
        table_errors = report.table_errors,
        "document processed"
    );
    Ok(DocumentSummary {
        file,
        document_id: output.document_id.clone(),
        tables: output.tables.table_names().count(),
        records: report.records_emitted,
        suppressed: report.records_suppressed,
        field_errors: report.field_errors,
        table_errors: report.table_errors,
        warnings: report.warning_count(),
        outputs,
    })
}

fn progress_bar(len: u64, disabled: bool) -> ProgressBar {
    if disabled || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}
