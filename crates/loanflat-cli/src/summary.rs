use std::path::PathBuf;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use loanflat_model::{KeySource, MappingContract, TableLayout, TableShape};

use crate::types::RunResult;

pub fn print_layout(contract: &MappingContract) {
    println!("Contract: {} (version {})", contract.name, contract.version);
    println!("Fingerprint: {}", contract.fingerprint);
    println!(
        "Fields: {}  Enum tables: {}  Bit tables: {}",
        contract.fields.len(),
        contract.enum_tables.len(),
        contract.bit_tables.len()
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Shape"),
        header_cell("Fields"),
        header_cell("Keys"),
        header_cell("Fallback path"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for layout in &contract.tables {
        table.add_row(vec![
            Cell::new(&layout.name).add_attribute(Attribute::Bold),
            Cell::new(shape_label(layout.shape)),
            Cell::new(layout.field_indices.len()),
            keys_cell(layout),
            layout
                .fallback_path
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{table}");
}

pub fn print_summary(result: &RunResult) {
    println!("Contract: {} ({})", result.contract_name, result.fingerprint);
    match &result.output_dir {
        Some(dir) => println!("Output: {}", dir.display()),
        None => println!("Output: none (dry run)"),
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Document"),
        header_cell("ID"),
        header_cell("Tables"),
        header_cell("Records"),
        header_cell("Suppressed"),
        header_cell("Field errors"),
        header_cell("Table errors"),
        header_cell("Warnings"),
        header_cell("Files"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut totals = [0usize; 6];
    for summary in &result.documents {
        let counts = [
            summary.tables,
            summary.records,
            summary.suppressed,
            summary.field_errors,
            summary.table_errors,
            summary.warnings,
        ];
        for (total, count) in totals.iter_mut().zip(counts) {
            *total += count;
        }
        table.add_row(vec![
            Cell::new(&summary.file),
            Cell::new(&summary.document_id),
            Cell::new(summary.tables),
            Cell::new(summary.records),
            dim_cell(summary.suppressed),
            count_cell(summary.field_errors, Color::Red),
            count_cell(summary.table_errors, Color::Red),
            count_cell(summary.warnings, Color::Yellow),
            outputs_cell(&summary.outputs),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("TOTAL ({})", result.documents.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(totals[1]).add_attribute(Attribute::Bold),
        dim_cell(totals[2]),
        count_cell(totals[3], Color::Red).add_attribute(Attribute::Bold),
        count_cell(totals[4], Color::Red).add_attribute(Attribute::Bold),
        count_cell(totals[5], Color::Yellow).add_attribute(Attribute::Bold),
        Cell::new(result.documents.iter().map(|d| d.outputs.len()).sum::<usize>()),
    ]);
    println!("{table}");

    if !result.failures.is_empty() {
        eprintln!("Failed documents:");
        for failure in &result.failures {
            eprintln!("- {}: {}", failure.file, failure.error);
        }
    }
}

fn shape_label(shape: TableShape) -> &'static str {
    match shape {
        TableShape::Singleton => "singleton",
        TableShape::PerEntity => "per entity",
        TableShape::RowGroup => "row group",
    }
}

/// Written file names, one per line.
fn outputs_cell(outputs: &[PathBuf]) -> Cell {
    if outputs.is_empty() {
        return dim_cell("-");
    }
    let names: Vec<String> = outputs
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    Cell::new(names.join("\n"))
}

fn keys_cell(layout: &TableLayout) -> Cell {
    if layout.key_columns.is_empty() {
        return dim_cell("-");
    }
    let keys: Vec<String> = layout
        .key_columns
        .iter()
        .map(|column| {
            let injected = layout.foreign_keys.iter().find(|key| &key.column == column);
            match injected.map(|key| key.source) {
                Some(KeySource::DocumentId) => format!("{column} <- document"),
                Some(KeySource::EntityIdentity) => format!("{column} <- entity"),
                None => column.clone(),
            }
        })
        .collect();
    Cell::new(keys.join("\n"))
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
