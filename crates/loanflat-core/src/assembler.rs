//! Record assembly per destination table.
//!
//! Builds zero or more [`OutputRecord`]s for one table layout:
//!
//! - **Singleton**: one record per document, suppressed when only keys were
//!   populated and no declared default was applied
//! - **PerEntity**: one record per resolved entity, always kept
//! - **RowGroup**: one candidate record per `(kind, parameter)` marker, kept
//!   only when it holds meaningful data

use std::collections::{BTreeMap, BTreeSet};

use loanflat_model::{
    CellValue, DataType, FieldMapping, KeySource, OutputRecord, ResolvedEntity, RowGroupMarker,
    TableLayout, TableShape, ValueSource,
};
use loanflat_transform::{ChainExecutor, FieldTransformError, SourceScope, coerce};
use tracing::{debug, debug_span};

use crate::context::ProcessingContext;
use crate::error::TableMappingError;

/// A required or non-nullable column that ended up without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValue {
    pub column: String,
    pub entity: Option<String>,
}

/// Field errors keep the identity of the entity they occurred for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub error: FieldTransformError,
    pub entity: Option<String>,
}

/// Records and field-level outcomes for one table of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBatch {
    pub records: Vec<OutputRecord>,
    pub suppressed: usize,
    pub field_errors: Vec<FieldFailure>,
    pub missing_required: Vec<MissingValue>,
    pub truncated: usize,
}

/// A record under construction, with the provenance of every column.
#[derive(Debug, Default)]
struct Candidate {
    record: OutputRecord,
    sources: BTreeMap<String, ValueSource>,
    /// Columns whose default is dropped from an otherwise empty record.
    excludable: BTreeSet<String>,
}

impl Candidate {
    fn put(&mut self, field: &FieldMapping, value: CellValue, source: ValueSource) {
        let column = field.target_column.as_str();
        // a default never overwrites a value taken from the document
        if source == ValueSource::Default
            && self
                .sources
                .get(column)
                .is_some_and(|existing| *existing != ValueSource::Default)
        {
            return;
        }
        if field.exclude_default_when_record_empty {
            self.excludable.insert(column.to_string());
        }
        self.record.insert(column, value);
        self.sources.insert(column.to_string(), source);
    }

    fn put_key(&mut self, column: &str, value: CellValue) {
        if self.record.contains(column) {
            return;
        }
        self.record.insert(column, value);
        self.sources.insert(column.to_string(), ValueSource::Key);
    }

    fn has_column(&self, column: &str) -> bool {
        self.record.contains(column)
    }

    fn has_data(&self, layout: &TableLayout) -> bool {
        self.business_sources(layout)
            .any(|(_, source)| matches!(source, ValueSource::Mapped | ValueSource::Flag))
    }

    fn business_sources<'s>(
        &'s self,
        layout: &'s TableLayout,
    ) -> impl Iterator<Item = (&'s str, ValueSource)> + 's {
        self.sources
            .iter()
            .filter(|(column, _)| !layout.is_key_column(column))
            .map(|(column, source)| (column.as_str(), *source))
    }

    /// Singleton rule: data keeps the record; failing that, any default that is
    /// not flagged for exclusion does.
    fn keep_singleton(&mut self, layout: &TableLayout) -> bool {
        if self.has_data(layout) {
            return true;
        }
        let dropped: Vec<String> = self
            .excludable
            .iter()
            .filter(|column| self.sources.get(column.as_str()) == Some(&ValueSource::Default))
            .cloned()
            .collect();
        for column in &dropped {
            self.record.remove(column);
            self.sources.remove(column);
        }
        self.business_sources(layout)
            .any(|(_, source)| source == ValueSource::Default)
    }

    /// Row-group rule: a mapped, non-neutral value is meaningful; mapped
    /// neutral values count only when the group says zeros are meaningful.
    /// Flags and defaults never count.
    fn is_meaningful(&self, layout: &TableLayout, zero_is_meaningful: bool) -> bool {
        let mut neutral_seen = false;
        for (column, source) in self.business_sources(layout) {
            if source != ValueSource::Mapped {
                continue;
            }
            match self.record.get(column) {
                Some(value) if !value.is_neutral() => return true,
                Some(_) => neutral_seen = true,
                None => {}
            }
        }
        neutral_seen && zero_is_meaningful
    }
}

pub struct TableAssembler<'a> {
    ctx: ProcessingContext<'a>,
    executor: ChainExecutor<'a>,
}

impl<'a> TableAssembler<'a> {
    pub fn new(ctx: ProcessingContext<'a>) -> Self {
        Self {
            executor: ctx.executor(),
            ctx,
        }
    }

    pub fn assemble(&self, layout: &'a TableLayout) -> Result<TableBatch, TableMappingError> {
        let _span = debug_span!("table", table = %layout.name, shape = ?layout.shape).entered();
        let batch = match layout.shape {
            TableShape::Singleton => self.singleton(layout),
            TableShape::PerEntity => self.per_entity(layout),
            TableShape::RowGroup => self.row_groups(layout),
        }?;
        debug!(
            records = batch.records.len(),
            suppressed = batch.suppressed,
            field_errors = batch.field_errors.len(),
            "table assembled"
        );
        Ok(batch)
    }

    fn singleton(&self, layout: &'a TableLayout) -> Result<TableBatch, TableMappingError> {
        let mut batch = TableBatch::default();
        let scope = self.ctx.scope(layout);
        let mut candidate = Candidate::default();
        for field in self.ctx.contract.table_fields(layout) {
            self.run_field(&mut batch, &mut candidate, field, &scope);
        }
        self.inject_keys(layout, &mut candidate, None)?;

        if candidate.keep_singleton(layout) {
            batch.records.push(candidate.record);
        } else {
            debug!("only key columns populated, record suppressed");
            batch.suppressed += 1;
        }
        Ok(batch)
    }

    fn per_entity(&self, layout: &'a TableLayout) -> Result<TableBatch, TableMappingError> {
        let mut batch = TableBatch::default();
        for entity in self.ctx.entities {
            let scope = self.ctx.scope(layout).with_current(entity);
            let mut candidate = Candidate::default();
            for field in self.ctx.contract.table_fields(layout) {
                self.run_field(&mut batch, &mut candidate, field, &scope);
            }
            self.inject_keys(layout, &mut candidate, Some(entity))?;
            batch.records.push(candidate.record);
        }
        Ok(batch)
    }

    fn row_groups(&self, layout: &'a TableLayout) -> Result<TableBatch, TableMappingError> {
        let mut batch = TableBatch::default();
        let fields: Vec<&'a FieldMapping> = self.ctx.contract.table_fields(layout).collect();
        let (marked, shared): (Vec<&FieldMapping>, Vec<&FieldMapping>) = fields
            .iter()
            .copied()
            .partition(|field| field.row_group.is_some());

        let mut slots: Vec<&RowGroupMarker> = Vec::new();
        for marker in marked.iter().filter_map(|field| field.row_group.as_ref()) {
            if !slots.contains(&marker) {
                slots.push(marker);
            }
        }

        let scope = self.ctx.scope(layout);
        for marker in slots {
            let group = self.ctx.contract.row_group(&marker.kind);
            let zero_is_meaningful = group.is_some_and(|group| group.zero_is_meaningful);

            let mut candidate = Candidate::default();
            for field in marked
                .iter()
                .copied()
                .filter(|field| field.row_group.as_ref() == Some(marker))
            {
                self.run_field(&mut batch, &mut candidate, field, &scope);
            }
            if !candidate.is_meaningful(layout, zero_is_meaningful) {
                debug!(slot = %marker, "no meaningful data, slot suppressed");
                batch.suppressed += 1;
                continue;
            }

            for field in shared.iter().copied() {
                if !candidate.has_column(&field.target_column) {
                    self.run_field(&mut batch, &mut candidate, field, &scope);
                }
            }
            if let Some(group) = group {
                candidate.put_key(&group.slot_column, slot_value(&marker.parameter));
            }
            self.inject_keys(layout, &mut candidate, None)?;
            batch.records.push(candidate.record);
        }
        Ok(batch)
    }

    fn run_field(
        &self,
        batch: &mut TableBatch,
        candidate: &mut Candidate,
        field: &'a FieldMapping,
        scope: &SourceScope<'a>,
    ) {
        let outcome = self.executor.execute(field, scope);
        let entity = scope.current.map(|entity| entity.identity.clone());

        if outcome.truncated {
            batch.truncated += 1;
        }
        if outcome.missing_required {
            batch.missing_required.push(MissingValue {
                column: field.target_column.clone(),
                entity: entity.clone(),
            });
        }
        if let Some(error) = outcome.error {
            batch.field_errors.push(FieldFailure { error, entity });
        }
        if let Some((value, source)) = outcome.cell {
            candidate.put(field, value, source);
        }
    }

    /// Fill relationship and identity keys that no field mapped.
    fn inject_keys(
        &self,
        layout: &TableLayout,
        candidate: &mut Candidate,
        entity: Option<&ResolvedEntity>,
    ) -> Result<(), TableMappingError> {
        for key in &layout.foreign_keys {
            if candidate.has_column(&key.column) {
                continue;
            }
            let raw = match key.source {
                KeySource::DocumentId => Some(self.ctx.document_id),
                KeySource::EntityIdentity => entity.map(|entity| entity.identity.as_str()),
            };
            let Some(raw) = raw else {
                return Err(TableMappingError::MissingKey {
                    table: layout.name.clone(),
                    column: key.column.clone(),
                });
            };
            let value = self.key_value(layout, &key.column, raw)?;
            candidate.put_key(&key.column, value);
        }
        Ok(())
    }

    /// Type a key after the field that maps the same column, preferring one in
    /// this table. Unmapped key columns stay text.
    fn key_value(
        &self,
        layout: &TableLayout,
        column: &str,
        raw: &str,
    ) -> Result<CellValue, TableMappingError> {
        let contract = self.ctx.contract;
        let data_type: Option<DataType> = contract
            .table_fields(layout)
            .chain(contract.fields.iter())
            .find(|field| field.target_column == column)
            .map(|field| field.data_type);
        let Some(data_type) = data_type else {
            return Ok(CellValue::Text(raw.to_string()));
        };
        coerce(raw, data_type, false)
            .map(|coerced| coerced.value)
            .map_err(|source| TableMappingError::KeyCoercion {
                table: layout.name.clone(),
                column: column.to_string(),
                data_type,
                source,
            })
    }
}

fn slot_value(parameter: &str) -> CellValue {
    match parameter.parse::<i64>() {
        Ok(slot) => CellValue::Integer(slot),
        Err(_) => CellValue::Text(parameter.to_string()),
    }
}
