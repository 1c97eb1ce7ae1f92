//! Per-field chain execution.
//!
//! A field runs in three phases: the raw value is resolved (context selectors
//! apply here), the value chain produces zero or one text value, and that value
//! is coerced to the declared column type. Any failure or missing value falls
//! back to the declared default, and otherwise the column is omitted.

use loanflat_model::{
    CellValue, FieldMapping, Literal, LookupTable, MappingContract, ValueChain, ValueSource,
};
use tracing::{debug, warn};

use crate::coerce::{DATETIME_FORMAT, coerce};
use crate::error::FieldTransformError;
use crate::lookup::{bit_lookup, enum_lookup};
use crate::numeric::extract_numeric;
use crate::source::{ResolvedSource, SourceScope, expression_context, resolve_source};

/// Options controlling value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Cut over-long text to the declared length instead of failing the field.
    pub truncate_strings: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            truncate_strings: true,
        }
    }
}

/// Result of running one field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldOutcome {
    /// The column value and how it was obtained; `None` omits the column.
    pub cell: Option<(CellValue, ValueSource)>,
    pub error: Option<FieldTransformError>,
    pub truncated: bool,
    /// A required or non-nullable field ended up without a value.
    pub missing_required: bool,
}

impl FieldOutcome {
    pub fn value(&self) -> Option<&CellValue> {
        self.cell.as_ref().map(|(value, _)| value)
    }

    pub fn source(&self) -> Option<ValueSource> {
        self.cell.as_ref().map(|(_, source)| *source)
    }
}

/// Runs field chains against one contract.
#[derive(Debug, Clone, Copy)]
pub struct ChainExecutor<'c> {
    contract: &'c MappingContract,
    options: TransformOptions,
}

impl<'c> ChainExecutor<'c> {
    pub fn new(contract: &'c MappingContract) -> Self {
        Self {
            contract,
            options: TransformOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> TransformOptions {
        self.options
    }

    pub fn execute(&self, field: &'c FieldMapping, scope: &SourceScope<'c>) -> FieldOutcome {
        let source = resolve_source(self.contract, field, scope);
        let produced = self.run_chain(field, &source, scope);

        let mut outcome = FieldOutcome::default();
        if let Some((text, provenance)) = produced {
            match coerce(&text, field.data_type, self.options.truncate_strings) {
                Ok(coerced) => {
                    if coerced.truncated {
                        warn!(
                            field = %field.target(),
                            data_type = %field.data_type,
                            "value truncated to declared length"
                        );
                    }
                    outcome.truncated = coerced.truncated;
                    outcome.cell = Some((coerced.value, provenance));
                }
                Err(source) => {
                    let error = FieldTransformError::Coercion {
                        field: field.target(),
                        data_type: field.data_type,
                        source,
                    };
                    warn!(error = %error, "field transform failed");
                    outcome.error = Some(error);
                }
            }
        }

        if outcome.cell.is_none() {
            self.apply_default(field, &mut outcome);
        }
        outcome.missing_required = outcome.cell.is_none() && (field.required || !field.nullable);
        outcome
    }

    fn run_chain(
        &self,
        field: &FieldMapping,
        source: &ResolvedSource<'_>,
        scope: &SourceScope<'_>,
    ) -> Option<(String, ValueSource)> {
        let raw = source.raw;
        let mapped = |text: String| non_blank(text).map(|text| (text, ValueSource::Mapped));

        match &field.chain {
            ValueChain::Passthrough => mapped(raw?.trim().to_string()),
            ValueChain::EnumLookup { table } => {
                mapped(self.enum_value(field, table, raw?)?.to_text())
            }
            ValueChain::BitConversion { table } => {
                let Some(raw) = raw else {
                    return Some(("0".to_string(), ValueSource::Default));
                };
                let flag = self
                    .contract
                    .bit_tables
                    .get(table)
                    .is_some_and(|table| bit_lookup(table, raw));
                Some((u8::from(flag).to_string(), ValueSource::Flag))
            }
            ValueChain::NumericExtract => mapped(extract_numeric(raw?)?),
            ValueChain::Calculated => mapped(self.calculate(field, source, scope)?),
            ValueChain::CalculatedThenEnum { table } => {
                if let Some(calculated) = self.calculate(field, source, scope).and_then(non_blank)
                {
                    return Some((calculated, ValueSource::Mapped));
                }
                debug!(field = %field.target(), "calculated value blank, falling back to lookup");
                mapped(self.enum_value(field, table, raw?)?.to_text())
            }
            ValueChain::TimestampIfMissing => match raw.map(str::trim) {
                Some(raw) if !raw.is_empty() => Some((raw.to_string(), ValueSource::Mapped)),
                _ => Some((
                    scope.now.format(DATETIME_FORMAT).to_string(),
                    ValueSource::Default,
                )),
            },
        }
    }

    fn enum_value(&self, field: &FieldMapping, table: &str, raw: &str) -> Option<&'c Literal> {
        let table: &'c LookupTable = self.contract.enum_tables.get(table)?;
        let result = enum_lookup(table, raw);
        if !result.is_resolved() {
            debug!(field = %field.target(), table = %table.name, "no lookup match, column excluded");
        }
        result.value()
    }

    fn calculate(
        &self,
        field: &FieldMapping,
        source: &ResolvedSource<'_>,
        scope: &SourceScope<'_>,
    ) -> Option<String> {
        let expression = field.expression.as_ref()?;
        let ctx = expression_context(self.contract, scope.index, source);
        expression
            .evaluate(&ctx)
            .map(|value| value.as_str().to_string())
    }

    fn apply_default(&self, field: &FieldMapping, outcome: &mut FieldOutcome) {
        let Some(default) = field
            .default_value
            .as_ref()
            .or_else(|| self.contract.default_values.get(&field.target_column))
        else {
            return;
        };
        match coerce(
            &default.to_text(),
            field.data_type,
            self.options.truncate_strings,
        ) {
            Ok(coerced) => outcome.cell = Some((coerced.value, ValueSource::Default)),
            Err(source) => {
                let error = FieldTransformError::Default {
                    field: field.target(),
                    data_type: field.data_type,
                    source,
                };
                warn!(error = %error, "default not applied");
                if outcome.error.is_none() {
                    outcome.error = Some(error);
                }
            }
        }
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
