//! Mapping operators and the normalized value chain.

use std::fmt;

/// Context selectors redefine where a field's raw value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSelector {
    PrimaryRoleContact,
    SecondaryRoleContact,
    AuxiliaryRoleContact,
    CurrentAddressOnly,
}

impl fmt::Display for ContextSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PrimaryRoleContact => "primary_contact",
            Self::SecondaryRoleContact => "secondary_contact",
            Self::AuxiliaryRoleContact => "auxiliary_contact",
            Self::CurrentAddressOnly => "current_address_only",
        })
    }
}

/// A parsed `kind(parameter)` marker, e.g. `add_collateral(2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowGroupMarker {
    pub kind: String,
    pub parameter: String,
}

impl fmt::Display for RowGroupMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.parameter)
    }
}

/// One named step of a field's declared chain, after load-time normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingOperator {
    EnumLookup { table: String },
    BitConversion { table: String },
    NumericExtract,
    CalculatedField,
    ContextSelector(ContextSelector),
    RowGroupMarker(RowGroupMarker),
    IdentityPassthrough,
    TimestampIfMissing,
}

impl MappingOperator {
    pub fn name(&self) -> String {
        match self {
            Self::EnumLookup { .. } => "enum".to_string(),
            Self::BitConversion { .. } => "char_to_bit".to_string(),
            Self::NumericExtract => "numbers_only".to_string(),
            Self::CalculatedField => "calculated_field".to_string(),
            Self::ContextSelector(selector) => selector.to_string(),
            Self::RowGroupMarker(marker) => marker.to_string(),
            Self::IdentityPassthrough => "identity".to_string(),
            Self::TimestampIfMissing => "timestamp_if_missing".to_string(),
        }
    }
}

/// The value-transform portion of a field's chain.
///
/// Only these shapes are accepted when a contract is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueChain {
    Passthrough,
    EnumLookup { table: String },
    BitConversion { table: String },
    NumericExtract,
    Calculated,
    /// Calculated value if non-blank, else an enum lookup of the original raw value.
    CalculatedThenEnum { table: String },
    TimestampIfMissing,
}

impl ValueChain {
    pub fn uses_expression(&self) -> bool {
        matches!(self, Self::Calculated | Self::CalculatedThenEnum { .. })
    }
}
