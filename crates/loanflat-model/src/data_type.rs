//! Declared destination column types.

use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Integer column width; bounds the accepted range during coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Tiny,
    Small,
    Int,
    Big,
}

impl IntWidth {
    pub fn range(self) -> (i64, i64) {
        match self {
            Self::Tiny => (0, 255),
            Self::Small => (i64::from(i16::MIN), i64::from(i16::MAX)),
            Self::Int => (i64::from(i32::MIN), i64::from(i32::MAX)),
            Self::Big => (i64::MIN, i64::MAX),
        }
    }

    pub fn contains(self, value: i64) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String { max_len: Option<usize> },
    Integer { width: IntWidth },
    Decimal { scale: Option<u32> },
    Bit,
    DateTime,
    Date,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { max_len: Some(len) } => write!(f, "string({len})"),
            Self::String { max_len: None } => f.write_str("string"),
            Self::Integer { width } => f.write_str(match width {
                IntWidth::Tiny => "tinyint",
                IntWidth::Small => "smallint",
                IntWidth::Int => "int",
                IntWidth::Big => "bigint",
            }),
            Self::Decimal { scale: Some(scale) } => write!(f, "decimal(scale {scale})"),
            Self::Decimal { scale: None } => f.write_str("decimal"),
            Self::Bit => f.write_str("bit"),
            Self::DateTime => f.write_str("datetime"),
            Self::Date => f.write_str("date"),
        }
    }
}

impl FromStr for DataType {
    type Err = ModelError;

    /// Parse SQL-flavoured type names such as `varchar(50)` or `decimal(12,2)`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (base, args) = match normalized.split_once('(') {
            Some((base, rest)) => {
                let Some(args) = rest.strip_suffix(')') else {
                    return Err(ModelError::InvalidTypeSize(raw.to_string()));
                };
                (base.trim(), Some(args.trim()))
            }
            None => (normalized.as_str(), None),
        };

        let size = |value: &str| -> Result<usize, ModelError> {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| ModelError::InvalidTypeSize(raw.to_string()))
        };

        let data_type = match base {
            "varchar" | "nvarchar" | "char" | "nchar" => {
                let max_len = match args {
                    Some(arg) if arg.eq_ignore_ascii_case("max") => None,
                    Some(arg) => Some(size(arg)?),
                    None => None,
                };
                Self::String { max_len }
            }
            "text" | "ntext" | "string" => Self::String { max_len: None },
            "tinyint" => Self::Integer {
                width: IntWidth::Tiny,
            },
            "smallint" => Self::Integer {
                width: IntWidth::Small,
            },
            "int" | "integer" => Self::Integer {
                width: IntWidth::Int,
            },
            "bigint" => Self::Integer {
                width: IntWidth::Big,
            },
            "decimal" | "numeric" => {
                let scale = match args {
                    Some(arg) => match arg.split_once(',') {
                        Some((precision, scale)) => {
                            size(precision)?;
                            let scale = u32::try_from(size(scale)?)
                                .map_err(|_| ModelError::InvalidTypeSize(raw.to_string()))?;
                            Some(scale)
                        }
                        None => {
                            size(arg)?;
                            Some(0)
                        }
                    },
                    None => None,
                };
                Self::Decimal { scale }
            }
            "money" | "smallmoney" => Self::Decimal { scale: Some(4) },
            "float" | "real" => Self::Decimal { scale: None },
            "bit" | "bool" | "boolean" => Self::Bit,
            "datetime" | "datetime2" | "smalldatetime" => Self::DateTime,
            "date" => Self::Date,
            _ => return Err(ModelError::UnknownDataType(raw.to_string())),
        };
        Ok(data_type)
    }
}
