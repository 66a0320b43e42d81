//! Engine tuple description → ORC write schema.

use super::type_description::{Category, TypeDescription, MAX_PRECISION};
use crate::error::{PxfError, PxfResult};
use crate::types::{ColumnDescriptor, DataType};
use tracing::debug;

/// Builds the ORC schema used for writing.
pub struct OrcSchemaBuilder;

impl OrcSchemaBuilder {
    /// Top-level struct with one field per column, in column order.
    pub fn build_schema(columns: &[ColumnDescriptor]) -> PxfResult<TypeDescription> {
        let mut schema = TypeDescription::create_struct();
        for column in columns {
            let orc_type = Self::orc_type(column)?;
            debug!(
                "Mapped column {} of type {} to ORC type {}",
                column.name,
                column.type_code(),
                orc_type
            );
            schema.add_field(column.name.clone(), orc_type);
        }
        debug!("Built schema: {}", schema);
        Ok(schema)
    }

    fn orc_type(column: &ColumnDescriptor) -> PxfResult<TypeDescription> {
        let data_type = column.data_type;
        // one-dimensional arrays only; the engine does not report dimensions
        let scalar = if data_type.is_array() {
            data_type.type_elem().unwrap_or(DataType::Unsupported)
        } else {
            data_type
        };

        let scalar_type = match scalar {
            DataType::Boolean => TypeDescription::new(Category::Boolean),
            DataType::Bytea => TypeDescription::new(Category::Binary),
            DataType::Bigint => TypeDescription::new(Category::Long),
            DataType::Smallint => TypeDescription::new(Category::Short),
            DataType::Integer => TypeDescription::new(Category::Int),
            // no TIME or UUID in ORC
            DataType::Text | DataType::Time | DataType::Uuid => {
                TypeDescription::new(Category::String)
            }
            DataType::Real => TypeDescription::new(Category::Float),
            DataType::Float8 => TypeDescription::new(Category::Double),
            DataType::Bpchar => match modifier(column, 0) {
                Some(length) => TypeDescription::new(Category::Char).with_max_length(length as u32),
                None => {
                    return Err(PxfError::runtime(format!(
                        "Column {} of CHAR type must have maximum size information.",
                        column.name
                    )));
                }
            },
            DataType::Varchar => match modifier(column, 0) {
                Some(length) => {
                    TypeDescription::new(Category::Varchar).with_max_length(length as u32)
                }
                None => TypeDescription::new(Category::String),
            },
            DataType::Date => TypeDescription::new(Category::Date),
            DataType::Timestamp => TypeDescription::new(Category::Timestamp),
            DataType::TimestampWithTimeZone => TypeDescription::new(Category::TimestampInstant),
            DataType::Numeric => decimal_type(column)?,
            _ => {
                return Err(PxfError::runtime(format!(
                    "Unsupported Greenplum type {} for column {}",
                    data_type.oid(),
                    column.name
                )));
            }
        };

        Ok(if data_type.is_array() {
            TypeDescription::create_list(scalar_type)
        } else {
            scalar_type
        })
    }
}

/// Type modifier at `index`; negative values mean "not set".
fn modifier(column: &ColumnDescriptor, index: usize) -> Option<i32> {
    column
        .type_modifiers
        .as_ref()
        .and_then(|mods| mods.get(index).copied())
        .filter(|m| *m >= 0)
}

/// Decimal with the column's precision and scale; ORC defaults when unset.
fn decimal_type(column: &ColumnDescriptor) -> PxfResult<TypeDescription> {
    let decimal = TypeDescription::new(Category::Decimal);
    match (modifier(column, 0), modifier(column, 1)) {
        (Some(precision), scale) => {
            let precision = u8::try_from(precision)
                .ok()
                .filter(|p| *p <= MAX_PRECISION)
                .ok_or_else(|| {
                    PxfError::InvalidArguments(format!(
                        "precision {} is out of range 1 .. {}",
                        precision, MAX_PRECISION
                    ))
                })?;
            let scale = scale.unwrap_or(0).min(u8::MAX as i32) as u8;
            // scale first: precision may not drop below the current scale
            decimal.with_scale(scale)?.with_precision(precision)
        }
        (None, Some(scale)) => Err(PxfError::runtime(format!(
            "Invalid modifiers: scale defined as {} while precision is not set.",
            scale
        ))),
        (None, None) => Ok(decimal),
    }
}
