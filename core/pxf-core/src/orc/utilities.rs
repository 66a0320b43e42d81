use super::type_description::Category;
use crate::error::{PxfError, PxfResult};
use crate::pg;
use crate::types::FieldValue;
use tracing::trace;

/// Decode a one-dimensional array literal into values for a list of `child`.
///
/// Elements keep their text form for categories that are parsed later by the
/// element writer (strings, dates, timestamps, decimals).
pub fn parse_postgres_array(value: &str, child: Category) -> PxfResult<Vec<Option<FieldValue>>> {
    trace!(child_type = %child, value, "parsing array literal");
    pg::split_array(value)?
        .into_iter()
        .map(|element| match element {
            None => Ok(None),
            Some(element) => decode_element(&element, child).map(Some).map_err(|_| {
                element_error(&element, child, value)
            }),
        })
        .collect()
}

/// Error for an array element that does not decode as `child`.
pub fn element_error(element: &str, child: Category, value: &str) -> PxfError {
    PxfError::runtime_with_hint(
        format!(
            "Error parsing array element: {} was not of expected type {}",
            element, child
        ),
        error_hint(element.starts_with('{'), value),
    )
}

pub fn error_hint(multi_dimensional: bool, value: &str) -> String {
    if multi_dimensional {
        format!(
            "Column value \"{}\" is a multi-dimensional array, PXF does not support multi-dimensional arrays for writing ORC files.",
            value
        )
    } else {
        "Unexpected state since PXF generated the ORC schema.".to_string()
    }
}

fn decode_element(element: &str, child: Category) -> PxfResult<FieldValue> {
    Ok(match child {
        Category::Boolean => FieldValue::Boolean(pg::parse_bool_literal(element)?),
        Category::Short | Category::Int | Category::Long => {
            FieldValue::Long(element.parse().map_err(|_| number_error(element))?)
        }
        Category::Float => FieldValue::Float(element.parse().map_err(|_| number_error(element))?),
        Category::Double => {
            FieldValue::Double(element.parse().map_err(|_| number_error(element))?)
        }
        Category::Binary => FieldValue::Bytes(pg::parse_bytea_literal(element)?),
        Category::String
        | Category::Char
        | Category::Varchar
        | Category::Date
        | Category::Timestamp
        | Category::TimestampInstant
        | Category::Decimal => FieldValue::Text(element.to_string()),
        other => {
            return Err(PxfError::runtime(format!("type: {} is not supported", other)));
        }
    })
}

fn number_error(element: &str) -> PxfError {
    PxfError::runtime(format!("For input string: \"{}\"", element))
}
