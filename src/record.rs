//! Input records – loosely-typed JSON as it comes out of storage, across
//! every historical schema version.

use serde_json::Value;

use crate::error::{ExportError, ExportResult};

/// One service/inspection event. Nothing inside is guaranteed present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportRecord(Value);

/// Aggregate data for one site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteRecord(Value);

macro_rules! record_impl {
    ($name:ident) => {
        impl $name {
            pub fn new(value: Value) -> Self {
                Self(value)
            }

            /// Parse record JSON. Malformed text is the only way to fail.
            pub fn from_json(json: &str) -> ExportResult<Self> {
                serde_json::from_str(json)
                    .map(Self)
                    .map_err(|e| ExportError::InvalidInput(e.to_string()))
            }

            pub fn value(&self) -> &Value {
                &self.0
            }
        }

        impl From<Value> for $name {
            fn from(value: Value) -> Self {
                Self(value)
            }
        }
    };
}

record_impl!(ReportRecord);
record_impl!(SiteRecord);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = ReportRecord::from_json("{not json").unwrap_err();
        assert!(matches!(err, ExportError::InvalidInput(_)));
    }

    #[test]
    fn non_object_json_is_accepted() {
        let record = ReportRecord::from_json("[1, 2]").unwrap();
        assert!(record.value().is_array());
    }
}
