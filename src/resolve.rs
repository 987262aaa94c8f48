//! Fallback-chain resolution over loosely-typed JSON.
//!
//! Each logical field is described by a [`Field`]: an ordered list of
//! dotted candidate paths (current schema first, then legacy shapes) and a
//! literal default. Every candidate is an accessor returning an optional
//! value; [`first_non_empty`] picks the first one that produced something.

use serde_json::Value;

/// A logical field with its candidate paths and literal default.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub candidates: &'static [&'static str],
    pub default: &'static str,
}

impl Field {
    pub const fn new(candidates: &'static [&'static str], default: &'static str) -> Self {
        Self {
            candidates,
            default,
        }
    }

    /// Resolve against `root`, falling back to the literal default.
    pub fn resolve(&self, root: &Value) -> String {
        self.probe(root).unwrap_or_else(|| self.default.to_string())
    }

    /// Resolve against `root` without applying the default.
    pub fn probe(&self, root: &Value) -> Option<String> {
        first_non_empty(self.candidates.iter().map(|path| text_at(root, path)))
    }
}

/// First-non-empty-wins combinator.
pub fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates.into_iter().flatten().next()
}

/// Walk a dotted path. Numeric segments index arrays. Any missing key,
/// null or scalar intermediate ends the walk with `None`.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Convert a scalar to display text.
///
/// Empty and whitespace-only strings count as absent; numbers – zero
/// included – are kept as written.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("Yes".to_string()),
        Value::Bool(false) => Some("No".to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Scalar text at a dotted path.
pub fn text_at(root: &Value, path: &str) -> Option<String> {
    lookup(root, path).and_then(scalar_text)
}

/// First non-empty string among several item-relative keys.
pub fn item_text(item: &Value, keys: &[&str]) -> Option<String> {
    first_non_empty(keys.iter().map(|key| text_at(item, key)))
}

/// First non-empty collection among the candidate paths.
///
/// A lone object where a list is expected is treated as a one-item list.
pub fn first_collection<'a>(root: &'a Value, candidates: &[&str]) -> Option<Vec<&'a Value>> {
    candidates.iter().find_map(|path| {
        let value = lookup(root, path)?;
        match value {
            Value::Array(items) => {
                let present: Vec<&Value> = items.iter().filter(|v| !v.is_null()).collect();
                (!present.is_empty()).then_some(present)
            }
            Value::Object(map) if !map.is_empty() => Some(vec![value]),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENGINEER: Field = Field::new(
        &[
            "engineer.name",
            "engineerName",
            "technician.name",
            "technicianName",
            "fse.name",
            "fseName",
        ],
        "-",
    );

    #[test]
    fn current_path_wins_over_legacy() {
        let record = json!({"engineer": {"name": "A"}, "engineerName": "B"});
        assert_eq!(ENGINEER.resolve(&record), "A");
    }

    #[test]
    fn falls_through_to_later_candidates() {
        let record = json!({"engineer": null, "technician": "flat", "fseName": "C"});
        assert_eq!(ENGINEER.resolve(&record), "C");
    }

    #[test]
    fn empty_string_is_absent_but_zero_is_kept() {
        let record = json!({"engineer": {"name": ""}, "engineerName": "B"});
        assert_eq!(ENGINEER.resolve(&record), "B");

        let reading = Field::new(&["voltage.pn"], "-");
        assert_eq!(reading.resolve(&json!({"voltage": {"pn": 0}})), "0");
        assert_eq!(reading.resolve(&json!({"voltage": {"pn": ""}})), "-");
    }

    #[test]
    fn default_when_nothing_resolves() {
        assert_eq!(ENGINEER.resolve(&json!({})), "-");
        assert_eq!(ENGINEER.resolve(&Value::Null), "-");
        assert_eq!(ENGINEER.resolve(&json!("text")), "-");
    }

    #[test]
    fn lookup_indexes_arrays() {
        let record = json!({"rows": [{"x": 1}, {"x": 2}]});
        assert_eq!(text_at(&record, "rows.1.x").as_deref(), Some("2"));
        assert_eq!(text_at(&record, "rows.9.x"), None);
        assert_eq!(text_at(&record, "rows.first.x"), None);
    }

    #[test]
    fn collections_skip_empty_candidates() {
        let record = json!({"parts": [], "spareParts": [{"name": "Lamp"}]});
        let items = first_collection(&record, &["parts", "spareParts"]).unwrap();
        assert_eq!(items.len(), 1);

        let single = json!({"coolant": {"status": "OK"}});
        assert_eq!(first_collection(&single, &["coolant"]).unwrap().len(), 1);
        assert!(first_collection(&json!({}), &["coolant"]).is_none());
    }

    #[test]
    fn booleans_render_as_yes_no() {
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("Yes"));
        assert_eq!(scalar_text(&json!(false)).as_deref(), Some("No"));
    }
}
