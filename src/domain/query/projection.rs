//! Field projection applied to fetched documents

use std::collections::BTreeSet;

use serde_json::Value;

use super::{Document, QueryError};

const ID_FIELD: &str = "_id";

/// Which top-level fields a fetch returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only the listed fields, plus `_id` unless it was excluded
    Include { fields: BTreeSet<String>, with_id: bool },
    /// Everything except the listed fields
    Exclude(BTreeSet<String>),
}

impl Projection {
    /// Parse `{field: 1|0|true|false}` or a `"name -population"` string.
    ///
    /// Returns `None` for an empty projection (all fields).
    pub fn from_json(value: &Value) -> Result<Option<Self>, QueryError> {
        let entries: Vec<(String, bool)> = match value {
            Value::Object(map) => map
                .iter()
                .map(|(field, flag)| {
                    let include = match flag {
                        Value::Bool(b) => *b,
                        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                        _ => return Err(QueryError::InvalidProjectionValue(field.clone())),
                    };
                    Ok((field.clone(), include))
                })
                .collect::<Result<_, _>>()?,
            Value::String(list) => list
                .split_whitespace()
                .map(|token| match token.strip_prefix('-') {
                    Some(field) => (field.to_string(), false),
                    None => (token.trim_start_matches('+').to_string(), true),
                })
                .collect(),
            _ => return Err(QueryError::InvalidProjection),
        };
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<(String, bool)>) -> Result<Option<Self>, QueryError> {
        let mut id_flag = None;
        let mut included = BTreeSet::new();
        let mut excluded = BTreeSet::new();

        for (field, include) in entries {
            if field == ID_FIELD {
                id_flag = Some(include);
            } else if include {
                included.insert(field);
            } else {
                excluded.insert(field);
            }
        }

        match (included.is_empty(), excluded.is_empty()) {
            (false, false) => Err(QueryError::MixedProjection),
            (false, true) => Ok(Some(Self::Include {
                fields: included,
                with_id: id_flag != Some(false),
            })),
            (true, _) => {
                if id_flag == Some(false) {
                    excluded.insert(ID_FIELD.to_string());
                }
                if excluded.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Self::Exclude(excluded)))
                }
            }
        }
    }

    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Self::Include { fields, with_id } => {
                doc.retain(|key, _| fields.contains(key) || (*with_id && key == ID_FIELD));
                doc
            }
            Self::Exclude(fields) => {
                doc.retain(|key, _| !fields.contains(key));
                doc
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Document {
        json!({"_id": "1", "name": "Tokyo", "population": 37400068, "country": "Japan"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn inclusion_keeps_id() {
        let p = Projection::from_json(&json!({"name": 1})).unwrap().unwrap();
        let out = p.apply(doc());
        assert_eq!(Value::Object(out), json!({"_id": "1", "name": "Tokyo"}));
    }

    #[test]
    fn inclusion_can_drop_id() {
        let p = Projection::from_json(&json!({"name": true, "_id": 0}))
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(p.apply(doc())), json!({"name": "Tokyo"}));
    }

    #[test]
    fn exclusion_removes_fields() {
        let p = Projection::from_json(&json!({"population": 0, "_id": 0}))
            .unwrap()
            .unwrap();
        assert_eq!(
            Value::Object(p.apply(doc())),
            json!({"name": "Tokyo", "country": "Japan"})
        );
    }

    #[test]
    fn string_form() {
        let p = Projection::from_json(&json!("name country")).unwrap().unwrap();
        assert_eq!(
            Value::Object(p.apply(doc())),
            json!({"_id": "1", "name": "Tokyo", "country": "Japan"})
        );
        let p = Projection::from_json(&json!("-population")).unwrap().unwrap();
        assert!(!p.apply(doc()).contains_key("population"));
    }

    #[test]
    fn empty_means_everything() {
        assert_eq!(Projection::from_json(&json!({})).unwrap(), None);
        assert_eq!(Projection::from_json(&json!("")).unwrap(), None);
    }

    #[test]
    fn rejects_mixed_and_invalid() {
        assert_eq!(
            Projection::from_json(&json!({"name": 1, "population": 0})),
            Err(QueryError::MixedProjection)
        );
        assert_eq!(
            Projection::from_json(&json!({"name": "yes"})),
            Err(QueryError::InvalidProjectionValue("name".into()))
        );
        assert_eq!(
            Projection::from_json(&json!(5)),
            Err(QueryError::InvalidProjection)
        );
    }
}
