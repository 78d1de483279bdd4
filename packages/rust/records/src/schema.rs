//! Record schemas: a template of defaults, the fields that must be
//! populated, and the flatten/compact helpers the merge stages work in
//! terms of.

use serde_json::{Map, Value};

use parldata_shared::{ParldataError, RecordKind, Result};

/// The shape of one record type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub kind: RecordKind,
    /// Defaults for a freshly seeded document, nested where the record is.
    pub template: Value,
    /// Top-level fields that must hold a truthy value after seeding.
    pub required: &'static [&'static str],
}

impl RecordSchema {
    /// Seed a new document: deep-copy the template, overlay the incoming
    /// top-level fields, and check for extraneous and missing fields.
    pub fn seed(&self, fields: &Value) -> Result<Value> {
        let incoming = fields.as_object().ok_or_else(|| {
            ParldataError::validation(format!(
                "{} fields must be an object",
                self.kind
            ))
        })?;
        let mut doc = self.template.clone();
        let slots = doc.as_object_mut().ok_or_else(|| {
            ParldataError::validation(format!("{} template is not an object", self.kind))
        })?;

        for (key, value) in incoming {
            if !slots.contains_key(key) {
                return Err(ParldataError::validation(format!(
                    "extraneous field {key:?} in {} record",
                    self.kind
                )));
            }
            slots.insert(key.clone(), value.clone());
        }
        self.check_required(&doc)?;
        Ok(doc)
    }

    /// Verify every required field holds a truthy value.
    pub fn check_required(&self, doc: &Value) -> Result<()> {
        for field in self.required {
            let present = doc.get(*field).map(is_truthy).unwrap_or(false);
            if !present {
                return Err(ParldataError::validation(format!(
                    "required field {field:?} is missing or empty in {} record",
                    self.kind
                )));
            }
        }
        Ok(())
    }
}

/// Falsiness mirrors what a blank extraction produces: null, empty
/// strings, empty containers, zero, false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Flatten nested objects into dot-delimited leaf paths. Arrays and
/// scalars are leaves; an empty object flattens to itself so the key is
/// not silently lost.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, None, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                let path = match prefix {
                    Some(p) => format!("{p}.{key}"),
                    None => key.clone(),
                };
                flatten_into(nested, Some(&path), out);
            }
        }
        other => {
            if let Some(path) = prefix {
                out.push((path.to_string(), other.clone()));
            }
        }
    }
}

/// Drop the falsy leaves so a merge never overwrites real data with the
/// blanks of a sparser extraction.
pub fn compact(pairs: Vec<(String, Value)>) -> Vec<(String, Value)> {
    pairs.into_iter().filter(|(_, v)| is_truthy(v)).collect()
}

/// Rebuild a flat path list into a dotted-key object, the shape the merge
/// stages receive on their first pass.
pub fn to_flat_object(pairs: Vec<(String, Value)>) -> Value {
    let mut map = Map::new();
    for (path, value) in pairs {
        map.insert(path, value);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> RecordSchema {
        RecordSchema {
            kind: RecordKind::Bill,
            template: json!({
                "_sources": [],
                "actions": [],
                "identifier": null,
                "title": null,
                "titles": [],
            }),
            required: &["_sources", "identifier", "title"],
        }
    }

    #[test]
    fn seed_overlays_template() {
        let doc = schema()
            .seed(&json!({
                "_sources": ["http://example.org/bills"],
                "identifier": "23.01.055.123-2014",
                "title": "Ο περί Εταιρειών Νόμος",
            }))
            .unwrap();
        assert_eq!(doc["actions"], json!([]));
        assert_eq!(doc["identifier"], json!("23.01.055.123-2014"));
    }

    #[test]
    fn extraneous_field_rejected() {
        let err = schema()
            .seed(&json!({"identifier": "x", "bogus": 1}))
            .unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn missing_required_field_rejected() {
        let result = schema().seed(&json!({
            "_sources": ["http://example.org"],
            "identifier": "x",
        }));
        assert!(matches!(result, Err(ParldataError::Validation { .. })));
    }

    #[test]
    fn flatten_and_compact() {
        let flat = flatten(&json!({
            "agenda": {"cap1": ["23.01-2014"], "cap2": []},
            "date": "2014-05-03",
            "sitting": null,
        }));
        assert_eq!(
            flat,
            vec![
                ("agenda.cap1".to_string(), json!(["23.01-2014"])),
                ("agenda.cap2".to_string(), json!([])),
                ("date".to_string(), json!("2014-05-03")),
                ("sitting".to_string(), json!(null)),
            ]
        );
        let compacted = compact(flat);
        assert_eq!(
            compacted,
            vec![
                ("agenda.cap1".to_string(), json!(["23.01-2014"])),
                ("date".to_string(), json!("2014-05-03")),
            ]
        );
    }
}
