//! Schema and field-mapping resolution
//!
//! A VA's provider configuration carries two JSON documents:
//!
//! - `connection`: where to reach the base, e.g. `{"base_id": "app123", "api_key": "..."}`
//! - `schema`: per-entity table and field mappings:
//!
//! ```json
//! {
//!   "entities": {
//!     "pilot": {
//!       "table_name": "Pilots",
//!       "enabled": true,
//!       "field_mappings": { "callsign": "Callsign", "registered": "Registered" },
//!       "last_modified_field": "Last Modified"
//!     }
//!   }
//! }
//! ```
//!
//! [`FieldReader`] applies the value coercion rules when pulling logical fields
//! out of a source record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Entity kinds the pipeline knows how to sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Pilot,
    Route,
    Pirep,
}

impl EntityKind {
    /// Key of the entity in the schema document
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Pilot => "pilot",
            EntityKind::Route => "route",
            EntityKind::Pirep => "pirep",
        }
    }

    /// Ledger event type recorded after a successful sync
    pub fn event_type(&self) -> &'static str {
        match self {
            EntityKind::Pilot => "airtable_pilots_sync",
            EntityKind::Route => "airtable_routes_sync",
            EntityKind::Pirep => "airtable_pireps_sync",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pilot" | "pilots" => Ok(EntityKind::Pilot),
            "route" | "routes" => Ok(EntityKind::Route),
            "pirep" | "pireps" => Ok(EntityKind::Pirep),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Mapping of one entity kind onto a source table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Source table name (or id)
    pub table_name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Logical field name to source column name
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,

    /// Source column carrying the record's last-modified timestamp
    #[serde(default)]
    pub last_modified_field: Option<String>,
}

impl EntitySchema {
    /// Source column for a logical field, or `None` when unmapped.
    pub fn field_mapping(&self, logical: &str) -> Option<&str> {
        self.field_mappings
            .get(logical)
            .map(|column| column.trim())
            .filter(|column| !column.is_empty())
    }

    /// Last-modified column, ignoring blank values.
    pub fn last_modified_field(&self) -> Option<&str> {
        self.last_modified_field
            .as_deref()
            .map(str::trim)
            .filter(|field| !field.is_empty())
    }
}

/// The `schema` document of a provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub entities: BTreeMap<String, EntitySchema>,
}

impl SchemaDocument {
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    /// Resolve the schema for an entity kind.
    pub fn entity(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.entities.get(kind.as_str())
    }
}

/// The `connection` document of an Airtable provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirtableConnection {
    #[serde(default)]
    pub base_id: String,

    /// Per-VA API key; falls back to the process-wide key when absent
    #[serde(default)]
    pub api_key: Option<String>,
}

impl AirtableConnection {
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads logical fields from a record's field map through an [`EntitySchema`].
pub struct FieldReader<'a> {
    schema: &'a EntitySchema,
    fields: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    pub fn new(schema: &'a EntitySchema, fields: &'a Map<String, Value>) -> Self {
        Self { schema, fields }
    }

    /// Raw value for a logical field. Null and empty arrays count as absent;
    /// single-element arrays (lookups, linked records) unwrap to the element.
    fn value(&self, field: &'static str) -> Result<Option<&'a Value>, RecordError> {
        let Some(column) = self.schema.field_mapping(field) else {
            return Ok(None);
        };
        let mut value = match self.fields.get(column) {
            Some(value) => value,
            None => return Ok(None),
        };
        if let Value::Array(items) = value {
            match items.as_slice() {
                [] => return Ok(None),
                [single] => value = single,
                _ => {
                    return Err(RecordError::WrongType {
                        field,
                        expected: "single value",
                        found: "array",
                    });
                }
            }
        }
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Text field; numbers are rendered, blank strings count as absent.
    pub fn optional_string(&self, field: &'static str) -> Result<Option<String>, RecordError> {
        match self.value(field)? {
            None => Ok(None),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(RecordError::WrongType {
                field,
                expected: "string",
                found: type_name(other),
            }),
        }
    }

    pub fn required_string(&self, field: &'static str) -> Result<String, RecordError> {
        let Some(column) = self.schema.field_mapping(field) else {
            return Err(RecordError::UnmappedField { field });
        };
        self.optional_string(field)?
            .ok_or_else(|| RecordError::MissingField {
                field,
                column: column.to_string(),
            })
    }

    pub fn optional_bool(&self, field: &'static str) -> Result<Option<bool>, RecordError> {
        match self.value(field)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(RecordError::WrongType {
                field,
                expected: "boolean",
                found: type_name(other),
            }),
        }
    }

    pub fn optional_number(&self, field: &'static str) -> Result<Option<f64>, RecordError> {
        match self.value(field)? {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(RecordError::WrongType {
                field,
                expected: "number",
                found: "number",
            }),
            Some(other) => Err(RecordError::WrongType {
                field,
                expected: "number",
                found: type_name(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pilot_schema() -> EntitySchema {
        serde_json::from_value(json!({
            "table_name": "Pilots",
            "field_mappings": {
                "callsign": "Callsign",
                "registered": "Registered",
                "flight_time": "Hours"
            }
        }))
        .unwrap()
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn resolves_entity_schema_by_kind() {
        let doc = SchemaDocument::from_json(&json!({
            "entities": {
                "pilot": { "table_name": "Pilots", "field_mappings": { "callsign": "Callsign" } },
                "route": { "table_name": "Routes", "enabled": false }
            }
        }))
        .unwrap();

        let pilot = doc.entity(EntityKind::Pilot).unwrap();
        assert_eq!(pilot.table_name, "Pilots");
        assert!(pilot.enabled);
        assert_eq!(pilot.field_mapping("callsign"), Some("Callsign"));
        assert_eq!(pilot.field_mapping("registered"), None);

        assert!(!doc.entity(EntityKind::Route).unwrap().enabled);
        assert!(doc.entity(EntityKind::Pirep).is_none());
    }

    #[test]
    fn null_schema_document_is_empty() {
        let doc = SchemaDocument::from_json(&Value::Null).unwrap();
        assert!(doc.entity(EntityKind::Pilot).is_none());
    }

    #[test]
    fn blank_last_modified_field_is_ignored() {
        let mut schema = pilot_schema();
        assert_eq!(schema.last_modified_field(), None);
        schema.last_modified_field = Some("  ".to_string());
        assert_eq!(schema.last_modified_field(), None);
        schema.last_modified_field = Some("Last Modified".to_string());
        assert_eq!(schema.last_modified_field(), Some("Last Modified"));
    }

    #[test]
    fn event_types_are_stable() {
        assert_eq!(EntityKind::Pilot.event_type(), "airtable_pilots_sync");
        assert_eq!(EntityKind::Route.event_type(), "airtable_routes_sync");
        assert_eq!(EntityKind::Pirep.event_type(), "airtable_pireps_sync");
        assert_eq!("PIREPS".parse::<EntityKind>(), Ok(EntityKind::Pirep));
        assert!("aircraft".parse::<EntityKind>().is_err());
    }

    #[test]
    fn required_string_reports_unmapped_and_missing() {
        let schema = pilot_schema();
        let record = fields(json!({ "Callsign": "   " }));
        let reader = FieldReader::new(&schema, &record);

        assert_eq!(
            reader.required_string("callsign"),
            Err(RecordError::MissingField {
                field: "callsign",
                column: "Callsign".to_string()
            })
        );
        assert_eq!(
            reader.required_string("route"),
            Err(RecordError::UnmappedField { field: "route" })
        );
    }

    #[test]
    fn strings_coerce_from_numbers_and_single_element_arrays() {
        let schema = pilot_schema();
        let record = fields(json!({ "Callsign": ["UAL123"], "Hours": 42 }));
        let reader = FieldReader::new(&schema, &record);
        assert_eq!(reader.required_string("callsign").unwrap(), "UAL123");

        let record = fields(json!({ "Callsign": 123 }));
        let reader = FieldReader::new(&schema, &record);
        assert_eq!(reader.required_string("callsign").unwrap(), "123");
    }

    #[test]
    fn wrong_types_abort_the_field() {
        let schema = pilot_schema();
        let record = fields(json!({
            "Callsign": { "nested": true },
            "Registered": "yes",
            "Hours": "12"
        }));
        let reader = FieldReader::new(&schema, &record);

        assert!(matches!(
            reader.required_string("callsign"),
            Err(RecordError::WrongType { found: "object", .. })
        ));
        assert!(matches!(
            reader.optional_bool("registered"),
            Err(RecordError::WrongType { expected: "boolean", found: "string", .. })
        ));
        assert!(matches!(
            reader.optional_number("flight_time"),
            Err(RecordError::WrongType { expected: "number", .. })
        ));
    }

    #[test]
    fn multi_element_arrays_are_rejected() {
        let schema = pilot_schema();
        let record = fields(json!({ "Callsign": ["A", "B"] }));
        let reader = FieldReader::new(&schema, &record);
        assert!(matches!(
            reader.required_string("callsign"),
            Err(RecordError::WrongType { found: "array", .. })
        ));
    }

    #[test]
    fn absent_optional_fields_are_none() {
        let schema = pilot_schema();
        let record = fields(json!({ "Callsign": "UAL1", "Registered": null, "Hours": [] }));
        let reader = FieldReader::new(&schema, &record);
        assert_eq!(reader.optional_bool("registered").unwrap(), None);
        assert_eq!(reader.optional_number("flight_time").unwrap(), None);
        assert_eq!(reader.optional_string("livery").unwrap(), None);
    }

    #[test]
    fn connection_document_parses_optional_key() {
        let conn = AirtableConnection::from_json(&json!({ "base_id": "app123" })).unwrap();
        assert_eq!(conn.base_id, "app123");
        assert!(conn.api_key.is_none());
    }
}
