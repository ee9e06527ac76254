//! BSON to client JSON.
//!
//! Documents leave the API with ObjectIds as plain hex strings and dates as
//! RFC 3339 strings, whether they came from a typed model or straight out of
//! an aggregation pipeline.

use mongodb::bson::{self, Bson, Document};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::utils::ApiResult;

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Number(i.into()),
        Bson::Int64(i) => Value::Number(i.into()),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: Document) -> Value {
    let map: Map<String, Value> = doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect();
    Value::Object(map)
}

/// Serializes a model through BSON so it renders exactly like aggregated documents.
pub fn model_to_json<T: Serialize>(model: &T) -> ApiResult<Value> {
    Ok(document_to_json(bson::to_document(model)?))
}

pub fn strip_fields(value: &mut Value, fields: &[&str]) {
    if let Value::Object(map) = value {
        for field in fields {
            map.remove(*field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, DateTime};

    #[test]
    fn object_ids_and_dates_render_as_strings() {
        let id = ObjectId::new();
        let created = DateTime::from_millis(0);
        let json = document_to_json(doc! {
            "_id": id,
            "createdAt": created,
            "careers": ["Business"],
            "nested": { "weeks": 8_i32, "tuition": 1000.5 },
        });

        assert_eq!(json["_id"], id.to_hex());
        assert!(json["createdAt"].as_str().unwrap().starts_with("1970-01-01T00:00:00"));
        assert_eq!(json["careers"][0], "Business");
        assert_eq!(json["nested"]["weeks"], 8);
        assert_eq!(json["nested"]["tuition"], 1000.5);
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(bson_to_json(Bson::Double(f64::NAN)), Value::Null);
    }
}
