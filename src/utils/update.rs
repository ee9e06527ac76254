//! Field-level writes for partial updates.

use mongodb::bson::{self, doc, oid::ObjectId, Document};
use serde::Serialize;

use crate::{database::MongoDB, utils::ApiResult};

/// `$set`/`$unset` for the named fields of `model`, read from its stored form.
/// Fields the model serializes away (absent options) are unset. `None` when
/// nothing changed.
pub fn changed_fields<T: Serialize>(model: &T, fields: &[&str]) -> ApiResult<Option<Document>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let stored = bson::to_document(model)?;
    let mut set = Document::new();
    let mut unset = Document::new();

    for &field in fields {
        match stored.get(field) {
            Some(value) => {
                set.insert(field, value.clone());
            }
            None => {
                unset.insert(field, "");
            }
        }
    }

    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(Some(update))
}

/// Writes only `fields` of `model` to the document with `id`. `false` when
/// the document no longer exists.
pub async fn update_fields<T: Serialize>(
    db: &MongoDB,
    collection: &str,
    id: &ObjectId,
    model: &T,
    fields: &[&str],
) -> ApiResult<bool> {
    let Some(update) = changed_fields(model, fields)? else {
        return Ok(true);
    };

    let result = db
        .collection::<Document>(collection)
        .update_one(doc! { "_id": id }, update)
        .await?;
    Ok(result.matched_count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        name: String,
        average_cost: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reset_token: Option<String>,
        untouched: bool,
    }

    fn profile(reset_token: Option<&str>) -> Profile {
        Profile {
            name: "Devworks".into(),
            average_cost: 8000.0,
            reset_token: reset_token.map(str::to_string),
            untouched: true,
        }
    }

    #[test]
    fn only_named_fields_are_written() {
        let update = changed_fields(&profile(Some("abc")), &["name", "resetToken"]).unwrap();
        assert_eq!(
            update,
            Some(doc! { "$set": { "name": "Devworks", "resetToken": "abc" } })
        );
    }

    #[test]
    fn absent_options_are_unset() {
        let update = changed_fields(&profile(None), &["averageCost", "resetToken"]).unwrap();
        assert_eq!(
            update,
            Some(doc! {
                "$set": { "averageCost": 8000.0 },
                "$unset": { "resetToken": "" },
            })
        );
    }

    #[test]
    fn nothing_to_write_without_fields() {
        assert_eq!(changed_fields(&profile(None), &[]).unwrap(), None);
    }
}
