//! Request-driven filtering, sorting, projection and pagination.
//!
//! Query strings such as
//! `averageCost[lte]=10000&careers[in]=Business,UI/UX&select=name&sort=-name&page=2&limit=2`
//! are translated into a MongoDB aggregation pipeline. `select`, `sort`,
//! `page` and `limit` are reserved; every other key becomes a filter, with
//! `gt`, `gte`, `lt`, `lte` and `in` rewritten to their `$` operators.
//! Values are typed from the resource's field table; fields not listed there
//! are compared as strings.

use chrono::DateTime;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use serde::Serialize;
use serde_json::Value;

use crate::{
    database::MongoDB,
    models::{BOOTCAMPS, COURSES},
    utils::{json, ApiResult},
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;
pub const MAX_LIMIT: u64 = 100;

const RESERVED: &[&str] = &["select", "sort", "page", "limit"];
const OPERATORS: &[&str] = &["gt", "gte", "lt", "lte", "in"];

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub filter: Document,
    pub select: Option<Vec<String>>,
    pub sort: Document,
    pub page: u64,
    pub limit: u64,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            filter: Document::new(),
            select: None,
            sort: doc! { "createdAt": -1, "_id": 1 },
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryParams {
    pub fn from_query_string(query: &str, fields: FieldTypes) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
            fields,
        )
    }

    pub fn from_pairs<I>(pairs: I, fields: FieldTypes) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = QueryParams::default();

        for (key, raw) in pairs {
            match key.as_str() {
                "select" => params.select = parse_select(&raw),
                "sort" => {
                    if let Some(sort) = parse_sort(&raw) {
                        params.sort = sort;
                    }
                }
                "page" => params.page = parse_positive(&raw).unwrap_or(DEFAULT_PAGE),
                "limit" => params.limit = parse_positive(&raw).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
                _ => add_filter(&mut params.filter, &key, &raw, fields),
            }
        }

        // Keeps `skip` representable as a BSON int64.
        params.page = params.page.min(max_page(params.limit));
        params
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn max_page(limit: u64) -> u64 {
    (i64::MAX as u64 / limit.max(1)).max(1)
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

fn parse_select(raw: &str) -> Option<Vec<String>> {
    let fields: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty() && !f.starts_with('$'))
        .map(str::to_string)
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn parse_sort(raw: &str) -> Option<Document> {
    let mut sort = Document::new();
    for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let (name, direction) = match field.strip_prefix('-') {
            Some(name) => (name, -1),
            None => (field.trim_start_matches('+'), 1),
        };
        if name.is_empty() || name.contains('$') {
            continue;
        }
        sort.insert(name, direction);
    }
    if sort.is_empty() {
        return None;
    }
    // Stable pages when the requested keys tie.
    if !sort.contains_key("_id") {
        sort.insert("_id", 1);
    }
    Some(sort)
}

/// `field[op]` → `("field", Some("op"))`, `field` → `("field", None)`.
fn split_key(key: &str) -> (&str, Option<&str>) {
    if let (Some(open), true) = (key.find('['), key.ends_with(']')) {
        (&key[..open], Some(&key[open + 1..key.len() - 1]))
    } else {
        (key, None)
    }
}

fn add_filter(filter: &mut Document, key: &str, raw: &str, fields: FieldTypes) {
    let (field, op) = split_key(key);

    // Operator injection: callers never get to write `$` keys themselves.
    if field.is_empty() || field.contains('$') || RESERVED.contains(&field) {
        return;
    }
    if op.map(|o| o.contains('$')).unwrap_or(false) {
        return;
    }

    let kind = field_kind(fields, field);

    match op {
        None => {
            filter.insert(field, typed_value(raw, kind));
        }
        Some(op) => {
            let (op_key, value) = if OPERATORS.contains(&op) {
                let value = if op == "in" {
                    Bson::Array(raw.split(',').map(|v| typed_value(v.trim(), kind)).collect())
                } else {
                    typed_value(raw, kind)
                };
                (format!("${}", op), value)
            } else {
                // Unknown operators stay literal, i.e. an embedded-document equality
                // that matches nothing.
                (op.to_string(), typed_value(raw, kind))
            };

            match filter.get_document_mut(field) {
                Ok(existing) => {
                    existing.insert(op_key, value);
                }
                Err(_) => {
                    let mut ops = Document::new();
                    ops.insert(op_key, value);
                    filter.insert(field, ops);
                }
            }
        }
    }
}

/// Stored type of a queryable field. Anything not listed is a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Bool,
    ObjectId,
    Date,
}

pub type FieldTypes = &'static [(&'static str, FieldKind)];

fn field_kind(fields: FieldTypes, field: &str) -> Option<FieldKind> {
    fields.iter().find(|(name, _)| *name == field).map(|(_, kind)| *kind)
}

/// Values that don't parse as their field's type stay strings and simply match nothing.
fn typed_value(raw: &str, kind: Option<FieldKind>) -> Bson {
    let typed = match kind {
        Some(FieldKind::Number) => raw
            .parse::<i64>()
            .map(Bson::Int64)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Bson::Double)),
        Some(FieldKind::Bool) => match raw {
            "true" => Some(Bson::Boolean(true)),
            "false" => Some(Bson::Boolean(false)),
            _ => None,
        },
        Some(FieldKind::ObjectId) => ObjectId::parse_str(raw).ok().map(Bson::ObjectId),
        Some(FieldKind::Date) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| Bson::DateTime(BsonDateTime::from_millis(dt.timestamp_millis()))),
        None => None,
    };
    typed.unwrap_or_else(|| Bson::String(raw.to_string()))
}

/// Relationship embedded into each result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    None,
    /// Bootcamps get their `courses` array.
    Courses,
    /// Courses and reviews get `bootcamp` replaced by `{_id, name, description}`.
    BootcampSummary,
}

impl Populate {
    fn field(&self) -> Option<&'static str> {
        match self {
            Populate::None => None,
            Populate::Courses => Some("courses"),
            Populate::BootcampSummary => Some("bootcamp"),
        }
    }

    pub fn stages(&self) -> Vec<Document> {
        match self {
            Populate::None => vec![],
            Populate::Courses => vec![doc! {
                "$lookup": {
                    "from": COURSES,
                    "localField": "_id",
                    "foreignField": "bootcamp",
                    "as": "courses",
                }
            }],
            Populate::BootcampSummary => vec![
                doc! {
                    "$lookup": {
                        "from": BOOTCAMPS,
                        "localField": "bootcamp",
                        "foreignField": "_id",
                        "as": "bootcamp",
                    }
                },
                doc! { "$unwind": { "path": "$bootcamp", "preserveNullAndEmptyArrays": true } },
                doc! {
                    "$set": {
                        "bootcamp": {
                            "_id": "$bootcamp._id",
                            "name": "$bootcamp.name",
                            "description": "$bootcamp.description",
                        }
                    }
                },
            ],
        }
    }
}

/// A collection as seen by list endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub collection: &'static str,
    pub populate: Populate,
    pub hidden: &'static [&'static str],
    pub fields: FieldTypes,
}

impl Resource {
    pub fn query(&self, query_string: &str) -> QueryParams {
        QueryParams::from_query_string(query_string, self.fields)
    }
}

pub fn build_pipeline(query: &QueryParams, populate: Populate) -> Vec<Document> {
    let mut pipeline = vec![
        doc! { "$match": query.filter.clone() },
        doc! { "$sort": query.sort.clone() },
        doc! { "$skip": i64::try_from(query.skip()).unwrap_or(i64::MAX) },
        doc! { "$limit": i64::try_from(query.limit).unwrap_or(i64::MAX) },
    ];

    pipeline.extend(populate.stages());

    if let Some(fields) = &query.select {
        let mut projection = Document::new();
        for field in fields {
            projection.insert(field.as_str(), 1);
        }
        if let Some(populated) = populate.field() {
            projection.insert(populated, 1);
        }
        pipeline.push(doc! { "$project": projection });
    }

    pipeline
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

pub fn paginate(page: u64, limit: u64, total: u64) -> Pagination {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let end = page.saturating_mul(limit);

    Pagination {
        next: (end < total)
            .then(|| page.checked_add(1))
            .flatten()
            .map(|page| PageRef { page, limit }),
        prev: (start > 0).then(|| PageRef { page: page - 1, limit }),
    }
}

#[derive(Debug, Serialize)]
pub struct AdvancedResults {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

pub async fn advanced_results(db: &MongoDB, resource: &Resource, query: &QueryParams) -> ApiResult<AdvancedResults> {
    let collection = db.collection::<Document>(resource.collection);

    let total = collection.count_documents(query.filter.clone()).await?;

    let documents: Vec<Document> = collection
        .aggregate(build_pipeline(query, resource.populate))
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = documents
        .into_iter()
        .map(|d| {
            let mut value = json::document_to_json(d);
            json::strip_fields(&mut value, resource.hidden);
            value
        })
        .collect();

    log::debug!(
        "📋 {}: {} of {} (page {}, limit {})",
        resource.collection,
        data.len(),
        total,
        query.page,
        query.limit
    );

    Ok(AdvancedResults {
        success: true,
        count: data.len(),
        total,
        pagination: paginate(query.page, query.limit, total),
        data,
    })
}

/// Single document with the resource's population applied.
pub async fn find_populated(db: &MongoDB, resource: &Resource, id: &ObjectId) -> ApiResult<Option<Value>> {
    let mut pipeline = vec![doc! { "$match": { "_id": id } }, doc! { "$limit": 1 }];
    pipeline.extend(resource.populate.stages());

    let mut cursor = db.collection::<Document>(resource.collection).aggregate(pipeline).await?;

    Ok(cursor.try_next().await?.map(|d| {
        let mut value = json::document_to_json(d);
        json::strip_fields(&mut value, resource.hidden);
        value
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: FieldTypes = &[
        ("averageCost", FieldKind::Number),
        ("housing", FieldKind::Bool),
        ("bootcamp", FieldKind::ObjectId),
        ("createdAt", FieldKind::Date),
    ];

    fn parse(query: &str) -> QueryParams {
        QueryParams::from_query_string(query, FIELDS)
    }

    #[test]
    fn operators_are_rewritten_and_typed() {
        let q = parse("averageCost[lte]=10000&averageCost[gt]=99.5&housing=true");
        assert_eq!(
            q.filter,
            doc! {
                "averageCost": { "$lte": 10000_i64, "$gt": 99.5 },
                "housing": true,
            }
        );
    }

    #[test]
    fn untyped_fields_stay_strings() {
        let id = ObjectId::new();
        let q = parse(&format!(
            "location.zipcode=02118&phone=5551234&name=true&slug={}",
            id.to_hex()
        ));
        assert_eq!(
            q.filter,
            doc! {
                "location.zipcode": "02118",
                "phone": "5551234",
                "name": "true",
                "slug": id.to_hex(),
            }
        );
    }

    #[test]
    fn typed_field_with_unparseable_value_stays_a_string() {
        let q = parse("averageCost[gte]=cheap&housing=yes&bootcamp=nope");
        assert_eq!(
            q.filter,
            doc! {
                "averageCost": { "$gte": "cheap" },
                "housing": "yes",
                "bootcamp": "nope",
            }
        );
    }

    #[test]
    fn dates_are_parsed_from_rfc3339() {
        let q = parse("createdAt[gte]=2024-01-01T00:00:00Z");
        let expected = BsonDateTime::from_millis(1_704_067_200_000);
        assert_eq!(q.filter, doc! { "createdAt": { "$gte": expected } });
    }

    #[test]
    fn in_operator_splits_on_commas() {
        let q = parse("careers[in]=Business,UI%2FUX");
        assert_eq!(q.filter, doc! { "careers": { "$in": ["Business", "UI/UX"] } });
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let q = parse("select=name,description&sort=-name&page=2&limit=2&city=Boston");
        assert_eq!(q.filter, doc! { "city": "Boston" });
        assert_eq!(q.select, Some(vec!["name".to_string(), "description".to_string()]));
        assert_eq!(q.sort, doc! { "name": -1, "_id": 1 });
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 2);
    }

    #[test]
    fn defaults_when_unspecified_or_garbage() {
        let q = parse("page=abc&limit=0");
        assert_eq!(q.page, DEFAULT_PAGE);
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert_eq!(q.sort, doc! { "createdAt": -1, "_id": 1 });
        assert_eq!(q.select, None);
    }

    #[test]
    fn huge_limit_and_page_are_clamped() {
        let q = parse("limit=18446744073709551615&page=18446744073709551615");
        assert_eq!(q.limit, MAX_LIMIT);
        assert!(q.skip() <= i64::MAX as u64);

        let pipeline = build_pipeline(&q, Populate::None);
        let skip = pipeline[2].get_i64("$skip").unwrap();
        let limit = pipeline[3].get_i64("$limit").unwrap();
        assert!(skip >= 0);
        assert_eq!(limit, MAX_LIMIT as i64);
    }

    #[test]
    fn paginate_survives_extreme_pages() {
        assert_eq!(paginate(u64::MAX, 25, 0), Pagination { next: None, prev: Some(PageRef { page: u64::MAX - 1, limit: 25 }) });
        assert_eq!(paginate(0, 25, 10).prev, None);
        assert_eq!(paginate(u64::MAX, 1, u64::MAX).next, None);
    }

    #[test]
    fn dollar_keys_are_stripped() {
        let q = parse("$where=sleep(1000)&name[$ne]=x&email[regex]=.*");
        assert!(!q.filter.contains_key("$where"));
        assert!(!q.filter.contains_key("name"));
        // Unknown operator is kept literally and matches nothing.
        assert_eq!(q.filter, doc! { "email": { "regex": ".*" } });
    }

    #[test]
    fn dollar_fields_are_dropped_from_sort() {
        let q = parse("sort=$natural,-name,-$where");
        assert_eq!(q.sort, doc! { "name": -1, "_id": 1 });
    }

    #[test]
    fn unknown_operator_reaches_the_match_stage_literally() {
        let q = parse("email[regex]=.*");
        let pipeline = build_pipeline(&q, Populate::None);
        assert_eq!(pipeline[0], doc! { "$match": { "email": { "regex": ".*" } } });
    }

    #[test]
    fn object_ids_are_recognised() {
        let id = ObjectId::new();
        let q = parse(&format!("bootcamp={}", id.to_hex()));
        assert_eq!(q.filter, doc! { "bootcamp": id });
    }

    #[test]
    fn second_page_of_two_over_five_has_both_links() {
        let q = parse("limit=2&page=2");
        assert_eq!(q.skip(), 2); // records 3 and 4

        let p = paginate(q.page, q.limit, 5);
        assert_eq!(p.prev, Some(PageRef { page: 1, limit: 2 }));
        assert_eq!(p.next, Some(PageRef { page: 3, limit: 2 }));
    }

    #[test]
    fn next_absent_once_page_covers_total() {
        let last = paginate(3, 2, 5);
        assert_eq!(last.next, None);
        assert_eq!(last.prev, Some(PageRef { page: 2, limit: 2 }));

        let exact = paginate(2, 2, 4);
        assert_eq!(exact.next, None);

        let first = paginate(1, 25, 5);
        assert_eq!(first, Pagination::default());
    }

    #[test]
    fn pipeline_orders_stages_and_keeps_populated_field_in_projection() {
        let q = parse("select=name&limit=2&page=3");
        let pipeline = build_pipeline(&q, Populate::Courses);

        assert_eq!(pipeline[2], doc! { "$skip": 4_i64 });
        assert_eq!(pipeline[3], doc! { "$limit": 2_i64 });
        assert!(pipeline[4].contains_key("$lookup"));
        assert_eq!(pipeline.last().unwrap(), &doc! { "$project": { "name": 1, "courses": 1 } });
    }

    #[test]
    fn pagination_serializes_only_present_links() {
        let json = serde_json::to_value(paginate(1, 2, 5)).unwrap();
        assert_eq!(json, serde_json::json!({ "next": { "page": 2, "limit": 2 } }));
    }
}
