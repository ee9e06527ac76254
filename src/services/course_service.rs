use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use serde_json::Value;
use validator::Validate;

use crate::{
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{rounded_average_cost, Course, CreateCourseRequest, UpdateCourseRequest, BOOTCAMPS, COURSES},
    services::{
        advanced_results::{self, FieldKind, Populate, Resource},
        bootcamp_service,
    },
    utils::{json, update, ApiError, ApiResult},
};

pub const COURSE_RESOURCE: Resource = Resource {
    collection: COURSES,
    populate: Populate::BootcampSummary,
    hidden: &[],
    fields: &[
        ("_id", FieldKind::ObjectId),
        ("weeks", FieldKind::Number),
        ("tuition", FieldKind::Number),
        ("scholarshipAvailable", FieldKind::Bool),
        ("bootcamp", FieldKind::ObjectId),
        ("user", FieldKind::ObjectId),
        ("createdAt", FieldKind::Date),
    ],
};

async fn find_course(db: &MongoDB, id: &ObjectId) -> ApiResult<Course> {
    db.collection::<Course>(COURSES)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No course with the id of {}", id.to_hex())))
}

pub async fn get_course(db: &MongoDB, id: &ObjectId) -> ApiResult<Value> {
    advanced_results::find_populated(db, &COURSE_RESOURCE, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No course with the id of {}", id.to_hex())))
}

pub async fn courses_for_bootcamp(db: &MongoDB, bootcamp_id: &ObjectId) -> ApiResult<Vec<Value>> {
    let courses: Vec<Course> = db
        .collection::<Course>(COURSES)
        .find(doc! { "bootcamp": bootcamp_id })
        .await?
        .try_collect()
        .await?;

    courses.iter().map(json::model_to_json).collect()
}

/// Recomputes `averageCost` on the bootcamp; unset when it has no courses left.
fn average_cost_pipeline(bootcamp_id: &ObjectId) -> Vec<Document> {
    vec![
        doc! { "$match": { "bootcamp": bootcamp_id } },
        doc! { "$group": { "_id": "$bootcamp", "averageCost": { "$avg": "$tuition" } } },
    ]
}

/// The bootcamp's `averageCost` drops out entirely once its last course is gone.
fn average_cost_update(average_tuition: Option<f64>) -> Document {
    match rounded_average_cost(average_tuition) {
        Some(cost) => doc! { "$set": { "averageCost": cost } },
        None => doc! { "$unset": { "averageCost": "" } },
    }
}

pub async fn update_average_cost(db: &MongoDB, bootcamp_id: &ObjectId) -> ApiResult<()> {
    let mut cursor = db
        .collection::<Course>(COURSES)
        .aggregate(average_cost_pipeline(bootcamp_id))
        .await?;
    let average = cursor
        .try_next()
        .await?
        .and_then(|d| d.get_f64("averageCost").ok());

    let update = average_cost_update(average);
    db.collection::<Document>(BOOTCAMPS)
        .update_one(doc! { "_id": bootcamp_id }, update)
        .await?;
    Ok(())
}

pub async fn create_course(
    db: &MongoDB,
    caller: &AuthUser,
    bootcamp_id: &ObjectId,
    request: CreateCourseRequest,
) -> ApiResult<Course> {
    let bootcamp = bootcamp_service::find_bootcamp(db, bootcamp_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::NotFound(format!("No bootcamp with the id of {}", bootcamp_id.to_hex())),
            other => other,
        })?;
    caller.ensure_owner(&bootcamp.user, &format!("add a course to bootcamp {}", bootcamp_id.to_hex()))?;

    let mut course = Course {
        id: None,
        title: request.title.trim().to_string(),
        description: request.description,
        weeks: request.weeks,
        tuition: request.tuition,
        minimum_skill: request.minimum_skill,
        scholarship_available: request.scholarship_available,
        created_at: BsonDateTime::now(),
        bootcamp: *bootcamp_id,
        user: caller.id,
    };
    course.validate()?;

    let result = db.collection::<Course>(COURSES).insert_one(&course).await?;
    course.id = result.inserted_id.as_object_id();

    update_average_cost(db, bootcamp_id).await?;
    Ok(course)
}

pub async fn update_course(
    db: &MongoDB,
    caller: &AuthUser,
    id: &ObjectId,
    request: UpdateCourseRequest,
) -> ApiResult<Course> {
    let mut course = find_course(db, id).await?;
    caller.ensure_owner(&course.user, &format!("update course {}", id.to_hex()))?;

    let changed = request.apply_to(&mut course);
    course.validate()?;

    if !update::update_fields(db, COURSES, id, &course, &changed).await? {
        return Err(ApiError::NotFound(format!("No course with the id of {}", id.to_hex())));
    }

    update_average_cost(db, &course.bootcamp).await?;
    Ok(course)
}

pub async fn delete_course(db: &MongoDB, caller: &AuthUser, id: &ObjectId) -> ApiResult<()> {
    let course = find_course(db, id).await?;
    caller.ensure_owner(&course.user, &format!("delete course {}", id.to_hex()))?;

    db.collection::<Course>(COURSES).delete_one(doc! { "_id": id }).await?;
    update_average_cost(db, &course.bootcamp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_cost_groups_tuition_of_one_bootcamp() {
        let id = ObjectId::new();
        assert_eq!(
            average_cost_pipeline(&id),
            vec![
                doc! { "$match": { "bootcamp": id } },
                doc! { "$group": { "_id": "$bootcamp", "averageCost": { "$avg": "$tuition" } } },
            ]
        );
    }

    #[test]
    fn average_cost_is_rounded_up_when_set() {
        assert_eq!(average_cost_update(Some(8333.33)), doc! { "$set": { "averageCost": 8340.0 } });
    }

    #[test]
    fn average_cost_is_unset_without_courses() {
        assert_eq!(average_cost_update(None), doc! { "$unset": { "averageCost": "" } });
    }
}
