use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use serde_json::Value;
use validator::Validate;

use crate::{
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{CreateReviewRequest, Review, UpdateReviewRequest, BOOTCAMPS, REVIEWS},
    services::{
        advanced_results::{self, FieldKind, Populate, Resource},
        bootcamp_service,
    },
    utils::{json, update, ApiError, ApiResult},
};

pub const REVIEW_RESOURCE: Resource = Resource {
    collection: REVIEWS,
    populate: Populate::BootcampSummary,
    hidden: &[],
    fields: &[
        ("_id", FieldKind::ObjectId),
        ("rating", FieldKind::Number),
        ("bootcamp", FieldKind::ObjectId),
        ("user", FieldKind::ObjectId),
        ("createdAt", FieldKind::Date),
    ],
};

fn not_found(id: &ObjectId) -> ApiError {
    ApiError::NotFound(format!("No review found with the id of {}", id.to_hex()))
}

async fn find_review(db: &MongoDB, id: &ObjectId) -> ApiResult<Review> {
    db.collection::<Review>(REVIEWS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn get_review(db: &MongoDB, id: &ObjectId) -> ApiResult<Value> {
    advanced_results::find_populated(db, &REVIEW_RESOURCE, id)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn reviews_for_bootcamp(db: &MongoDB, bootcamp_id: &ObjectId) -> ApiResult<Vec<Value>> {
    let reviews: Vec<Review> = db
        .collection::<Review>(REVIEWS)
        .find(doc! { "bootcamp": bootcamp_id })
        .await?
        .try_collect()
        .await?;

    reviews.iter().map(json::model_to_json).collect()
}

/// Recomputes `averageRating` on the bootcamp; unset when no reviews remain.
fn average_rating_pipeline(bootcamp_id: &ObjectId) -> Vec<Document> {
    vec![
        doc! { "$match": { "bootcamp": bootcamp_id } },
        doc! { "$group": { "_id": "$bootcamp", "averageRating": { "$avg": "$rating" } } },
    ]
}

fn average_rating_update(average: Option<f64>) -> Document {
    match average {
        Some(rating) => doc! { "$set": { "averageRating": rating } },
        None => doc! { "$unset": { "averageRating": "" } },
    }
}

pub async fn update_average_rating(db: &MongoDB, bootcamp_id: &ObjectId) -> ApiResult<()> {
    let mut cursor = db
        .collection::<Review>(REVIEWS)
        .aggregate(average_rating_pipeline(bootcamp_id))
        .await?;
    let average = cursor
        .try_next()
        .await?
        .and_then(|d| d.get_f64("averageRating").ok());

    let update = average_rating_update(average);
    db.collection::<Document>(BOOTCAMPS)
        .update_one(doc! { "_id": bootcamp_id }, update)
        .await?;
    Ok(())
}

pub async fn create_review(
    db: &MongoDB,
    caller: &AuthUser,
    bootcamp_id: &ObjectId,
    request: CreateReviewRequest,
) -> ApiResult<Review> {
    bootcamp_service::find_bootcamp(db, bootcamp_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::NotFound(format!("No bootcamp with the id of {}", bootcamp_id.to_hex())),
            other => other,
        })?;

    let collection = db.collection::<Review>(REVIEWS);
    let existing = collection
        .find_one(doc! { "bootcamp": bootcamp_id, "user": caller.id })
        .await?;
    if existing.is_some() {
        return Err(ApiError::BadRequest(format!(
            "User {} has already reviewed bootcamp {}",
            caller.id.to_hex(),
            bootcamp_id.to_hex()
        )));
    }

    let mut review = Review {
        id: None,
        title: request.title.trim().to_string(),
        text: request.text,
        rating: request.rating,
        created_at: BsonDateTime::now(),
        bootcamp: *bootcamp_id,
        user: caller.id,
    };
    review.validate()?;

    let result = collection.insert_one(&review).await?;
    review.id = result.inserted_id.as_object_id();

    update_average_rating(db, bootcamp_id).await?;
    Ok(review)
}

pub async fn update_review(
    db: &MongoDB,
    caller: &AuthUser,
    id: &ObjectId,
    request: UpdateReviewRequest,
) -> ApiResult<Review> {
    let mut review = find_review(db, id).await?;
    caller.ensure_owner(&review.user, &format!("update review {}", id.to_hex()))?;

    let changed = request.apply_to(&mut review);
    review.validate()?;

    if !update::update_fields(db, REVIEWS, id, &review, &changed).await? {
        return Err(not_found(id));
    }

    update_average_rating(db, &review.bootcamp).await?;
    Ok(review)
}

pub async fn delete_review(db: &MongoDB, caller: &AuthUser, id: &ObjectId) -> ApiResult<()> {
    let review = find_review(db, id).await?;
    caller.ensure_owner(&review.user, &format!("delete review {}", id.to_hex()))?;

    db.collection::<Review>(REVIEWS).delete_one(doc! { "_id": id }).await?;
    update_average_rating(db, &review.bootcamp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rating_groups_ratings_of_one_bootcamp() {
        let id = ObjectId::new();
        assert_eq!(
            average_rating_pipeline(&id),
            vec![
                doc! { "$match": { "bootcamp": id } },
                doc! { "$group": { "_id": "$bootcamp", "averageRating": { "$avg": "$rating" } } },
            ]
        );
    }

    #[test]
    fn average_rating_is_stored_unrounded() {
        assert_eq!(average_rating_update(Some(7.5)), doc! { "$set": { "averageRating": 7.5 } });
    }

    #[test]
    fn average_rating_is_unset_without_reviews() {
        assert_eq!(average_rating_update(None), doc! { "$unset": { "averageRating": "" } });
    }
}
