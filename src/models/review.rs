use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const REVIEWS: &str = "reviews";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[validate(length(min = 1, max = 100, message = "Please add a title for the review"))]
    pub title: String,

    #[validate(length(min = 1, message = "Please add some text"))]
    pub text: String,

    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10"))]
    pub rating: i32,

    pub created_at: BsonDateTime,

    pub bootcamp: ObjectId,

    pub user: ObjectId,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateReviewRequest {
    pub title: String,
    pub text: String,
    pub rating: i32,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateReviewRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i32>,
}

impl UpdateReviewRequest {
    pub fn apply_to(self, review: &mut Review) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(title) = self.title {
            review.title = title;
            changed.push("title");
        }
        if let Some(text) = self.text {
            review.text = text;
            changed.push("text");
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
            changed.push("rating");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_outside_range_is_rejected() {
        let mut review = Review {
            id: None,
            title: "Learned a ton".into(),
            text: "Great instructors".into(),
            rating: 8,
            created_at: BsonDateTime::now(),
            bootcamp: ObjectId::new(),
            user: ObjectId::new(),
        };
        assert!(review.validate().is_ok());

        let changed = UpdateReviewRequest {
            rating: Some(11),
            ..Default::default()
        }
        .apply_to(&mut review);
        assert_eq!(changed, vec!["rating"]);
        assert!(review.validate().is_err());
    }
}
