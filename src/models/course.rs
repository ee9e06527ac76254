use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const COURSES: &str = "courses";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[validate(length(min = 1, max = 100, message = "Please add a course title"))]
    pub title: String,

    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: String,

    #[validate(range(min = 1, message = "Please add number of weeks"))]
    pub weeks: i32,

    #[validate(range(min = 0.0, message = "Tuition cost can not be negative"))]
    pub tuition: f64,

    pub minimum_skill: MinimumSkill,

    #[serde(default)]
    pub scholarship_available: bool,

    pub created_at: BsonDateTime,

    pub bootcamp: ObjectId,

    pub user: ObjectId,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub weeks: i32,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<i32>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<MinimumSkill>,
    pub scholarship_available: Option<bool>,
}

impl UpdateCourseRequest {
    pub fn apply_to(self, course: &mut Course) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(title) = self.title {
            course.title = title;
            changed.push("title");
        }
        if let Some(description) = self.description {
            course.description = description;
            changed.push("description");
        }
        if let Some(weeks) = self.weeks {
            course.weeks = weeks;
            changed.push("weeks");
        }
        if let Some(tuition) = self.tuition {
            course.tuition = tuition;
            changed.push("tuition");
        }
        if let Some(skill) = self.minimum_skill {
            course.minimum_skill = skill;
            changed.push("minimumSkill");
        }
        if let Some(v) = self.scholarship_available {
            course.scholarship_available = v;
            changed.push("scholarshipAvailable");
        }
        changed
    }
}

/// Mean tuition rounded up to the next multiple of ten; `None` when there is nothing to average.
pub fn rounded_average_cost(average_tuition: Option<f64>) -> Option<f64> {
    average_tuition.map(|avg| (avg / 10.0).ceil() * 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Course {
        Course {
            id: None,
            title: "Front End Web Development".into(),
            description: "HTML, CSS and JavaScript".into(),
            weeks: 8,
            tuition: 8000.0,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: true,
            created_at: BsonDateTime::now(),
            bootcamp: ObjectId::new(),
            user: ObjectId::new(),
        }
    }

    #[test]
    fn average_cost_rounds_up_to_tens() {
        assert_eq!(rounded_average_cost(Some(8333.33)), Some(8340.0));
        assert_eq!(rounded_average_cost(Some(9000.0)), Some(9000.0));
        assert_eq!(rounded_average_cost(None), None);
    }

    #[test]
    fn update_then_validate_catches_bad_weeks() {
        let mut course = sample();
        let changed = UpdateCourseRequest {
            weeks: Some(0),
            ..Default::default()
        }
        .apply_to(&mut course);
        assert_eq!(changed, vec!["weeks"]);
        assert!(course.validate().is_err());
    }

    #[test]
    fn minimum_skill_is_an_enum() {
        let parsed: MinimumSkill = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(parsed, MinimumSkill::Advanced);
        assert!(serde_json::from_str::<MinimumSkill>("\"expert\"").is_err());
    }
}
