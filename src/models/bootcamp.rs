use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::{json, ApiResult};

pub const BOOTCAMPS: &str = "bootcamps";

pub const BOOTCAMP_HIDDEN_FIELDS: &[&str] = &["exclusiveOwner"];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

/// GeoJSON point plus the address pieces the geocoder returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        GeoLocation {
            kind: "Point".to_string(),
            coordinates: vec![longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[validate(
        custom(function = non_blank),
        length(max = 50, message = "Name can not be more than 50 characters")
    )]
    pub name: String,

    pub slug: String,

    #[validate(length(max = 500, message = "Description can not be more than 500 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[validate(email(message = "Please add a valid email"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,

    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Vec<Career>,

    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,

    #[serde(default = "default_photo")]
    pub photo: String,

    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,

    pub created_at: BsonDateTime,

    /// Owner
    pub user: ObjectId,

    /// Set for bootcamps created by non-admins; backs the partial unique index on `user`.
    #[serde(default)]
    pub exclusive_owner: bool,
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

impl Bootcamp {
    pub fn to_json(&self) -> ApiResult<serde_json::Value> {
        let mut value = json::model_to_json(self)?;
        json::strip_fields(&mut value, BOOTCAMP_HIDDEN_FIELDS);
        Ok(value)
    }
}

/// Lowercase, ASCII-alphanumeric words joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Please add a name".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcampRequest {
    #[validate(custom(function = non_blank))]
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Free-form address, geocoded into `location`
    pub address: Option<String>,
    pub careers: Vec<Career>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcampRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<Career>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl UpdateBootcampRequest {
    /// Merges the provided fields and returns their stored names; the caller
    /// re-validates the result. `address` is geocoded by the service.
    pub fn apply_to(self, bootcamp: &mut Bootcamp) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = self.name {
            bootcamp.slug = slugify(&name);
            bootcamp.name = name;
            changed.extend(["name", "slug"]);
        }
        if self.description.is_some() {
            bootcamp.description = self.description;
            changed.push("description");
        }
        if self.website.is_some() {
            bootcamp.website = self.website;
            changed.push("website");
        }
        if self.phone.is_some() {
            bootcamp.phone = self.phone;
            changed.push("phone");
        }
        if self.email.is_some() {
            bootcamp.email = self.email;
            changed.push("email");
        }
        if let Some(careers) = self.careers {
            bootcamp.careers = careers;
            changed.push("careers");
        }
        if let Some(v) = self.housing {
            bootcamp.housing = v;
            changed.push("housing");
        }
        if let Some(v) = self.job_assistance {
            bootcamp.job_assistance = v;
            changed.push("jobAssistance");
        }
        if let Some(v) = self.job_guarantee {
            bootcamp.job_guarantee = v;
            changed.push("jobGuarantee");
        }
        if let Some(v) = self.accept_gi {
            bootcamp.accept_gi = v;
            changed.push("acceptGi");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(owner: ObjectId) -> Bootcamp {
        Bootcamp {
            id: Some(ObjectId::new()),
            name: "Devworks Bootcamp".into(),
            slug: slugify("Devworks Bootcamp"),
            description: None,
            website: None,
            phone: None,
            email: None,
            location: None,
            careers: vec![Career::WebDevelopment],
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.into(),
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
            created_at: BsonDateTime::now(),
            user: owner,
            exclusive_owner: true,
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  UI/UX -- Academy!! "), "ui-ux-academy");
        assert_eq!(slugify("ModernTech"), "moderntech");
    }

    #[test]
    fn careers_use_display_names() {
        let json = serde_json::to_value(vec![Career::WebDevelopment, Career::UiUx]).unwrap();
        assert_eq!(json, serde_json::json!(["Web Development", "UI/UX"]));
        let parsed: Career = serde_json::from_str("\"Data Science\"").unwrap();
        assert_eq!(parsed, Career::DataScience);
        assert!(serde_json::from_str::<Career>("\"Cooking\"").is_err());
    }

    #[test]
    fn validation_rejects_long_names_and_empty_careers() {
        let mut bootcamp = sample(ObjectId::new());
        assert!(bootcamp.validate().is_ok());

        bootcamp.name = "x".repeat(51);
        assert!(bootcamp.validate().is_err());

        let mut bootcamp = sample(ObjectId::new());
        bootcamp.careers.clear();
        assert!(bootcamp.validate().is_err());

        let mut bootcamp = sample(ObjectId::new());
        bootcamp.website = Some("not a url".into());
        assert!(bootcamp.validate().is_err());
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let mut bootcamp = sample(ObjectId::new());
        let changed = UpdateBootcampRequest {
            name: Some("New Name".into()),
            housing: Some(true),
            ..Default::default()
        }
        .apply_to(&mut bootcamp);

        assert_eq!(changed, vec!["name", "slug", "housing"]);

        assert_eq!(bootcamp.name, "New Name");
        assert_eq!(bootcamp.slug, "new-name");
        assert!(bootcamp.housing);
        assert_eq!(bootcamp.careers, vec![Career::WebDevelopment]);
    }

    #[test]
    fn json_hides_internal_flags_and_exposes_id() {
        let bootcamp = sample(ObjectId::new());
        let json = bootcamp.to_json().unwrap();
        assert!(json.get("exclusiveOwner").is_none());
        assert_eq!(json["_id"], bootcamp.id.unwrap().to_hex());
        assert_eq!(json["photo"], "no-photo.jpg");
        assert_eq!(json["careers"][0], "Web Development");
    }
}
