use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    config::Settings,
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{
        slugify, Bootcamp, CreateBootcampRequest, GeoLocation, UpdateBootcampRequest, BOOTCAMPS,
        BOOTCAMP_HIDDEN_FIELDS, COURSES, DEFAULT_PHOTO, REVIEWS,
    },
    services::{
        advanced_results::{FieldKind, Populate, Resource},
        geocoder_service::Geocoder,
        upload_service::{self, PhotoUpload},
    },
    utils::{update, ApiError, ApiResult},
};

pub const BOOTCAMP_RESOURCE: Resource = Resource {
    collection: BOOTCAMPS,
    populate: Populate::Courses,
    hidden: BOOTCAMP_HIDDEN_FIELDS,
    fields: &[
        ("_id", FieldKind::ObjectId),
        ("averageCost", FieldKind::Number),
        ("averageRating", FieldKind::Number),
        ("housing", FieldKind::Bool),
        ("jobAssistance", FieldKind::Bool),
        ("jobGuarantee", FieldKind::Bool),
        ("acceptGi", FieldKind::Bool),
        ("user", FieldKind::ObjectId),
        ("createdAt", FieldKind::Date),
    ],
};

pub const EARTH_RADIUS_MILES: f64 = 3963.0;
pub const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Mi,
    Km,
}

impl DistanceUnit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Mi => EARTH_RADIUS_MILES,
            DistanceUnit::Km => EARTH_RADIUS_KM,
        }
    }
}

/// Linear distance on the surface → radians, as `$centerSphere` expects.
pub fn angular_radius(distance: f64, unit: DistanceUnit) -> ApiResult<f64> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(ApiError::BadRequest(format!("Invalid distance {}", distance)));
    }
    Ok(distance / unit.earth_radius())
}

pub fn within_radius_filter(longitude: f64, latitude: f64, radius: f64) -> Document {
    doc! {
        "location": {
            "$geoWithin": {
                "$centerSphere": [[longitude, latitude], radius]
            }
        }
    }
}

fn not_found(id: &ObjectId) -> ApiError {
    ApiError::NotFound(format!("Bootcamp not found with id of {}", id.to_hex()))
}

pub async fn find_bootcamp(db: &MongoDB, id: &ObjectId) -> ApiResult<Bootcamp> {
    db.collection::<Bootcamp>(BOOTCAMPS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| not_found(id))
}

async fn geocode_address(geocoder: &Geocoder, address: &str) -> ApiResult<GeoLocation> {
    Ok(geocoder.geocode(address).await?.into())
}

pub async fn create_bootcamp(
    db: &MongoDB,
    geocoder: &Geocoder,
    caller: &AuthUser,
    request: CreateBootcampRequest,
) -> ApiResult<Bootcamp> {
    request.validate()?;

    let collection = db.collection::<Bootcamp>(BOOTCAMPS);

    if !caller.is_admin() {
        let published = collection.find_one(doc! { "user": caller.id }).await?;
        if published.is_some() {
            return Err(ApiError::BadRequest(format!(
                "The user with ID {} has already published a bootcamp",
                caller.id.to_hex()
            )));
        }
    }

    let location = match request.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => Some(geocode_address(geocoder, address).await?),
        None => None,
    };

    let mut bootcamp = Bootcamp {
        id: None,
        slug: slugify(&request.name),
        name: request.name.trim().to_string(),
        description: request.description,
        website: request.website,
        phone: request.phone,
        email: request.email,
        location,
        careers: request.careers,
        average_rating: None,
        average_cost: None,
        photo: DEFAULT_PHOTO.to_string(),
        housing: request.housing,
        job_assistance: request.job_assistance,
        job_guarantee: request.job_guarantee,
        accept_gi: request.accept_gi,
        created_at: BsonDateTime::now(),
        user: caller.id,
        exclusive_owner: !caller.is_admin(),
    };
    bootcamp.validate()?;

    // A concurrent create by the same owner loses on the partial unique index
    // and surfaces as a duplicate-key BadRequest.
    let result = collection.insert_one(&bootcamp).await?;
    bootcamp.id = result.inserted_id.as_object_id();

    log::info!("✅ Bootcamp created: {} by {}", bootcamp.name, caller.id);
    Ok(bootcamp)
}

pub async fn update_bootcamp(
    db: &MongoDB,
    geocoder: &Geocoder,
    caller: &AuthUser,
    id: &ObjectId,
    mut request: UpdateBootcampRequest,
) -> ApiResult<Bootcamp> {
    let mut bootcamp = find_bootcamp(db, id).await?;
    caller.ensure_owner(&bootcamp.user, "update this bootcamp")?;

    let geocoded = match request.address.take().filter(|a| !a.trim().is_empty()) {
        Some(address) => Some(geocode_address(geocoder, address.trim()).await?),
        None => None,
    };
    let mut changed = request.apply_to(&mut bootcamp);
    if geocoded.is_some() {
        bootcamp.location = geocoded;
        changed.push("location");
    }
    bootcamp.validate()?;

    // averageCost, averageRating and photo are maintained by other writers.
    if !update::update_fields(db, BOOTCAMPS, id, &bootcamp, &changed).await? {
        return Err(not_found(id));
    }

    Ok(bootcamp)
}

/// Removes the bootcamp together with every course and review that references it.
pub async fn delete_bootcamp(db: &MongoDB, caller: &AuthUser, id: &ObjectId) -> ApiResult<()> {
    let bootcamp = find_bootcamp(db, id).await?;
    caller.ensure_owner(&bootcamp.user, "delete this bootcamp")?;

    let courses = db.collection::<Document>(COURSES).delete_many(doc! { "bootcamp": id }).await?;
    let reviews = db.collection::<Document>(REVIEWS).delete_many(doc! { "bootcamp": id }).await?;
    db.collection::<Bootcamp>(BOOTCAMPS).delete_one(doc! { "_id": id }).await?;

    log::info!(
        "🗑️ Bootcamp {} deleted with {} courses and {} reviews",
        id,
        courses.deleted_count,
        reviews.deleted_count
    );
    Ok(())
}

pub async fn bootcamps_in_radius(
    db: &MongoDB,
    geocoder: &Geocoder,
    zipcode: &str,
    distance: f64,
    unit: DistanceUnit,
) -> ApiResult<Vec<Value>> {
    let radius = angular_radius(distance, unit)?;
    let place = geocoder.geocode(zipcode).await?;

    let bootcamps: Vec<Bootcamp> = db
        .collection::<Bootcamp>(BOOTCAMPS)
        .find(within_radius_filter(place.longitude, place.latitude, radius))
        .await?
        .try_collect()
        .await?;

    bootcamps.iter().map(Bootcamp::to_json).collect()
}

/// Ownership is checked before the caller reads the multipart body.
pub async fn authorize_photo_upload(db: &MongoDB, caller: &AuthUser, id: &ObjectId) -> ApiResult<Bootcamp> {
    let bootcamp = find_bootcamp(db, id).await?;
    caller.ensure_owner(&bootcamp.user, "update this bootcamp")?;
    Ok(bootcamp)
}

/// Writes the file first and records the filename only once it is on disk.
pub async fn save_photo(
    db: &MongoDB,
    settings: &Settings,
    bootcamp: &Bootcamp,
    upload: PhotoUpload,
) -> ApiResult<String> {
    let id = bootcamp
        .id
        .ok_or_else(|| ApiError::Internal("Stored bootcamp has no _id".to_string()))?;

    upload_service::validate_photo(&upload, settings.max_file_upload)?;
    let filename = upload_service::photo_filename(&id, &upload.original_name);
    upload_service::store_photo(&settings.file_upload_path, &filename, &upload.bytes).await?;

    db.collection::<Bootcamp>(BOOTCAMPS)
        .update_one(doc! { "_id": id }, doc! { "$set": { "photo": Bson::String(filename.clone()) } })
        .await?;

    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miles_and_kilometres_use_matching_earth_radius() {
        assert_eq!(angular_radius(3963.0, DistanceUnit::Mi).unwrap(), 1.0);
        assert_eq!(angular_radius(6378.0, DistanceUnit::Km).unwrap(), 1.0);
        let r = angular_radius(100.0, DistanceUnit::Mi).unwrap();
        assert!((r - 100.0 / 3963.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_distance_is_a_zero_radius_cap() {
        assert_eq!(angular_radius(0.0, DistanceUnit::Mi).unwrap(), 0.0);
    }

    #[test]
    fn negative_or_nan_distance_is_rejected() {
        assert!(matches!(angular_radius(-1.0, DistanceUnit::Mi), Err(ApiError::BadRequest(_))));
        assert!(angular_radius(f64::NAN, DistanceUnit::Km).is_err());
    }

    #[test]
    fn center_sphere_takes_longitude_first() {
        let filter = within_radius_filter(-71.1, 42.35, 0.025);
        let sphere = filter
            .get_document("location")
            .unwrap()
            .get_document("$geoWithin")
            .unwrap()
            .get_array("$centerSphere")
            .unwrap();
        assert_eq!(sphere[0], Bson::Array(vec![Bson::Double(-71.1), Bson::Double(42.35)]));
        assert_eq!(sphere[1], Bson::Double(0.025));
    }

    #[test]
    fn unit_parses_from_query() {
        let unit: DistanceUnit = serde_json::from_str("\"km\"").unwrap();
        assert_eq!(unit, DistanceUnit::Km);
        assert_eq!(DistanceUnit::default(), DistanceUnit::Mi);
    }
}
