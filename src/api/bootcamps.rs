use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    config::Settings,
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{CreateBootcampRequest, Role, UpdateBootcampRequest},
    services::{
        advanced_results::advanced_results,
        bootcamp_service::{self, DistanceUnit, BOOTCAMP_RESOURCE},
        geocoder_service::Geocoder,
        upload_service,
    },
    utils::{parse_id, ApiError, ApiResult},
};

pub const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RadiusQuery {
    /// `mi` (default) or `km`
    #[serde(default)]
    pub unit: DistanceUnit,
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps",
    tag = "Bootcamps",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields"),
        ("sort" = Option<String>, Query, description = "Comma separated fields, `-` for descending"),
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 25"),
    ),
    responses(
        (status = 200, description = "Page of bootcamps with their courses")
    )
)]
pub async fn get_bootcamps(db: web::Data<MongoDB>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let query = BOOTCAMP_RESOURCE.query(req.query_string());
    log::info!("📋 GET /bootcamps - page {}, limit {}", query.page, query.limit);

    let results = advanced_results(&db, &BOOTCAMP_RESOURCE, &query).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{id}",
    tag = "Bootcamps",
    params(("id" = String, Path, description = "Bootcamp id")),
    responses(
        (status = 200, description = "Bootcamp found"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Bootcamp not found")
    )
)]
pub async fn get_bootcamp(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let bootcamp = bootcamp_service::find_bootcamp(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": bootcamp.to_json()?
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bootcamps",
    tag = "Bootcamps",
    request_body = CreateBootcampRequest,
    responses(
        (status = 201, description = "Bootcamp created"),
        (status = 400, description = "Validation failed or caller already owns a bootcamp"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_bootcamp(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    geocoder: web::Data<Geocoder>,
    body: web::Json<CreateBootcampRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    log::info!("📝 POST /bootcamps - {} by {}", body.name, caller.id);

    let bootcamp = bootcamp_service::create_bootcamp(&db, &geocoder, &caller, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": bootcamp.to_json()?
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}",
    tag = "Bootcamps",
    params(("id" = String, Path, description = "Bootcamp id")),
    request_body = UpdateBootcampRequest,
    responses(
        (status = 200, description = "Bootcamp updated"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Bootcamp not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_bootcamp(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    geocoder: web::Data<Geocoder>,
    path: web::Path<String>,
    body: web::Json<UpdateBootcampRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let id = parse_id(&path)?;
    log::info!("🔧 PUT /bootcamps/{} by {}", id, caller.id);

    let bootcamp = bootcamp_service::update_bootcamp(&db, &geocoder, &caller, &id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": bootcamp.to_json()?
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bootcamps/{id}",
    tag = "Bootcamps",
    params(("id" = String, Path, description = "Bootcamp id")),
    responses(
        (status = 200, description = "Bootcamp, its courses and reviews deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Bootcamp not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_bootcamp(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let id = parse_id(&path)?;
    log::info!("🗑️ DELETE /bootcamps/{} by {}", id, caller.id);

    bootcamp_service::delete_bootcamp(&db, &caller, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {}
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/radius/{zipcode}/{distance}",
    tag = "Bootcamps",
    params(
        ("zipcode" = String, Path, description = "Postal code at the centre"),
        ("distance" = f64, Path, description = "Radius in `unit`"),
        RadiusQuery
    ),
    responses(
        (status = 200, description = "Bootcamps within the radius"),
        (status = 400, description = "Bad distance or unknown postal code")
    )
)]
pub async fn get_bootcamps_in_radius(
    db: web::Data<MongoDB>,
    geocoder: web::Data<Geocoder>,
    path: web::Path<(String, String)>,
    query: web::Query<RadiusQuery>,
) -> ApiResult<HttpResponse> {
    let (zipcode, distance) = path.into_inner();
    let distance: f64 = distance
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid distance {}", distance)))?;

    log::info!("🌍 GET /bootcamps/radius/{}/{} {:?}", zipcode, distance, query.unit);

    let bootcamps = bootcamp_service::bootcamps_in_radius(&db, &geocoder, &zipcode, distance, query.unit).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": bootcamps.len(),
        "data": bootcamps
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}/photo",
    tag = "Bootcamps",
    params(("id" = String, Path, description = "Bootcamp id")),
    responses(
        (status = 200, description = "Photo stored; `data` is the filename"),
        (status = 400, description = "Missing file, not an image, or too large"),
        (status = 403, description = "Caller is not the owner"),
        (status = 500, description = "Storage failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_photo(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    settings: web::Data<Settings>,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let id = parse_id(&path)?;
    log::info!("📸 PUT /bootcamps/{}/photo by {}", id, caller.id);

    let bootcamp = bootcamp_service::authorize_photo_upload(&db, &caller, &id).await?;
    let upload = upload_service::read_photo(payload, settings.max_file_upload).await?;
    let filename = bootcamp_service::save_photo(&db, &settings, &bootcamp, upload).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": filename
    })))
}
