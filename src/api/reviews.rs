use actix_web::{web, HttpRequest, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{CreateReviewRequest, Role, UpdateReviewRequest},
    services::{
        advanced_results::advanced_results,
        review_service::{self, REVIEW_RESOURCE},
    },
    utils::{json, parse_id, ApiResult},
};

pub const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    tag = "Reviews",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields"),
        ("sort" = Option<String>, Query, description = "Comma separated fields, `-` for descending"),
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 25"),
    ),
    responses(
        (status = 200, description = "Page of reviews with their bootcamp summary")
    )
)]
pub async fn get_reviews(db: web::Data<MongoDB>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let query = REVIEW_RESOURCE.query(req.query_string());
    log::info!("📋 GET /reviews - page {}, limit {}", query.page, query.limit);

    let results = advanced_results(&db, &REVIEW_RESOURCE, &query).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{bootcampId}/reviews",
    tag = "Reviews",
    params(("bootcampId" = String, Path, description = "Bootcamp id")),
    responses(
        (status = 200, description = "All reviews of the bootcamp")
    )
)]
pub async fn get_bootcamp_reviews(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let bootcamp_id = parse_id(&path)?;
    log::info!("📋 GET /bootcamps/{}/reviews", bootcamp_id);

    let reviews = review_service::reviews_for_bootcamp(&db, &bootcamp_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": reviews.len(),
        "data": reviews
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review with its bootcamp summary"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn get_review(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let review = review_service::get_review(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": review
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bootcamps/{bootcampId}/reviews",
    tag = "Reviews",
    params(("bootcampId" = String, Path, description = "Bootcamp id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created"),
        (status = 400, description = "Invalid review or bootcamp already reviewed by caller"),
        (status = 404, description = "Bootcamp not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_review(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<CreateReviewRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(REVIEWERS)?;
    let bootcamp_id = parse_id(&path)?;
    log::info!("📝 POST /bootcamps/{}/reviews by {}", bootcamp_id, caller.id);

    let review = review_service::create_review(&db, &caller, &bootcamp_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": json::model_to_json(&review)?
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/reviews/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_review(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateReviewRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(REVIEWERS)?;
    let id = parse_id(&path)?;
    log::info!("🔧 PUT /reviews/{} by {}", id, caller.id);

    let review = review_service::update_review(&db, &caller, &id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": json::model_to_json(&review)?
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_review(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    caller.require_role(REVIEWERS)?;
    let id = parse_id(&path)?;
    log::info!("🗑️ DELETE /reviews/{} by {}", id, caller.id);

    review_service::delete_review(&db, &caller, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {}
    })))
}
