//! Admin user management. Mounted behind `Protect::authorize(&[Role::Admin])`.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::{
    database::MongoDB,
    models::{CreateUserRequest, UpdateUserRequest},
    services::{
        advanced_results::advanced_results,
        user_service::{self, USER_RESOURCE},
    },
    utils::{parse_id, ApiResult},
};

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "Page of users"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_users(db: web::Data<MongoDB>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let query = USER_RESOURCE.query(req.query_string());
    log::info!("📋 GET /users - page {}, limit {}", query.page, query.limit);

    let results = advanced_results(&db, &USER_RESOURCE, &query).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User found"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let user = user_service::get_user(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": user.to_public_json()?
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid request or email taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(db: web::Data<MongoDB>, body: web::Json<CreateUserRequest>) -> ApiResult<HttpResponse> {
    log::info!("📝 POST /users - email: {}", body.email);

    let user = user_service::create_user(&db, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": user.to_public_json()?
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    log::info!("🔧 PUT /users/{}", id);

    let user = user_service::update_user(&db, &id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": user.to_public_json()?
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    log::info!("🗑️ DELETE /users/{}", id);

    user_service::delete_user(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {}
    })))
}
