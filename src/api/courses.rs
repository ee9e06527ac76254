use actix_web::{web, HttpRequest, HttpResponse};

use crate::{
    api::bootcamps::PUBLISHERS,
    database::MongoDB,
    middleware::auth::AuthUser,
    models::{CreateCourseRequest, UpdateCourseRequest},
    services::{
        advanced_results::advanced_results,
        course_service::{self, COURSE_RESOURCE},
    },
    utils::{json, parse_id, ApiResult},
};

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    tag = "Courses",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields"),
        ("sort" = Option<String>, Query, description = "Comma separated fields, `-` for descending"),
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 25"),
    ),
    responses(
        (status = 200, description = "Page of courses with their bootcamp summary")
    )
)]
pub async fn get_courses(db: web::Data<MongoDB>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let query = COURSE_RESOURCE.query(req.query_string());
    log::info!("📋 GET /courses - page {}, limit {}", query.page, query.limit);

    let results = advanced_results(&db, &COURSE_RESOURCE, &query).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{bootcampId}/courses",
    tag = "Courses",
    params(("bootcampId" = String, Path, description = "Bootcamp id")),
    responses(
        (status = 200, description = "All courses of the bootcamp")
    )
)]
pub async fn get_bootcamp_courses(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let bootcamp_id = parse_id(&path)?;
    log::info!("📋 GET /bootcamps/{}/courses", bootcamp_id);

    let courses = course_service::courses_for_bootcamp(&db, &bootcamp_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": courses.len(),
        "data": courses
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course with its bootcamp summary"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(db: web::Data<MongoDB>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let course = course_service::get_course(&db, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": course
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bootcamps/{bootcampId}/courses",
    tag = "Courses",
    params(("bootcampId" = String, Path, description = "Bootcamp id")),
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created"),
        (status = 403, description = "Caller does not own the bootcamp"),
        (status = 404, description = "Bootcamp not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_course(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<CreateCourseRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let bootcamp_id = parse_id(&path)?;
    log::info!("📝 POST /bootcamps/{}/courses - {} by {}", bootcamp_id, body.title, caller.id);

    let course = course_service::create_course(&db, &caller, &bootcamp_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": json::model_to_json(&course)?
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = String, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateCourseRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let id = parse_id(&path)?;
    log::info!("🔧 PUT /courses/{} by {}", id, caller.id);

    let course = course_service::update_course(&db, &caller, &id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": json::model_to_json(&course)?
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_course(
    caller: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    caller.require_role(PUBLISHERS)?;
    let id = parse_id(&path)?;
    log::info!("🗑️ DELETE /courses/{} by {}", id, caller.id);

    course_service::delete_course(&db, &caller, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {}
    })))
}
