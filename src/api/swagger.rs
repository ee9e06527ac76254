use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DevCamper API",
        version = "1.0.0",
        description = "Bootcamp directory API. \n\n**Authentication:** Mutating endpoints require a JWT, sent as a Bearer token or the `token` cookie.\n\n**Features:**\n- Bootcamps with geocoded locations and radius search\n- Courses and reviews with aggregate cost and rating\n- Filtering, field selection, sorting and pagination on every listing\n- Role based access (user, publisher, admin)",
        contact(
            name = "DevCamper Team",
            email = "support@devcamper.io"
        )
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::get_me,
        crate::api::auth::update_details,
        crate::api::auth::update_password,
        crate::api::auth::forgot_password,
        crate::api::auth::reset_password,

        // Health
        crate::api::health::health_check,

        // Bootcamps
        crate::api::bootcamps::get_bootcamps,
        crate::api::bootcamps::get_bootcamp,
        crate::api::bootcamps::create_bootcamp,
        crate::api::bootcamps::update_bootcamp,
        crate::api::bootcamps::delete_bootcamp,
        crate::api::bootcamps::get_bootcamps_in_radius,
        crate::api::bootcamps::upload_photo,

        // Courses
        crate::api::courses::get_courses,
        crate::api::courses::get_bootcamp_courses,
        crate::api::courses::get_course,
        crate::api::courses::add_course,
        crate::api::courses::update_course,
        crate::api::courses::delete_course,

        // Reviews
        crate::api::reviews::get_reviews,
        crate::api::reviews::get_bootcamp_reviews,
        crate::api::reviews::get_review,
        crate::api::reviews::add_review,
        crate::api::reviews::update_review,
        crate::api::reviews::delete_review,

        // Users
        crate::api::users::get_users,
        crate::api::users::get_user,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
    ),
    components(
        schemas(
            // Auth
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::UpdateDetailsRequest,
            crate::models::UpdatePasswordRequest,
            crate::models::ForgotPasswordRequest,
            crate::models::ResetPasswordRequest,
            crate::models::Role,
            crate::api::auth::TokenResponse,

            // Health
            crate::api::health::HealthResponse,

            // Bootcamps
            crate::models::Career,
            crate::models::CreateBootcampRequest,
            crate::models::UpdateBootcampRequest,
            crate::services::bootcamp_service::DistanceUnit,

            // Courses
            crate::models::MinimumSkill,
            crate::models::CreateCourseRequest,
            crate::models::UpdateCourseRequest,

            // Reviews
            crate::models::CreateReviewRequest,
            crate::models::UpdateReviewRequest,

            // Users
            crate::models::CreateUserRequest,
            crate::models::UpdateUserRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, cookie/bearer tokens and password reset."),
        (name = "Health", description = "Liveness and database connectivity."),
        (name = "Bootcamps", description = "Bootcamp CRUD, radius search and photo upload. Publishers own at most one bootcamp."),
        (name = "Courses", description = "Courses belong to a bootcamp and drive its average cost."),
        (name = "Reviews", description = "One review per user per bootcamp; drives the average rating."),
        (name = "Users", description = "Admin-only user management."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from /auth/login or /auth/register"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/v1/auth/login",
            "/api/v1/bootcamps",
            "/api/v1/bootcamps/radius/{zipcode}/{distance}",
            "/api/v1/bootcamps/{id}/photo",
            "/api/v1/bootcamps/{bootcampId}/courses",
            "/api/v1/reviews/{id}",
            "/api/v1/users",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
    }
}
