pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod reviews;
pub mod swagger;
pub mod users;

use actix_web::web;

use crate::{middleware::auth::Protect, models::Role, utils::ApiError};

/// Body, path and query extraction failures answer with the usual error envelope.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                // Auth endpoints
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/logout", web::get().to(auth::logout))
                        .route("/me", web::get().to(auth::get_me))
                        .route("/updatedetails", web::put().to(auth::update_details))
                        .route("/updatepassword", web::put().to(auth::update_password))
                        .route("/forgotpassword", web::post().to(auth::forgot_password))
                        .route("/resetpassword/{resettoken}", web::put().to(auth::reset_password)),
                )
                // Bootcamps, plus the nested course and review collections
                .service(
                    web::scope("/bootcamps")
                        .route("", web::get().to(bootcamps::get_bootcamps))
                        .route("", web::post().to(bootcamps::create_bootcamp))
                        .route("/radius/{zipcode}/{distance}", web::get().to(bootcamps::get_bootcamps_in_radius))
                        .route("/{id}", web::get().to(bootcamps::get_bootcamp))
                        .route("/{id}", web::put().to(bootcamps::update_bootcamp))
                        .route("/{id}", web::delete().to(bootcamps::delete_bootcamp))
                        .route("/{id}/photo", web::put().to(bootcamps::upload_photo))
                        .route("/{bootcamp_id}/courses", web::get().to(courses::get_bootcamp_courses))
                        .route("/{bootcamp_id}/courses", web::post().to(courses::add_course))
                        .route("/{bootcamp_id}/reviews", web::get().to(reviews::get_bootcamp_reviews))
                        .route("/{bootcamp_id}/reviews", web::post().to(reviews::add_review)),
                )
                .service(
                    web::scope("/courses")
                        .route("", web::get().to(courses::get_courses))
                        .route("/{id}", web::get().to(courses::get_course))
                        .route("/{id}", web::put().to(courses::update_course))
                        .route("/{id}", web::delete().to(courses::delete_course)),
                )
                .service(
                    web::scope("/reviews")
                        .route("", web::get().to(reviews::get_reviews))
                        .route("/{id}", web::get().to(reviews::get_review))
                        .route("/{id}", web::put().to(reviews::update_review))
                        .route("/{id}", web::delete().to(reviews::delete_review)),
                )
                // Users: admin only
                .service(
                    web::scope("/users")
                        .wrap(Protect::authorize(&[Role::Admin]))
                        .route("", web::get().to(users::get_users))
                        .route("", web::post().to(users::create_user))
                        .route("/{id}", web::get().to(users::get_user))
                        .route("/{id}", web::put().to(users::update_user))
                        .route("/{id}", web::delete().to(users::delete_user)),
                ),
        );
}
