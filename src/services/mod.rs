pub mod advanced_results;
pub mod auth_service;
pub mod bootcamp_service;
pub mod course_service;
pub mod geocoder_service;
pub mod review_service;
pub mod upload_service;
pub mod user_service;
