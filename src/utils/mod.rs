// Utility functions
pub mod error;
pub mod json;
pub mod update;

pub use error::*;

use mongodb::bson::oid::ObjectId;

/// Path ids that are not valid ObjectIds are a client error, not a miss.
pub fn parse_id(raw: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Malformed id {}", raw)))
}
