use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use validator::Validate;

use crate::{
    database::MongoDB,
    models::{CreateUserRequest, UpdateUserRequest, User, USERS, USER_HIDDEN_FIELDS},
    services::{
        advanced_results::{FieldKind, Populate, Resource},
        auth_service,
    },
    utils::{update, ApiError, ApiResult},
};

pub const USER_RESOURCE: Resource = Resource {
    collection: USERS,
    populate: Populate::None,
    hidden: USER_HIDDEN_FIELDS,
    fields: &[("_id", FieldKind::ObjectId), ("createdAt", FieldKind::Date)],
};

pub async fn get_user(db: &MongoDB, id: &ObjectId) -> ApiResult<User> {
    auth_service::find_user(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id of {}", id.to_hex())))
}

pub async fn create_user(db: &MongoDB, request: CreateUserRequest) -> ApiResult<User> {
    request.validate()?;

    let mut user = User {
        id: None,
        name: request.name,
        email: request.email.to_lowercase(),
        role: request.role,
        password: auth_service::hash_password(request.password).await?,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: BsonDateTime::now(),
    };

    let result = db.collection::<User>(USERS).insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();
    Ok(user)
}

pub async fn update_user(db: &MongoDB, id: &ObjectId, request: UpdateUserRequest) -> ApiResult<User> {
    request.validate()?;
    let mut user = get_user(db, id).await?;
    let mut changed = Vec::new();

    if let Some(name) = request.name {
        user.name = name;
        changed.push("name");
    }
    if let Some(email) = request.email {
        user.email = email.to_lowercase();
        changed.push("email");
    }
    if let Some(role) = request.role {
        user.role = role;
        changed.push("role");
    }
    if let Some(password) = request.password {
        user.password = auth_service::hash_password(password).await?;
        changed.push("password");
    }
    user.validate()?;

    if !update::update_fields(db, USERS, id, &user, &changed).await? {
        return Err(ApiError::NotFound(format!("User not found with id of {}", id.to_hex())));
    }
    Ok(user)
}

pub async fn delete_user(db: &MongoDB, id: &ObjectId) -> ApiResult<()> {
    let result = db.collection::<User>(USERS).delete_one(doc! { "_id": id }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound(format!("User not found with id of {}", id.to_hex())));
    }
    Ok(())
}
