use actix_web::web;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Settings,
    database::MongoDB,
    models::{
        ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, Role,
        UpdateDetailsRequest, UpdatePasswordRequest, User, USERS,
    },
    utils::{update, ApiError, ApiResult},
};

const RESET_TOKEN_TTL_MINUTES: i64 = 10;
const RESET_FIELDS: &[&str] = &["resetPasswordToken", "resetPasswordExpire"];

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

pub fn generate_jwt(user_id: &ObjectId, role: Role, settings: &Settings) -> ApiResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_hex(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(settings.jwt_expire_days)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )?)
}

/// Signature and expiry check; any failure is reported as Unauthorized.
pub fn verify_token(token: &str, secret: &str) -> ApiResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            log::warn!("❌ Invalid token: {}", e);
            ApiError::not_authorized_route()
        })
}

pub async fn hash_password(plain: String) -> ApiResult<String> {
    web::block(move || hash(plain, DEFAULT_COST))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

pub async fn verify_password(plain: String, hashed: String) -> ApiResult<bool> {
    web::block(move || verify(plain, &hashed))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

/// Returns `(token for the user, digest to store)`.
pub fn generate_reset_token() -> (String, String) {
    let token = Uuid::new_v4().simple().to_string();
    let digest = hash_reset_token(&token);
    (token, digest)
}

pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

pub async fn find_user(db: &MongoDB, id: &ObjectId) -> ApiResult<Option<User>> {
    Ok(db.collection::<User>(USERS).find_one(doc! { "_id": id }).await?)
}

async fn save_user(db: &MongoDB, user: &User, fields: &[&str]) -> ApiResult<()> {
    let id = user
        .id
        .ok_or_else(|| ApiError::Internal("Cannot save user without _id".to_string()))?;
    if !update::update_fields(db, USERS, &id, user, fields).await? {
        return Err(ApiError::not_authorized_route());
    }
    Ok(())
}

pub async fn register(db: &MongoDB, request: RegisterRequest) -> ApiResult<User> {
    request.validate()?;

    let role = request.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(ApiError::BadRequest("Role admin can not be self-assigned".to_string()));
    }

    let mut user = User {
        id: None,
        name: request.name,
        email: request.email.to_lowercase(),
        role,
        password: hash_password(request.password).await?,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: BsonDateTime::now(),
    };

    let result = db.collection::<User>(USERS).insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();

    log::info!("✅ User registered: {}", user.email);
    Ok(user)
}

pub async fn login(db: &MongoDB, request: LoginRequest) -> ApiResult<User> {
    let (email, password) = match (request.email, request.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide an email and password".to_string(),
            ))
        }
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = db
        .collection::<User>(USERS)
        .find_one(doc! { "email": email.to_lowercase() })
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, user.password.clone()).await? {
        return Err(invalid());
    }

    Ok(user)
}

pub async fn update_details(db: &MongoDB, mut user: User, request: UpdateDetailsRequest) -> ApiResult<User> {
    request.validate()?;

    let mut changed = Vec::new();
    if let Some(name) = request.name {
        user.name = name;
        changed.push("name");
    }
    if let Some(email) = request.email {
        user.email = email.to_lowercase();
        changed.push("email");
    }
    user.validate()?;

    save_user(db, &user, &changed).await?;
    Ok(user)
}

pub async fn update_password(db: &MongoDB, mut user: User, request: UpdatePasswordRequest) -> ApiResult<User> {
    request.validate()?;

    if !verify_password(request.current_password, user.password.clone()).await? {
        return Err(ApiError::Unauthorized("Password is incorrect".to_string()));
    }

    user.password = hash_password(request.new_password).await?;
    save_user(db, &user, &["password"]).await?;
    Ok(user)
}

/// Stores the digest of a fresh reset token and hands back the raw token for delivery.
pub async fn forgot_password(db: &MongoDB, request: ForgotPasswordRequest) -> ApiResult<(User, String)> {
    let mut user = db
        .collection::<User>(USERS)
        .find_one(doc! { "email": request.email.to_lowercase() })
        .await?
        .ok_or_else(|| ApiError::NotFound("There is no user with that email".to_string()))?;

    let (token, digest) = generate_reset_token();
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    user.reset_password_token = Some(digest);
    user.reset_password_expire = Some(BsonDateTime::from_millis(expires.timestamp_millis()));
    save_user(db, &user, RESET_FIELDS).await?;

    Ok((user, token))
}

pub async fn reset_password(db: &MongoDB, token: &str, request: ResetPasswordRequest) -> ApiResult<User> {
    request.validate()?;

    let mut user = db
        .collection::<User>(USERS)
        .find_one(doc! {
            "resetPasswordToken": hash_reset_token(token),
            "resetPasswordExpire": { "$gt": BsonDateTime::now() },
        })
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid token".to_string()))?;

    user.password = hash_password(request.password).await?;
    user.reset_password_token = None;
    user.reset_password_expire = None;
    save_user(db, &user, &["password", "resetPasswordToken", "resetPasswordExpire"]).await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    #[test]
    fn jwt_round_trip_keeps_subject_and_role() {
        let settings = test_settings();
        let id = ObjectId::new();

        let token = generate_jwt(&id, Role::Publisher, &settings).unwrap();
        let claims = verify_token(&token, &settings.jwt_secret).unwrap();

        assert_eq!(claims.sub, id.to_hex());
        assert_eq!(claims.role, Role::Publisher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let settings = test_settings();
        let token = generate_jwt(&ObjectId::new(), Role::User, &settings).unwrap();
        assert!(matches!(
            verify_token(&token, "another-secret"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let mut settings = test_settings();
        settings.jwt_expire_days = -1;
        let token = generate_jwt(&ObjectId::new(), Role::User, &settings).unwrap();
        assert!(matches!(
            verify_token(&token, &settings.jwt_secret),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(verify_token("not-a-jwt", "s"), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn reset_token_digest_is_stable_and_distinct() {
        let (token, digest) = generate_reset_token();
        assert_eq!(hash_reset_token(&token), digest);
        assert_ne!(token, digest);
        assert_eq!(digest.len(), 64);

        let (other, _) = generate_reset_token();
        assert_ne!(token, other);
    }

    #[actix_web::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("123456".to_string()).await.unwrap();
        assert_ne!(hashed, "123456");
        assert!(verify_password("123456".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_password("654321".to_string(), hashed).await.unwrap());
    }
}
