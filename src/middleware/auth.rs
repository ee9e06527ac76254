use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::{
    config::Settings,
    database::MongoDB,
    models::{Role, User},
    services::auth_service,
    utils::{ApiError, ApiResult},
};

pub const TOKEN_COOKIE: &str = "token";

/// The authenticated caller, attached to the request once the token checks out.
/// Handlers take it as an extractor; the role and ownership predicates below
/// are the only authorization rules in the API.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: Role,
    pub user: User,
}

impl AuthUser {
    pub fn from_user(user: User) -> ApiResult<Self> {
        let id = user
            .id
            .ok_or_else(|| ApiError::Internal("Stored user has no _id".to_string()))?;
        Ok(AuthUser { id, role: user.role, user })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role.as_str()
            )))
        }
    }

    /// Owner or admin; `action` completes "User <id> is not authorized to ...".
    pub fn ensure_owner(&self, owner: &ObjectId, action: &str) -> ApiResult<()> {
        if &self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "User {} is not authorized to {}",
                self.id.to_hex(),
                action
            )))
        }
    }
}

/// Bearer header wins over the cookie. A cleared cookie (`none`) counts as absent.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(actix_web::http::header::AUTHORIZATION) {
        if let Ok(header_str) = value.to_str() {
            if let Some(token) = header_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    req.cookie(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty() && v != "none")
}

async fn authenticate(
    db: Option<web::Data<MongoDB>>,
    settings: Option<web::Data<Settings>>,
    token: Option<String>,
) -> ApiResult<AuthUser> {
    let token = token.ok_or_else(ApiError::not_authorized_route)?;
    let (db, settings) = match (db, settings) {
        (Some(db), Some(settings)) => (db, settings),
        _ => return Err(ApiError::Internal("Auth guard is missing app data".to_string())),
    };

    let claims = auth_service::verify_token(&token, &settings.jwt_secret)?;
    let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::not_authorized_route())?;

    let user = auth_service::find_user(&db, &user_id)
        .await?
        .ok_or_else(ApiError::not_authorized_route)?;

    AuthUser::from_user(user)
}

fn authenticate_request(req: &HttpRequest) -> LocalBoxFuture<'static, ApiResult<AuthUser>> {
    if let Some(user) = req.extensions().get::<AuthUser>() {
        let user = user.clone();
        return Box::pin(async move { Ok(user) });
    }

    let db = req.app_data::<web::Data<MongoDB>>().cloned();
    let settings = req.app_data::<web::Data<Settings>>().cloned();
    let token = extract_token(req);
    Box::pin(authenticate(db, settings, token))
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = authenticate_request(req);
        Box::pin(async move { fut.await.map_err(Error::from) })
    }
}

/// Scope-level guard: every route below requires a valid token and one of
/// the given roles. Rejections are answered here as ordinary error responses
/// so outer middleware still sees them.
pub struct Protect {
    roles: Rc<Vec<Role>>,
}

impl Protect {
    pub fn authorize(roles: &[Role]) -> Self {
        Protect {
            roles: Rc::new(roles.to_vec()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Protect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ProtectService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ProtectService {
            service: Rc::new(service),
            roles: Rc::clone(&self.roles),
        }))
    }
}

pub struct ProtectService<S> {
    service: Rc<S>,
    roles: Rc<Vec<Role>>,
}

impl<S, B> Service<ServiceRequest> for ProtectService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let roles = Rc::clone(&self.roles);
        let auth = authenticate_request(req.request());

        Box::pin(async move {
            let user = match auth.await.and_then(|user| user.require_role(&roles).map(|_| user)) {
                Ok(user) => user,
                Err(err) => {
                    log::debug!("🔒 {} {} rejected: {}", req.method(), req.path(), err);
                    return Ok(req.error_response(err).map_into_right_body());
                }
            };

            log::debug!("🔐 {} {} as {}", req.method(), req.path(), user.id);
            req.extensions_mut().insert(user);

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::{self, TestRequest};
    use actix_web::{http::StatusCode, App, HttpResponse};
    use mongodb::bson::DateTime as BsonDateTime;

    use crate::middleware::SecurityHeaders;

    fn caller(role: Role) -> AuthUser {
        AuthUser::from_user(User {
            id: Some(ObjectId::new()),
            name: "Caller".into(),
            email: "caller@example.com".into(),
            role,
            password: "hash".into(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: BsonDateTime::now(),
        })
        .unwrap()
    }

    #[test]
    fn role_allow_list() {
        let publisher = caller(Role::Publisher);
        assert!(publisher.require_role(&[Role::Publisher, Role::Admin]).is_ok());

        let err = caller(Role::User)
            .require_role(&[Role::Publisher, Role::Admin])
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(msg) if msg.contains("user")));
    }

    #[test]
    fn owner_or_admin_may_mutate() {
        let owner = caller(Role::Publisher);
        let stranger = caller(Role::Publisher);
        let admin = caller(Role::Admin);

        assert!(owner.ensure_owner(&owner.id, "update this bootcamp").is_ok());
        assert!(admin.ensure_owner(&owner.id, "update this bootcamp").is_ok());
        assert!(matches!(
            stranger.ensure_owner(&owner.id, "update this bootcamp"),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn every_non_owner_role_is_forbidden() {
        let owner = ObjectId::new();
        for role in [Role::User, Role::Publisher] {
            assert!(caller(role).ensure_owner(&owner, "delete this review").is_err());
        }
    }

    #[test]
    fn token_comes_from_header_then_cookie() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .cookie(Cookie::new(TOKEN_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default()
            .cookie(Cookie::new(TOKEN_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-cookie"));

        let req = TestRequest::default()
            .cookie(Cookie::new(TOKEN_COOKIE, "none"))
            .to_http_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(extract_token(&req), None);
    }

    #[actix_web::test]
    async fn rejected_requests_still_pass_through_outer_middleware() {
        let app = test::init_service(
            App::new().wrap(SecurityHeaders).service(
                web::scope("/admin")
                    .wrap(Protect::authorize(&[Role::Admin]))
                    .route("", web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Not authorized to access this route");
    }
}
