/// Token Guard Middleware
///
/// One middleware, two configurations. `TokenGuard::access` validates the
/// bearer token statelessly; `TokenGuard::refresh` reads the refresh token
/// from the body or a cookie and also checks it against the stored hash.
/// Verified identities are injected into request extensions for handlers.
/// Denials are rendered here, so outer middleware still sees a response.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::jwt::{validate_access_token, validate_refresh_token, TokenKind};
use crate::auth::{TokenClaims, TokenService};
use crate::error::{AppError, AuthError};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Identity attached by the access guard
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
}

/// The refresh token that passed the refresh guard, for the handler to rotate
#[derive(Debug, Clone)]
pub struct PresentedRefreshToken(pub String);

/// Where the guard looks for its token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `Authorization: Bearer <token>`
    BearerHeader,
    /// JSON body field, then cookie; first non-empty wins
    BodyOrCookie,
}

/// Extra check after the signature verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVerify {
    None,
    StoredRefreshHash,
}

#[derive(Debug, Clone, Copy)]
pub struct GuardConfig {
    pub kind: TokenKind,
    pub source: TokenSource,
    pub post_verify: PostVerify,
    /// What the client sees on any failure
    pub denial: AuthError,
}

impl GuardConfig {
    pub const ACCESS: GuardConfig = GuardConfig {
        kind: TokenKind::Access,
        source: TokenSource::BearerHeader,
        post_verify: PostVerify::None,
        denial: AuthError::Unauthorized,
    };

    pub const REFRESH: GuardConfig = GuardConfig {
        kind: TokenKind::Refresh,
        source: TokenSource::BodyOrCookie,
        post_verify: PostVerify::StoredRefreshHash,
        denial: AuthError::CannotRefresh,
    };
}

pub struct TokenGuard {
    config: GuardConfig,
    tokens: TokenService,
}

impl TokenGuard {
    pub fn new(config: GuardConfig, tokens: TokenService) -> Self {
        Self { config, tokens }
    }

    pub fn access(tokens: TokenService) -> Self {
        Self::new(GuardConfig::ACCESS, tokens)
    }

    pub fn refresh(tokens: TokenService) -> Self {
        Self::new(GuardConfig::REFRESH, tokens)
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TokenGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(TokenGuardService {
            service: Rc::new(service),
            config: self.config,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct TokenGuardService<S> {
    service: Rc<S>,
    config: GuardConfig,
    tokens: TokenService,
}

impl<S, B> Service<ServiceRequest> for TokenGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config;
        let tokens = self.tokens.clone();

        Box::pin(async move {
            let token = match config.source {
                TokenSource::BearerHeader => bearer_token(req.headers()),
                TokenSource::BodyOrCookie => body_or_cookie_token(&mut req).await,
            };

            let outcome = match token {
                Some(token) => authorize(&req, &config, &tokens, token).await,
                None => {
                    tracing::warn!(path = %req.path(), "Missing {:?} token", config.kind);
                    Err(AppError::Auth(config.denial))
                }
            };

            if let Err(err) = outcome {
                return Ok(req.error_response(err).map_into_right_body());
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Verify `token` per `config` and inject the resulting identity.
async fn authorize(
    req: &ServiceRequest,
    config: &GuardConfig,
    tokens: &TokenService,
    token: String,
) -> Result<(), AppError> {
    match config.kind {
        TokenKind::Access => {
            let claims = validate_access_token(&token, tokens.settings()).map_err(|e| {
                tracing::warn!("Access token validation failed: {}", e);
                AppError::Auth(config.denial)
            })?;
            let user_id = claims.user_id().map_err(|_| AppError::Auth(config.denial))?;

            tracing::debug!(user_id = user_id, email = %claims.email, "Access token validated");
            req.extensions_mut().insert(AuthenticatedUser {
                user_id,
                email: claims.email,
            });
        }
        TokenKind::Refresh => {
            let claims = validate_refresh_token(&token, tokens.settings()).map_err(|e| {
                tracing::warn!("Refresh token validation failed: {}", e);
                AppError::Auth(config.denial)
            })?;
            let user_id = claims.user_id().map_err(|_| AppError::Auth(config.denial))?;

            if config.post_verify == PostVerify::StoredRefreshHash {
                let pool = req
                    .app_data::<web::Data<PgPool>>()
                    .cloned()
                    .ok_or_else(|| AppError::Internal("Database pool not configured".into()))?;
                let user = tokens
                    .verify_stored_refresh_token(pool.get_ref(), user_id, &token)
                    .await
                    .map_err(|e| match e {
                        AppError::Auth(_) => AppError::Auth(config.denial),
                        other => other,
                    })?;
                req.extensions_mut().insert(user);
            }

            req.extensions_mut().insert(PresentedRefreshToken(token));
        }
    }

    Ok(())
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
struct RefreshTokenBody {
    #[serde(alias = "refreshToken")]
    refresh_token: Option<String>,
}

/// Read the refresh token from the JSON body, falling back to the cookie.
///
/// Consumes the request payload; handlers behind the refresh guard get the
/// token from `PresentedRefreshToken` instead.
async fn body_or_cookie_token(req: &mut ServiceRequest) -> Option<String> {
    let from_body = match req.extract::<web::Bytes>().await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<RefreshTokenBody>(&bytes)
            .ok()
            .and_then(|body| body.refresh_token),
        _ => None,
    };

    from_body
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            req.request()
                .cookie(REFRESH_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|t| !t.trim().is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::get_test_config;
    use crate::auth::SecretHasher;
    use actix_web::{http::header::HeaderValue, http::StatusCode, test as actix_test, App, HttpResponse};

    fn tokens() -> TokenService {
        TokenService::new(get_test_config(), SecretHasher::new(4))
    }

    async fn whoami(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def".to_string()));
    }

    #[test]
    fn test_malformed_authorization_headers() {
        for value in ["Bearer", "Bearer ", "Basic dXNlcjpwYXNz", "BearerToken", ""] {
            assert_eq!(bearer_token(&headers_with(value)), None, "header: {:?}", value);
        }
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[actix_web::test]
    async fn test_access_guard_injects_identity() {
        let tokens = tokens();
        let pair = tokens.issue_token_pair(7, "alice@x.com").unwrap();
        let app = actix_test::init_service(
            App::new().service(
                web::resource("/me")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", pair.access_token)))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;

        assert_eq!(body, web::Bytes::from_static(b"7"));
    }

    #[actix_web::test]
    async fn test_access_guard_rejects_refresh_token() {
        let tokens = tokens();
        let pair = tokens.issue_token_pair(7, "alice@x.com").unwrap();
        let app = actix_test::init_service(
            App::new().service(
                web::resource("/me")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", pair.refresh_token)))
            .to_request();

        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_access_guard_rejects_missing_header() {
        let app = actix_test::init_service(
            App::new().service(
                web::resource("/me")
                    .wrap(TokenGuard::access(tokens()))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/me").to_request();

        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_refresh_guard_rejects_forged_token_before_db_lookup() {
        // No pool is registered: reaching the database would be an internal error.
        let mut foreign = get_test_config();
        foreign.refresh_secret = "some-other-secret".to_string();
        let forged = TokenService::new(foreign, SecretHasher::new(4))
            .issue_token_pair(7, "alice@x.com")
            .unwrap();

        let app = actix_test::init_service(
            App::new().service(
                web::resource("/refresh")
                    .wrap(TokenGuard::refresh(tokens()))
                    .route(web::post().to(ok)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/refresh")
            .set_json(serde_json::json!({ "refresh_token": forged.refresh_token }))
            .to_request();

        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["code"], "REFRESH_DENIED");
    }
}
