use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tracing::warn;

use service::auth::{domain::Credentials, AuthError, User};

use crate::errors::{JsonApiError, CHALLENGE_INVALID_CREDENTIALS, CHALLENGE_INVALID_TOKEN, CHALLENGE_MISSING};
use crate::state::AppState;

/// Cookie carrying the session token as a fallback to the Authorization header.
pub const AUTH_COOKIE: &str = "auth_token";

/// Authenticated caller, inserted by [`require_bearer_token`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Raw token the caller authenticated with.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[derive(Serialize)]
pub struct RegisterOutput {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub token: String,
}

#[derive(Serialize)]
pub struct MeOutput {
    pub id: i64,
    pub login: String,
}

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, JsonApiError> {
    let Json(creds) = payload.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(JsonApiError::bad_request("username and password are required"));
    }
    Ok(creds)
}

#[utoipa::path(post, path = "/register", tag = "auth", request_body = crate::openapi::CredentialsDoc, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterOutput>), JsonApiError> {
    let creds = credentials(payload)?;
    let user_id = state.users.register(&creds.username, &creds.password).await?;
    Ok((StatusCode::CREATED, Json(RegisterOutput { user_id })))
}

#[utoipa::path(post, path = "/login", tag = "auth", request_body = crate::openapi::CredentialsDoc, responses((status = 200, description = "Logged In"), (status = 400, description = "Bad Request"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let creds = credentials(payload)?;
    let token = state.users.login(&creds.username, &creds.password).await.map_err(|e| match e {
        AuthError::Unauthorized => JsonApiError {
            challenge: Some(CHALLENGE_INVALID_CREDENTIALS),
            ..JsonApiError::new(StatusCode::UNAUTHORIZED, "invalid credentials", None)
        },
        other => other.into(),
    })?;

    let mut cookie = Cookie::new(AUTH_COOKIE, token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    Ok((jar.add(cookie), Json(LoginOutput { token })))
}

#[utoipa::path(post, path = "/logout", tag = "auth", responses((status = 204, description = "Logged Out"), (status = 401, description = "Unauthorized")), security(("bearer" = [])))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    state.users.logout(&token).await;
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/me", tag = "auth", responses((status = 200, description = "Current user", body = crate::openapi::MeDoc), (status = 401, description = "Unauthorized")), security(("bearer" = [])))]
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<MeOutput> {
    Json(MeOutput { id: user.id, login: user.login })
}

/// Pull the token from `Authorization: Bearer <token>`, falling back to the
/// `auth_token` cookie when the header is absent.
fn extract_token(req: &Request) -> Result<String, JsonApiError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        return match token {
            Some(t) => Ok(t.to_string()),
            None => {
                warn!(path = %req.uri().path(), "invalid Authorization format (expect Bearer)");
                Err(JsonApiError::unauthorized(CHALLENGE_MISSING))
            }
        };
    }

    let jar = CookieJar::from_headers(req.headers());
    match jar.get(AUTH_COOKIE).map(|c| c.value()) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => {
            warn!(path = %req.uri().path(), "missing Authorization header and auth_token cookie");
            Err(JsonApiError::unauthorized(CHALLENGE_MISSING))
        }
    }
}

/// Route layer: resolve the bearer token to a user or answer 401.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let token = extract_token(&req)?;
    let user = match state.users.get_user_by_token(&token).await {
        Ok(user) => user,
        Err(e) => {
            warn!(path = %req.uri().path(), code = e.code(), "token validation failed");
            return Err(JsonApiError::unauthorized(CHALLENGE_INVALID_TOKEN));
        }
    };
    req.extensions_mut().insert(CurrentUser(user));
    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}
