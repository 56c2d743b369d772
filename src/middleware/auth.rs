use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::user::Role;
use crate::AppState;

/// Claims issued by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub email: Option<String>,
}

/// The authenticated caller. The role is taken from the token as issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

impl Identity {
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = Uuid::parse_str(&claims.sub).ok()?;
        let role = claims.role.as_deref()?.parse().ok()?;
        Some(Self {
            id,
            role,
            email: claims.email.clone().unwrap_or_default(),
        })
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Identity, Response> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))?;

    Identity::from_claims(&data.claims).ok_or_else(|| {
        tracing::warn!(sub = %data.claims.sub, role = ?data.claims.role, "token carries unusable identity");
        reject(StatusCode::FORBIDDEN, "unknown_identity")
    })
}

async fn gate(state: &AppState, mut req: Request, next: Next, allowed: fn(&Role) -> bool) -> Response {
    match authenticate(req.headers(), &state.config.jwt_secret) {
        Ok(identity) => {
            if !allowed(&identity.role) {
                tracing::debug!(user_id = %identity.id, role = %identity.role, "role not permitted");
                return reject(StatusCode::FORBIDDEN, "forbidden");
            }
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Any authenticated identity.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    gate(&state, req, next, |_| true).await
}

pub async fn require_student(State(state): State<AppState>, req: Request, next: Next) -> Response {
    gate(&state, req, next, Role::can_take_assessments).await
}

pub async fn require_recruiter(State(state): State<AppState>, req: Request, next: Next) -> Response {
    gate(&state, req, next, Role::can_recruit).await
}
