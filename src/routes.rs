use std::{convert::Infallible, sync::Arc};

use serde::{Deserialize, Serialize};
use warp::{hyper::StatusCode, path, Filter, Rejection, Reply};

use crate::{
    auth::{Auth, AuthInternal},
    error::AuthError,
    token::Claims,
};

/// `POST /login` with form-encoded `user` and `password` fields. Replies
/// with the issued token on success; pair with [`handle_auth_errors`] to
/// turn rejected logins into a 401.
pub fn build_login_route(
    auth: &Auth,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    path!("login")
        .and(warp::post())
        .and(warp::body::form())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_login)
}

/// Gate for protected routes: extracts and verifies the bearer token and
/// hands the session claims to the wrapped handler.
pub fn with_auth(auth: &Auth) -> impl Filter<Extract = (Claims,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_auth_state(auth.internal.clone()))
        .and_then(bearer_auth_check)
}

pub async fn handle_auth_errors(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(auth_error) = err.find::<AuthError>() {
        tracing::debug!(error = %auth_error, "request rejected");
        let (status, message) = match auth_error {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, String::new()),
            AuthError::MissingAuthHeader => {
                (StatusCode::UNAUTHORIZED, "No authorization header".into())
            }
            AuthError::MalformedAuthHeader => {
                (StatusCode::FORBIDDEN, "Invalid authorization header".into())
            }
            AuthError::InvalidToken { .. } | AuthError::TokenExpired => {
                (StatusCode::FORBIDDEN, auth_error.to_string())
            }
            AuthError::MalformedCredential(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "an unknown error has occurred".into(),
            ),
        };
        return Ok(warp::reply::with_status(message, status));
    }

    Err(err)
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
}

async fn user_login(
    input: LoginQuery,
    auth: Arc<AuthInternal>,
) -> Result<impl Reply, Rejection> {
    let token = auth.login(&input.user, &input.password)?;

    Ok(warp::reply::json(&LoginResponse {
        token,
        token_type: "Bearer".into(),
    }))
}

// Missing header and wrong scheme are distinct failures: the first answers
// 401, the second 403.
async fn bearer_auth_check(
    header: Option<String>,
    auth: Arc<AuthInternal>,
) -> Result<Claims, Rejection> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let token = strip_bearer(&header).ok_or(AuthError::MalformedAuthHeader)?;

    let claims = auth.verify_token(token)?;

    Ok(claims)
}

fn strip_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

// functor that adds a reference to the shared auth state into the filter chain
fn with_auth_state(
    auth: Arc<AuthInternal>,
) -> impl Filter<Extract = (Arc<AuthInternal>,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}
