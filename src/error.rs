use warp::reject::Reject;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("malformed stored credential: {0}")]
    MalformedCredential(String),
    #[error("username or password incorrect")]
    InvalidCredentials,
    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },
    #[error("token expired")]
    TokenExpired,
    #[error("no authorization header")]
    MissingAuthHeader,
    #[error("invalid authorization header")]
    MalformedAuthHeader,
}

impl Reject for AuthError {}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken {
                reason: err.to_string(),
            },
        }
    }
}
