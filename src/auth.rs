use std::{sync::Arc, time::Duration};

use crate::{
    crypt::verify_password,
    error::AuthError,
    store::CredentialStore,
    token::{issue_token, verify_token, Claims, SecretKey},
};

pub struct AuthConfig {
    /// Username to credential-record map, populated before the server starts.
    pub credentials: CredentialStore,
    /// The key used to sign and verify session tokens.
    /// If the key changes, all currently authenticated sessions are terminated.
    pub secret: SecretKey,
    /// How long issued tokens remain valid. When unset, tokens carry no
    /// expiry and remain valid until the secret key is replaced.
    pub token_lifetime: Option<Duration>,
}

pub(crate) struct AuthInternal {
    config: AuthConfig,
}

impl AuthInternal {
    /// Look the user up, verify the password, and issue a signed token.
    /// Unknown users verify against the store's decoy record, so the miss
    /// path is indistinguishable from a wrong password in both error kind
    /// and timing.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let record = match self.config.credentials.lookup(username) {
            Some(record) => record,
            None => {
                let _ = verify_password(password, self.config.credentials.decoy());
                tracing::debug!(user = username, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &record.password) {
            tracing::debug!(user = username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let mut claims = Claims::new(username, record.students.clone());
        if let Some(lifetime) = self.config.token_lifetime {
            claims = claims.expiring_in(lifetime);
        }

        tracing::debug!(user = username, "login succeeded");
        issue_token(&claims, &self.config.secret)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        verify_token(token, &self.config.secret)
    }
}

/// Cheaply cloneable handle over the read-only auth state.
#[derive(Clone)]
pub struct Auth {
    pub(crate) internal: Arc<AuthInternal>,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            internal: Arc::new(AuthInternal { config }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(token_lifetime: Option<Duration>) -> AuthInternal {
        AuthInternal {
            config: AuthConfig {
                credentials: CredentialStore::new().with_user(
                    "admin",
                    "banana-monkey",
                    &["1234", "5432", "8576"],
                ),
                secret: SecretKey::from_bytes([42u8; 32]),
                token_lifetime,
            },
        }
    }

    #[test]
    fn login_issues_a_verifiable_token() {
        let auth = auth(None);
        let token = auth.login("admin", "banana-monkey").unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.students, vec!["1234", "5432", "8576"]);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn unknown_user_and_wrong_password_are_indistinguishable() {
        let auth = auth(None);
        let missing = auth.login("nobody", "banana-monkey").unwrap_err();
        let wrong = auth.login("admin", "wrong").unwrap_err();
        assert!(matches!(missing, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
    }

    #[test]
    fn configured_lifetime_stamps_an_expiry() {
        let auth = auth(Some(Duration::from_secs(3600)));
        let token = auth.login("admin", "banana-monkey").unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert!(claims.exp.is_some());
    }

    #[test]
    fn tokens_do_not_survive_a_key_change() {
        let token = auth(None).login("admin", "banana-monkey").unwrap();
        let other = AuthInternal {
            config: AuthConfig {
                credentials: CredentialStore::new(),
                secret: SecretKey::from_bytes([43u8; 32]),
                token_lifetime: None,
            },
        };
        let err = other.verify_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }
}
