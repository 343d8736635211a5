use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha512};

use crate::error::AuthError;

const ITERATIONS: u32 = 5000;
const SALT_LEN: usize = 12;

/// Digest primitives the stored-credential format is allowed to name.
/// Anything else in the algorithm field is a parse failure, never a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    fn from_id(id: &str) -> Option<Self> {
        match id {
            "5" => Some(HashAlgorithm::Sha256),
            "6" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    fn id(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "5",
            HashAlgorithm::Sha512 => "6",
        }
    }

    fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// A salted, iterated password hash.
///
/// Serialized as `$<algo-id>$<base64(salt)>$<base64(digest)>` where the
/// algorithm id is `5` (PBKDF2-HMAC-SHA256) or `6` (PBKDF2-HMAC-SHA512),
/// base64 is the standard padded alphabet, the salt is 12 bytes, and the
/// digest length is fixed by the algorithm. The format round-trips exactly
/// through `FromStr`/`Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    algorithm: HashAlgorithm,
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl FromStr for HashedPassword {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('$').collect();
        if fields.len() != 4 || !fields[0].is_empty() {
            return Err(AuthError::MalformedCredential(
                "expected $<algo>$<salt>$<digest>".into(),
            ));
        }
        let algorithm = HashAlgorithm::from_id(fields[1]).ok_or_else(|| {
            AuthError::MalformedCredential(format!("unknown algorithm id {:?}", fields[1]))
        })?;
        let salt = STANDARD
            .decode(fields[2])
            .map_err(|e| AuthError::MalformedCredential(format!("bad salt encoding: {e}")))?;
        let digest = STANDARD
            .decode(fields[3])
            .map_err(|e| AuthError::MalformedCredential(format!("bad digest encoding: {e}")))?;
        if salt.len() != SALT_LEN {
            return Err(AuthError::MalformedCredential(format!(
                "salt is {} bytes, expected {SALT_LEN}",
                salt.len()
            )));
        }
        if digest.len() != algorithm.digest_len() {
            return Err(AuthError::MalformedCredential(format!(
                "digest is {} bytes, expected {}",
                digest.len(),
                algorithm.digest_len()
            )));
        }
        Ok(Self {
            algorithm,
            salt,
            digest,
        })
    }
}

impl fmt::Display for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}${}${}",
            self.algorithm.id(),
            STANDARD.encode(&self.salt),
            STANDARD.encode(&self.digest)
        )
    }
}

/// Hash a password with a fresh random salt. SHA-512 is the default for
/// newly created records; SHA-256 records remain verifiable.
pub fn hash_password(password: &str) -> HashedPassword {
    let algorithm = HashAlgorithm::Sha512;
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = derive(algorithm, password, &salt);
    HashedPassword {
        algorithm,
        salt,
        digest,
    }
}

/// Re-derive the candidate password with the stored salt and algorithm and
/// compare against the stored digest in constant time.
pub fn verify_password(password: &str, stored: &HashedPassword) -> bool {
    let candidate = derive(stored.algorithm, password, &stored.salt);
    constant_time_eq(&candidate, &stored.digest)
}

fn derive(algorithm: HashAlgorithm, password: &str, salt: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; algorithm.digest_len()];
    match algorithm {
        HashAlgorithm::Sha256 => {
            pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut out)
        }
        HashAlgorithm::Sha512 => {
            pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, ITERATIONS, &mut out)
        }
    }
    out
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
