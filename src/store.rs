use std::collections::HashMap;

use crate::crypt::{hash_password, HashedPassword};

pub(crate) struct UserRecord {
    pub password: HashedPassword,
    pub students: Vec<String>,
}

/// Username to credential-record map, seeded before the server starts and
/// never mutated afterwards, so it is shared across requests without a lock.
pub struct CredentialStore {
    users: HashMap<String, UserRecord>,
    decoy: HashedPassword,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            // verified against on unknown-user logins so the miss path costs
            // the same derivation work as a real record
            decoy: hash_password(""),
        }
    }

    /// Seed a user, hashing the password with a fresh salt. `students` lists
    /// the record ids this user may access.
    pub fn with_user(self, username: &str, password: &str, students: &[&str]) -> Self {
        self.with_hashed_user(username, hash_password(password), students)
    }

    /// Seed a user from an already-hashed record, e.g. one parsed from the
    /// `$<algo>$<salt>$<digest>` text form.
    pub fn with_hashed_user(
        mut self,
        username: &str,
        password: HashedPassword,
        students: &[&str],
    ) -> Self {
        self.users.insert(
            username.to_owned(),
            UserRecord {
                password,
                students: students.iter().map(|s| (*s).to_owned()).collect(),
            },
        );
        self
    }

    pub(crate) fn lookup(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub(crate) fn decoy(&self) -> &HashedPassword {
        &self.decoy
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
