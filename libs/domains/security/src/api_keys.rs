use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Quota class of a caller, ordered by privilege
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum KeyClass {
    Anonymous,
    User,
    Admin,
}

impl KeyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyClass::Anonymous => "anonymous",
            KeyClass::User => "user",
            KeyClass::Admin => "admin",
        }
    }

    /// Whether this class passes a check requiring `required` or above
    pub fn satisfies(&self, required: KeyClass) -> bool {
        *self >= required
    }
}

impl fmt::Display for KeyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin and user API keys, fixed at startup.
///
/// The two sets are disjoint: a key listed in both is treated as admin only.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyRegistry {
    admin: HashSet<String>,
    user: HashSet<String>,
}

impl ApiKeyRegistry {
    pub fn new<A, U>(admin_keys: A, user_keys: U) -> Self
    where
        A: IntoIterator<Item = String>,
        U: IntoIterator<Item = String>,
    {
        let admin: HashSet<String> = normalize(admin_keys);
        let mut user: HashSet<String> = normalize(user_keys);

        let overlap = user.iter().filter(|k| admin.contains(*k)).count();
        if overlap > 0 {
            warn!(overlap, "Keys configured as both admin and user are treated as admin");
            user.retain(|k| !admin.contains(k));
        }

        info!(
            admin_keys_count = admin.len(),
            user_keys_count = user.len(),
            "API keys loaded"
        );

        Self { admin, user }
    }

    /// `Admin` or `User` for a known key, `None` otherwise
    pub fn classify(&self, key: &str) -> Option<KeyClass> {
        if self.admin.contains(key) {
            Some(KeyClass::Admin)
        } else if self.user.contains(key) {
            Some(KeyClass::User)
        } else {
            None
        }
    }

    pub fn is_admin(&self, key: &str) -> bool {
        self.admin.contains(key)
    }

    /// User-level check; admin keys pass too
    pub fn is_user(&self, key: &str) -> bool {
        self.classify(key).is_some()
    }

    pub fn admin_count(&self) -> usize {
        self.admin.len()
    }

    pub fn user_count(&self) -> usize {
        self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admin.is_empty() && self.user.is_empty()
    }
}

fn normalize<I: IntoIterator<Item = String>>(keys: I) -> HashSet<String> {
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Short stable identifier for a key, safe to log and to use as a rate-limit identity
pub fn fingerprint(key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    digest[..8].to_string()
}
