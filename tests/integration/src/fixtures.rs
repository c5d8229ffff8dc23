//! Test fixtures and data generators

use std::sync::atomic::{AtomicU64, Ordering};

use study_core::entities::Profile;
use study_core::{Caller, RecordId};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A unique, valid email address
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}{}@example.com", unique_suffix())
}

/// A registered user: profile plus the identity they sign in with
#[derive(Debug, Clone)]
pub struct TestUser {
    pub profile: Profile,
    pub caller: Caller,
}

impl TestUser {
    /// New user with a verified email
    pub fn unique(name: &str) -> Self {
        let id = RecordId::new_v4();
        let email = unique_email(&name.to_ascii_lowercase());
        Self {
            profile: Profile::new(id, name).with_email(email.clone()),
            caller: Caller::new(id).with_email(email, true),
        }
    }

    pub fn id(&self) -> RecordId {
        self.caller.user_id
    }

    pub fn email(&self) -> &str {
        self.caller.email.as_deref().unwrap_or_default()
    }
}
