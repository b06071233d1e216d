//! Identity port — the user on whose behalf a write is performed.

/// Supplies the default `created_by` / `updated_by` for writes that leave them empty.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<String>;
}

/// A fixed identity, used by the daemon and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn new(user: impl Into<String>) -> Self {
        Self(Some(user.into()))
    }

    /// No identity: writes keep whatever the caller supplied.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}
