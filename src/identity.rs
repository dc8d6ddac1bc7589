// Identity collaborator: the one call the pipeline needs from the auth
// provider.

/// The signed-in user as reported by the identity provider. `is_loaded` is
/// false while the provider has not resolved a session yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub email: String,
    pub is_loaded: bool,
}

impl UserIdentity {
    pub fn loaded(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_loaded: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            email: String::new(),
            is_loaded: false,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.is_loaded && !self.email.is_empty()
    }
}

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> UserIdentity;
}

/// Fixed identity, for wiring tests and single-user deployments.
pub struct StaticIdentity {
    user: UserIdentity,
}

impl StaticIdentity {
    pub fn new(user: UserIdentity) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> UserIdentity {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usability() {
        assert!(UserIdentity::loaded("dev@example.com").is_usable());
        assert!(!UserIdentity::anonymous().is_usable());
        assert!(!UserIdentity {
            email: String::new(),
            is_loaded: true
        }
        .is_usable());
    }
}
