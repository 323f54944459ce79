use std::{collections::HashSet, fmt};

use crate::{
    AUTHENTICATED_ROLE, DEFAULT_EMAIL_DOMAIN,
    error::{ModelError, Result},
};

/// A user account on the site under test.
///
/// Records are built once from configuration and only read afterwards. The
/// root user is expected to pre-exist on the site (UID=1) and is never created
/// or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestUser {
    pub name: String,
    pub pass: String,
    /// Roles in configuration order. Matching treats them as a set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub roles: Vec<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub email: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, rename = "root"))]
    pub is_root: bool,
}

impl TestUser {
    pub fn new(name: impl Into<String>, pass: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyUsername);
        }
        Ok(Self {
            name,
            pass: pass.into(),
            roles: Vec::new(),
            email: None,
            is_root: false,
        })
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        if !email.contains('@') {
            return Err(ModelError::InvalidEmail(email));
        }
        self.email = Some(email);
        Ok(self)
    }

    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// The configured email, or `<name>@example.com` when none was given.
    pub fn effective_email(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{}@{}", self.name, DEFAULT_EMAIL_DOMAIN))
    }

    /// Roles that need an explicit assignment on the site, in order.
    pub fn assignable_roles(&self) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .map(String::as_str)
            .filter(|role| *role != AUTHENTICATED_ROLE)
    }

    /// True when this user's roles equal `roles` as a set.
    pub fn has_exact_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        let mine: HashSet<&str> = self.roles.iter().map(String::as_str).collect();
        let wanted: HashSet<&str> = roles.iter().map(AsRef::as_ref).collect();
        mine == wanted
    }

    /// Loose equality used by assertions: name and password, optionally roles.
    pub fn matches(&self, other: &TestUser, check_roles: bool) -> bool {
        self.name == other.name
            && self.pass == other.pass
            && (!check_roles || self.has_exact_roles(&other.roles))
    }
}

impl fmt::Display for TestUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
