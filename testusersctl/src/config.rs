//! Registry configuration as it appears in a suite configuration file.
//!
//! Keys follow the suite file spelling (`drush-alias`, `username-prefix`, ...).
//! The `users` mapping keeps the order it was written in, which is the order
//! users are created, deleted and enumerated in.

use std::{collections::HashSet, fmt};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use testusers_model::{ModelError, TestUser};

use crate::validation::{ConfigGuardRailError, validate_username_prefix};

/// Prefix used by generated usernames and replaced by `username-prefix`.
pub const DEFAULT_USERNAME_PREFIX: &str = "test";

/// Default Drush executable.
pub const DEFAULT_DRUSH_COMMAND: &str = "drush";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RegistryConfig {
    /// Create configured users when the suite starts.
    pub create: bool,
    /// Delete configured users when the suite ends.
    pub delete: bool,
    /// Drush executable, optionally with a path.
    pub drush: String,
    /// Drush site alias, stored with its leading `@`.
    pub drush_alias: Option<String>,
    /// When false, a missing alias runs commands against Drush's default site.
    pub alias_required: bool,
    pub username_prefix: Option<String>,
    pub users: UserEntries,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            create: true,
            delete: true,
            drush: DEFAULT_DRUSH_COMMAND.to_string(),
            drush_alias: None,
            alias_required: true,
            username_prefix: None,
            users: UserEntries::default(),
        }
    }
}

impl RegistryConfig {
    /// The configured alias, ignoring blank values.
    pub fn alias(&self) -> Option<&str> {
        self.drush_alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
    }

    /// Build the test users in configuration order.
    ///
    /// Applies the username prefix, then rejects empty names, duplicate names
    /// and more than one root user.
    pub fn test_users(&self) -> Result<Vec<TestUser>, ConfigGuardRailError> {
        let prefix = match self.username_prefix.as_deref() {
            Some(prefix) => {
                validate_username_prefix(prefix)?;
                Some(prefix)
            }
            None => None,
        };

        let mut users = Vec::with_capacity(self.users.len());
        let mut seen = HashSet::new();
        let mut root: Option<String> = None;

        for (key, entry) in self.users.iter() {
            let name = entry.resolved_name(key, prefix);
            let user = entry.to_test_user(key, name)?;

            if !seen.insert(user.name.clone()) {
                return Err(ConfigGuardRailError::DuplicateUsername {
                    name: user.name,
                });
            }
            if user.is_root {
                if let Some(first) = &root {
                    return Err(ConfigGuardRailError::MultipleRootUsers {
                        first: first.clone(),
                        second: user.name,
                    });
                }
                root = Some(user.name.clone());
            }
            users.push(user);
        }

        Ok(users)
    }
}

/// One entry under `users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserEntry {
    /// Username; defaults to `<prefix>.<key>`.
    pub name: Option<String>,
    pub pass: String,
    pub roles: Vec<String>,
    pub email: Option<String>,
    pub root: bool,
}

impl UserEntry {
    fn resolved_name(&self, key: &str, prefix: Option<&str>) -> String {
        match &self.name {
            Some(name) => match prefix {
                Some(prefix) => apply_prefix(name, prefix),
                None => name.clone(),
            },
            None => format!(
                "{}.{}",
                prefix.unwrap_or(DEFAULT_USERNAME_PREFIX),
                key
            ),
        }
    }

    fn to_test_user(
        &self,
        key: &str,
        name: String,
    ) -> Result<TestUser, ConfigGuardRailError> {
        let user = TestUser::new(name, self.pass.clone()).map_err(|source| {
            match source {
                ModelError::EmptyUsername => {
                    ConfigGuardRailError::EmptyUsername { key: key.into() }
                }
                source => ConfigGuardRailError::InvalidUser {
                    key: key.into(),
                    source,
                },
            }
        })?;
        let mut user = user.with_roles(self.roles.iter().cloned());
        if let Some(email) = &self.email {
            user = user.with_email(email.clone()).map_err(|source| {
                ConfigGuardRailError::InvalidUser {
                    key: key.into(),
                    source,
                }
            })?;
        }
        if self.root {
            user = user.as_root();
        }
        Ok(user)
    }
}

/// Swap the default `test.` prefix of a configured name for `prefix`.
pub fn apply_prefix(name: &str, prefix: &str) -> String {
    match name.strip_prefix(DEFAULT_USERNAME_PREFIX) {
        Some(rest) if rest.starts_with('.') => format!("{prefix}{rest}"),
        _ => name.to_string(),
    }
}

/// The `users` mapping, in document order.
#[derive(Debug, Clone, Default)]
pub struct UserEntries(Vec<(String, UserEntry)>);

impl UserEntries {
    pub fn push(&mut self, key: impl Into<String>, entry: UserEntry) {
        self.0.push((key.into(), entry));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserEntry)> {
        self.0.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut UserEntry> {
        self.0
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for UserEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UserEntriesVisitor;

        impl<'de> Visitor<'de> for UserEntriesVisitor {
            type Value = UserEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping of user keys to user settings")
            }

            fn visit_map<V>(self, mut map: V) -> Result<UserEntries, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, entry)) =
                    map.next_entry::<String, UserEntry>()?
                {
                    entries.push((key, entry));
                }
                Ok(UserEntries(entries))
            }

            fn visit_unit<E>(self) -> Result<UserEntries, E>
            where
                E: serde::de::Error,
            {
                Ok(UserEntries::default())
            }
        }

        deserializer.deserialize_any(UserEntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
create: false
delete: false
drush-alias: "@d7.local"
users:
  administrator:
    name: test.administrator
    email: test.administrator@example.com
    pass: foo
    roles: [administrator, editor]
    root: true
  editor:
    name: test.editor
    email: test.editor@example.com
    pass: foo
    roles: [editor, moderator]
  moderator:
    name: test.moderator
    email: test.moderator@example.com
    pass: foo
    roles: [moderator]
"#;

    fn suite() -> RegistryConfig {
        serde_yaml::from_str(SUITE).unwrap()
    }

    #[test]
    fn parses_suite_settings() {
        let config = suite();
        assert!(!config.create);
        assert!(!config.delete);
        assert_eq!(config.drush, "drush");
        assert_eq!(config.alias(), Some("@d7.local"));
        assert!(config.alias_required);
        assert_eq!(config.users.len(), 3);
    }

    #[test]
    fn users_keep_document_order() {
        let yaml = r#"
drush-alias: "@site"
users:
  zeta: { name: test.zeta, pass: a }
  alpha: { name: test.alpha, pass: b }
  mid: { name: test.mid, pass: c }
"#;
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<_> = config
            .test_users()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["test.zeta", "test.alpha", "test.mid"]);
    }

    #[test]
    fn builds_test_users() {
        let users = suite().test_users().unwrap();
        assert_eq!(users[0].name, "test.administrator");
        assert!(users[0].is_root);
        assert_eq!(users[0].roles, ["administrator", "editor"]);
        assert_eq!(
            users[1].email.as_deref(),
            Some("test.editor@example.com")
        );
        assert!(!users[2].is_root);
    }

    #[test]
    fn custom_prefix_replaces_default_prefix() {
        let mut config = suite();
        config.username_prefix = Some("custom".into());
        let names: Vec<_> = config
            .test_users()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(
            names,
            ["custom.administrator", "custom.editor", "custom.moderator"]
        );
    }

    #[test]
    fn invalid_prefix_is_a_configuration_error() {
        let mut config = suite();
        config.username_prefix = Some("xyz".into());
        assert!(matches!(
            config.test_users(),
            Err(ConfigGuardRailError::InvalidUsernamePrefix { prefix }) if prefix == "xyz"
        ));
    }

    #[test]
    fn missing_name_is_derived_from_key() {
        let yaml = r#"
drush-alias: "@site"
username-prefix: qa_team
users:
  reviewer: { pass: secret, roles: [reviewer] }
"#;
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        let users = config.test_users().unwrap();
        assert_eq!(users[0].name, "qa_team.reviewer");
    }

    #[test]
    fn names_without_default_prefix_are_kept() {
        assert_eq!(apply_prefix("admin", "custom"), "admin");
        assert_eq!(apply_prefix("tester.one", "custom"), "tester.one");
        assert_eq!(apply_prefix("test.one", "custom"), "custom.one");
    }

    #[test]
    fn second_root_is_rejected() {
        let mut config = suite();
        if let Some(editor) = config.users.get_mut("editor") {
            editor.root = true;
        }
        assert!(matches!(
            config.test_users(),
            Err(ConfigGuardRailError::MultipleRootUsers { first, second })
                if first == "test.administrator" && second == "test.editor"
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut config = suite();
        if let Some(editor) = config.users.get_mut("editor") {
            editor.name = Some(String::new());
        }
        assert!(matches!(
            config.test_users(),
            Err(ConfigGuardRailError::EmptyUsername { key }) if key == "editor"
        ));
    }

    #[test]
    fn empty_users_section_is_allowed() {
        let config: RegistryConfig =
            serde_yaml::from_str("drush-alias: '@site'\nusers:\n").unwrap();
        assert!(config.users.is_empty());
    }
}
