mod support;

use support::{FakeSite, valid_config};
use testusersctl::{ConfigGuardRailError, RegistryError, TestUser, UserRegistry};

#[test]
fn root_user_is_the_configured_root() {
    let site = FakeSite::default();
    let registry = UserRegistry::new(&valid_config(), &site).unwrap();

    let root = registry.root_user().expect("root user configured");
    assert_eq!(root.name, "test.administrator");
    assert_eq!(root.pass, "foo");
    assert_eq!(root.roles, ["administrator", "editor"]);
    assert!(root.is_root);
}

#[test]
fn root_user_absent_without_root_flag() {
    let mut config = valid_config();
    config.users.get_mut("administrator").unwrap().root = false;
    let site = FakeSite::default();
    let registry = UserRegistry::new(&config, &site).unwrap();

    assert!(registry.root_user().is_none());
}

#[test]
fn user_lookup_by_name() {
    let site = FakeSite::default();
    let registry = UserRegistry::new(&valid_config(), &site).unwrap();

    let editor = registry.user("test.editor").expect("editor");
    assert_eq!(editor.roles, ["editor", "moderator"]);
    assert_eq!(editor.effective_email(), "test.editor@example.com");
    assert!(registry.user("invalid").is_none());
    assert!(registry.user("editor").is_none());
}

#[test]
fn user_by_role_requires_the_exact_role_set() {
    let site = FakeSite::default();
    let registry = UserRegistry::new(&valid_config(), &site).unwrap();

    let admin = registry.user_by_role(["administrator", "editor"]).unwrap();
    assert_eq!(admin.name, "test.administrator");

    let same_admin = registry.user_by_role(["editor", "administrator"]).unwrap();
    assert_eq!(same_admin.name, "test.administrator");

    assert_eq!(
        registry.user_by_role("moderator").map(|u| u.name.as_str()),
        Some("test.moderator")
    );

    // Subset and superset queries do not match.
    assert!(registry.user_by_role("administrator").is_none());
    assert!(
        registry
            .user_by_role(["administrator", "editor", "moderator"])
            .is_none()
    );
    assert!(registry.user_by_role("nobody").is_none());
}

#[test]
fn roles_are_distinct_in_first_seen_order() {
    let site = FakeSite::default();
    let registry = UserRegistry::new(&valid_config(), &site).unwrap();

    assert_eq!(registry.roles(), ["administrator", "editor", "moderator"]);
}

#[test]
fn users_keep_configuration_order() {
    let site = FakeSite::default();
    let registry = UserRegistry::new(&valid_config(), &site).unwrap();

    let names: Vec<_> = registry.users().iter().map(|u| u.name.as_str()).collect();
    assert_eq!(
        names,
        ["test.administrator", "test.editor", "test.moderator"]
    );
}

#[test]
fn logged_in_user_lifecycle() {
    let site = FakeSite::default();
    let mut registry = UserRegistry::new(&valid_config(), &site).unwrap();
    assert!(registry.logged_in_user().is_none());

    let mock = TestUser::new("test.mock.user", "password")
        .unwrap()
        .with_roles(["mock"]);
    registry.set_logged_in_user(mock.clone());
    assert_eq!(registry.logged_in_user(), Some(&mock));

    let editor = registry.user("test.editor").unwrap().clone();
    registry.set_logged_in_user(editor.clone());
    assert_eq!(registry.logged_in_user(), Some(&editor));

    registry.remove_logged_in_user();
    assert!(registry.logged_in_user().is_none());
    registry.remove_logged_in_user();
    assert!(registry.logged_in_user().is_none());

    assert!(site.commands().is_empty());
}

#[test]
fn missing_alias_rejects_construction() {
    let mut config = valid_config();
    config.drush_alias = None;
    let site = FakeSite::default();

    let err = UserRegistry::new(&config, &site).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        "Please configure the drush-alias setting in your suite configuration."
    );
}

#[test]
fn optional_alias_allows_missing_alias() {
    let mut config = valid_config();
    config.drush_alias = Some("   ".into());
    config.alias_required = false;
    let site = FakeSite::default();

    let registry = UserRegistry::new(&config, &site).unwrap();
    assert_eq!(registry.manager().runner().prepare("st"), "drush -y st");
}

#[test]
fn invalid_username_prefix_rejects_construction() {
    let mut config = valid_config();
    config.username_prefix = Some("xyz".into());
    let site = FakeSite::default();

    let err = UserRegistry::new(&config, &site).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Configuration(ConfigGuardRailError::InvalidUsernamePrefix { ref prefix })
            if prefix == "xyz"
    ));
}

#[test]
fn valid_username_prefix_renames_users() {
    let mut config = valid_config();
    config.username_prefix = Some("custom".into());
    let site = FakeSite::default();

    let registry = UserRegistry::new(&config, &site).unwrap();
    assert_eq!(
        registry.root_user().map(|u| u.name.as_str()),
        Some("custom.administrator")
    );
    assert!(registry.user("custom.editor").is_some());
    assert!(registry.user("test.editor").is_none());
}
