//! Role table and permission evaluation
//!
//! Capabilities form an additive lattice: broader roles subsume narrower
//! ones through explicit OR-composition in the derived predicates, never
//! through an ordering of roles.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognized role tags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Editor,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Master, Role::Editor, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Human readable name for menus and badges
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Master => "Master",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Role::Master),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Capability check points requested by route guards
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "manage_users")]
    ManageUsers,
    #[serde(rename = "finance_all")]
    FinanceAll,
    #[serde(rename = "property_all")]
    PropertyAll,
    #[serde(rename = "finance_own")]
    FinanceOwn,
    #[serde(rename = "property_manage")]
    PropertyManage,
    #[serde(rename = "property_view_available")]
    PropertyViewAvailable,
    /// Grants every action of the table
    #[serde(rename = "*")]
    Wildcard,
}

impl Action {
    /// Every concrete action (the wildcard excluded)
    pub const ALL: [Action; 7] = [
        Action::Delete,
        Action::ManageUsers,
        Action::FinanceAll,
        Action::PropertyAll,
        Action::FinanceOwn,
        Action::PropertyManage,
        Action::PropertyViewAvailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Delete => "delete",
            Action::ManageUsers => "manage_users",
            Action::FinanceAll => "finance_all",
            Action::PropertyAll => "property_all",
            Action::FinanceOwn => "finance_own",
            Action::PropertyManage => "property_manage",
            Action::PropertyViewAvailable => "property_view_available",
            Action::Wildcard => "*",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized action: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .chain(std::iter::once(Action::Wildcard))
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Static mapping from role name to its permitted actions
///
/// Role names are plain strings so a configured table may carry roles the
/// application has no enum variant for; such roles are still evaluated
/// through the table but never resolve from an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTable {
    grants: BTreeMap<String, BTreeSet<Action>>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::builder()
            .grant(
                Role::Master,
                [
                    Action::Delete,
                    Action::ManageUsers,
                    Action::FinanceAll,
                    Action::PropertyAll,
                ],
            )
            .grant(Role::Editor, [Action::FinanceOwn, Action::PropertyManage])
            .grant(Role::Viewer, [Action::PropertyViewAvailable])
            .build()
    }
}

/// Builder for custom role tables
#[derive(Debug, Default)]
pub struct RoleTableBuilder {
    grants: BTreeMap<String, BTreeSet<Action>>,
}

impl RoleTableBuilder {
    pub fn grant(
        mut self,
        role: impl AsRef<str>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        self.grants
            .entry(role.as_ref().to_string())
            .or_default()
            .extend(actions);
        self
    }

    pub fn build(self) -> RoleTable {
        RoleTable {
            grants: self.grants,
        }
    }
}

impl RoleTable {
    pub fn builder() -> RoleTableBuilder {
        RoleTableBuilder::default()
    }

    /// Whether the table has an entry for this role
    pub fn contains(&self, role: impl AsRef<str>) -> bool {
        self.grants.contains_key(role.as_ref())
    }

    /// Actions configured for a role, `None` for unknown roles
    pub fn actions(&self, role: impl AsRef<str>) -> Option<&BTreeSet<Action>> {
        self.grants.get(role.as_ref())
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    /// True iff `action` (or the wildcard) is in the role's set.
    /// Unknown roles have no permissions.
    pub fn can(&self, role: impl AsRef<str>, action: Action) -> bool {
        self.actions(role)
            .map(|set| set.contains(&action) || set.contains(&Action::Wildcard))
            .unwrap_or(false)
    }

    pub fn can_delete_property(&self, role: impl AsRef<str>) -> bool {
        self.can(role, Action::Delete)
    }

    pub fn can_manage_users(&self, role: impl AsRef<str>) -> bool {
        self.can(role, Action::ManageUsers)
    }

    pub fn can_view_all_finances(&self, role: impl AsRef<str>) -> bool {
        self.can(role, Action::FinanceAll)
    }

    /// `finance_own`, or implied by `finance_all`
    pub fn can_manage_own_finances(&self, role: impl AsRef<str>) -> bool {
        let role = role.as_ref();
        self.can(role, Action::FinanceOwn) || self.can_view_all_finances(role)
    }

    pub fn can_manage_properties(&self, role: impl AsRef<str>) -> bool {
        let role = role.as_ref();
        self.can(role, Action::PropertyManage) || self.can(role, Action::PropertyAll)
    }

    pub fn can_view_available_properties(&self, role: impl AsRef<str>) -> bool {
        let role = role.as_ref();
        self.can(role, Action::PropertyViewAvailable) || self.can_manage_properties(role)
    }

    /// Archive access is reserved to `master` and is not read from the
    /// table: granting a role every action, even through the wildcard,
    /// does not open the archive.
    pub fn can_access_archive(&self, role: impl AsRef<str>) -> bool {
        role.as_ref() == Role::Master.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_grants() {
        let table = RoleTable::default();

        assert!(table.can(Role::Master, Action::Delete));
        assert!(table.can(Role::Master, Action::ManageUsers));
        assert!(table.can(Role::Editor, Action::FinanceOwn));
        assert!(table.can(Role::Viewer, Action::PropertyViewAvailable));

        assert!(!table.can(Role::Editor, Action::Delete));
        assert!(!table.can(Role::Viewer, Action::FinanceOwn));
        assert!(!table.can(Role::Master, Action::FinanceOwn));
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        let table = RoleTable::default();
        for action in Action::ALL {
            assert!(!table.can("pending", action));
            assert!(!table.can("", action));
        }
        assert!(!table.can_view_available_properties("admin"));
    }

    #[test]
    fn test_derived_predicates_subsume() {
        let table = RoleTable::default();

        assert!(table.can_manage_own_finances(Role::Master));
        assert!(table.can_manage_own_finances(Role::Editor));
        assert!(!table.can_manage_own_finances(Role::Viewer));

        assert!(table.can_manage_properties(Role::Master));
        assert!(table.can_manage_properties(Role::Editor));
        assert!(!table.can_manage_properties(Role::Viewer));

        for role in Role::ALL {
            assert!(table.can_view_available_properties(role));
        }
    }

    #[test]
    fn test_wildcard_grants_table_actions_but_not_archive() {
        let table = RoleTable::builder()
            .grant("superuser", [Action::Wildcard])
            .build();

        for action in Action::ALL {
            assert!(table.can("superuser", action));
        }
        assert!(!table.can_access_archive("superuser"));
    }

    #[test]
    fn test_archive_ignores_table() {
        let empty = RoleTable::builder().build();
        assert!(empty.can_access_archive(Role::Master));
        assert!(!empty.can(Role::Master, Action::Delete));
        assert!(!RoleTable::default().can_access_archive(Role::Editor));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!("editor".parse::<Role>(), Ok(Role::Editor));
        assert!("Editor".parse::<Role>().is_err());
        assert_eq!("*".parse::<Action>(), Ok(Action::Wildcard));
        assert_eq!("finance_own".parse::<Action>(), Ok(Action::FinanceOwn));
        assert!("finance".parse::<Action>().is_err());
    }

    #[test]
    fn test_table_deserializes_from_map() {
        let table: RoleTable = serde_json::from_str(
            r#"{"master": ["*"], "viewer": ["property_view_available"]}"#,
        )
        .unwrap();

        assert!(table.can(Role::Master, Action::ManageUsers));
        assert!(!table.contains(Role::Editor));
        assert!(!table.can_manage_properties(Role::Editor));
    }
}
