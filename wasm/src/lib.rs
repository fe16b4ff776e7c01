//! WebAssembly module for PropMaster
//!
//! Lets the browser ask the same permission questions as the server, so
//! menus and buttons match what the API will accept:
//! - Role checks against the built-in role table
//! - Role resolution for the signed-in account
//! - Finance summaries and input checks for offline forms

use rust_decimal::Decimal;
use shared::access::{AccessPolicy, Action, Capability, Role, RoleTable, SessionUser};
use shared::models::{FinanceRecord, FinanceSummary};
use wasm_bindgen::prelude::*;

fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn parse_action(action: &str) -> Option<Action> {
    match action.parse::<Action>() {
        Ok(action) => Some(action),
        Err(e) => {
            warn(&e.to_string());
            None
        }
    }
}

fn capability_names(role: &str) -> Vec<&'static str> {
    let table = RoleTable::default();
    Capability::ALL
        .into_iter()
        .filter(|c| c.is_granted(&table, role))
        .map(|c| c.as_str())
        .collect()
}

/// `can(role, action)` against the built-in table; unknown actions are denied
#[wasm_bindgen]
pub fn can(role: &str, action: &str) -> bool {
    parse_action(action)
        .map(|action| RoleTable::default().can(role, action))
        .unwrap_or(false)
}

#[wasm_bindgen(js_name = canDeleteProperty)]
pub fn can_delete_property(role: &str) -> bool {
    RoleTable::default().can_delete_property(role)
}

#[wasm_bindgen(js_name = canManageUsers)]
pub fn can_manage_users(role: &str) -> bool {
    RoleTable::default().can_manage_users(role)
}

#[wasm_bindgen(js_name = canViewAllFinances)]
pub fn can_view_all_finances(role: &str) -> bool {
    RoleTable::default().can_view_all_finances(role)
}

#[wasm_bindgen(js_name = canManageOwnFinances)]
pub fn can_manage_own_finances(role: &str) -> bool {
    RoleTable::default().can_manage_own_finances(role)
}

#[wasm_bindgen(js_name = canManageProperties)]
pub fn can_manage_properties(role: &str) -> bool {
    RoleTable::default().can_manage_properties(role)
}

#[wasm_bindgen(js_name = canViewAvailableProperties)]
pub fn can_view_available_properties(role: &str) -> bool {
    RoleTable::default().can_view_available_properties(role)
}

#[wasm_bindgen(js_name = canAccessArchive)]
pub fn can_access_archive(role: &str) -> bool {
    RoleTable::default().can_access_archive(role)
}

/// Effective role of an account, as the server would resolve it
#[wasm_bindgen(js_name = resolveRole)]
pub fn resolve_role(email: Option<String>, stored_role: Option<String>, master_email: &str) -> String {
    let policy = AccessPolicy::with_master(master_email);
    let user = email.map(|email| SessionUser {
        user_id: None,
        email,
        name: None,
        role: stored_role,
    });

    policy.resolve_role(user.as_ref()).as_str().to_string()
}

/// Capability names granted to a role
#[wasm_bindgen]
pub fn capabilities(role: &str) -> js_sys::Array {
    capability_names(role)
        .into_iter()
        .map(JsValue::from_str)
        .collect()
}

/// Badge text for a role tag, `Viewer` for anything unrecognized
#[wasm_bindgen(js_name = roleDisplayName)]
pub fn role_display_name(role: &str) -> String {
    role.parse::<Role>()
        .unwrap_or(Role::Viewer)
        .display_name()
        .to_string()
}

/// Summarize finance records given as a JSON array
#[wasm_bindgen(js_name = summarizeFinances)]
pub fn summarize_finances(records_json: &str) -> Result<String, JsValue> {
    let records: Vec<FinanceRecord> = serde_json::from_str(records_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid records JSON: {}", e)))?;

    serde_json::to_string(&FinanceSummary::from_records(&records))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Payment amounts must be strictly positive
#[wasm_bindgen(js_name = isValidAmount)]
pub fn is_valid_amount(amount: f64) -> bool {
    Decimal::try_from(amount)
        .map(|amount| shared::validation::validate_positive(&amount).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_uses_builtin_table() {
        assert!(can("master", "delete"));
        assert!(can("editor", "property_manage"));
        assert!(!can("viewer", "finance_own"));
        assert!(!can("viewer", "not_an_action"));
    }

    #[test]
    fn test_derived_checks() {
        assert!(can_manage_own_finances("master"));
        assert!(can_view_available_properties("editor"));
        assert!(!can_manage_users("editor"));
        assert!(can_access_archive("master"));
        assert!(!can_access_archive("editor"));
    }

    #[test]
    fn test_resolve_role() {
        let master = "owner@propmaster.test";
        assert_eq!(resolve_role(None, None, master), "viewer");
        assert_eq!(
            resolve_role(Some(master.to_string()), Some("viewer".to_string()), master),
            "master"
        );
        assert_eq!(
            resolve_role(Some("a@b.com".to_string()), Some("bogus".to_string()), master),
            "viewer"
        );
    }

    #[test]
    fn test_capability_names() {
        assert_eq!(capability_names("viewer"), vec!["view_available_properties"]);
        assert_eq!(capability_names("master").len(), Capability::ALL.len());
        assert!(capability_names("nobody").is_empty());
    }

    #[test]
    fn test_role_display_name() {
        assert_eq!(role_display_name("editor"), "Editor");
        assert_eq!(role_display_name("superuser"), "Viewer");
    }

    #[test]
    fn test_amount_validation() {
        assert!(is_valid_amount(1500.0));
        assert!(!is_valid_amount(0.0));
        assert!(!is_valid_amount(-10.0));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize_finances("[]").unwrap();
        assert!(summary.contains("\"totalRecords\":0"));
    }
}
