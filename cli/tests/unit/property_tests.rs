//! Property-based tests for normalization, naming and rendering invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use serde_json::{Value, json};

use agentify_cli::domain::catalog::ToolCatalog;
use agentify_cli::domain::config::{VALID_CONFIG_KEYS, validate_config_key};
use agentify_cli::domain::normalize::{AGENT_NAME_PREFIX, agent_name_from_display, normalize};
use agentify_cli::domain::render::{module_name, render_tree};
use agentify_cli::domain::templates::TemplateSet;

use crate::mocks::SeqIds;

fn input(name: &str, chat: bool, automation: bool, analytics: bool) -> Value {
    json!({
        "name": name,
        "personality": "friendly",
        "instructions": "help",
        "settings": {"mcpServers": []},
        "features": {"chat": chat, "automation": automation, "analytics": analytics},
    })
}

// ============================================================================
// Naming
// ============================================================================

proptest! {
    /// Agent names always carry the URN prefix and never contain whitespace.
    #[test]
    fn prop_agent_name_is_prefixed_slug(display in "[A-Za-z0-9 ]{1,40}") {
        let name = agent_name_from_display(&display);
        prop_assert!(name.starts_with(AGENT_NAME_PREFIX));
        prop_assert!(!name.chars().any(char::is_whitespace), "whitespace in {}", name);
    }

    /// Module names are valid identifiers in both target languages.
    #[test]
    fn prop_module_name_is_identifier(tail in "[A-Za-z0-9 :_.-]{0,40}") {
        let name = module_name(&format!("{AGENT_NAME_PREFIX}{tail}"));
        let first = name.chars().next().expect("non-empty");
        prop_assert!(first.is_ascii_lowercase() || first == '_', "bad start: {}", name);
        prop_assert!(
            name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "bad char in {}",
            name
        );
    }
}

// ============================================================================
// Normalization
// ============================================================================

proptest! {
    /// Normalizing a canonical descriptor yields the same descriptor.
    #[test]
    fn prop_normalize_is_idempotent(
        name in "[A-Za-z][A-Za-z0-9 ]{0,30}",
        chat in proptest::bool::ANY,
        automation in proptest::bool::ANY,
        analytics in proptest::bool::ANY,
    ) {
        let catalog = ToolCatalog::builtin();
        let first = normalize(&input(&name, chat, automation, analytics), &catalog, &SeqIds::new("a"))
            .expect("valid");
        let second = normalize(&first.as_raw_input(), &catalog, &SeqIds::new("b"))
            .expect("canonical input stays valid");
        prop_assert_eq!(first, second);
    }

    /// Tool names are unique and follow catalog order.
    #[test]
    fn prop_enabled_features_yield_unique_tools(
        chat in proptest::bool::ANY,
        automation in proptest::bool::ANY,
        analytics in proptest::bool::ANY,
    ) {
        let d = normalize(&input("Helper", chat, automation, analytics), &ToolCatalog::builtin(), &SeqIds::new("a"))
            .expect("valid");
        let names: Vec<&str> = d.tools.iter().map(|t| t.name.as_str()).collect();
        let expected: Vec<&str> = [(chat, "chat"), (automation, "automate"), (analytics, "analyze")]
            .into_iter()
            .filter_map(|(on, n)| on.then_some(n))
            .collect();
        prop_assert_eq!(names, expected);
    }
}

// ============================================================================
// Rendering
// ============================================================================

proptest! {
    /// Rendering the same descriptor twice yields byte-identical trees.
    #[test]
    fn prop_render_is_deterministic(
        name in "[A-Za-z][A-Za-z0-9 ]{0,20}",
        bytecode in proptest::bool::ANY,
    ) {
        let mut raw = input(&name, true, true, false);
        raw["buildTarget"] = json!(if bytecode { "bytecode-module" } else { "native-module" });
        let d = normalize(&raw, &ToolCatalog::builtin(), &SeqIds::new("a")).expect("valid");
        let templates = TemplateSet::builtin();
        let a = render_tree(&d, &templates, None).expect("render");
        let b = render_tree(&d, &templates, None).expect("render");
        prop_assert_eq!(a, b);
    }
}

// ============================================================================
// Config keys
// ============================================================================

proptest! {
    /// Arbitrary keys (not in whitelist) are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,20}\\.[a-z]{1,20}") {
        if !VALID_CONFIG_KEYS.contains(&key.as_str()) {
            prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
        }
    }
}

#[test]
fn test_config_key_whitelist() {
    for key in VALID_CONFIG_KEYS {
        assert!(validate_config_key(key).is_ok(), "{key}");
    }
    assert!(validate_config_key("").is_err());
    assert!(validate_config_key("security.level").is_err());
}
