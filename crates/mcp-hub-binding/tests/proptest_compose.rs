// crates/mcp-hub-binding/tests/proptest_compose.rs
// ============================================================================
// Module: Composition Property Tests
// Description: Property-based checks for path composition.
// Purpose: Ensure composed paths are brace-free and missing keys always fail
//          with a binding error.
// Dependencies: mcp-hub-binding, mcp-hub-core, proptest
// ============================================================================

//! Path composition property tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use mcp_hub_binding::BindingError;
use mcp_hub_binding::compose_path;
use mcp_hub_core::Arguments;
use mcp_hub_core::ArgumentMapping;
use proptest::prelude::*;
use serde_json::Value;

/// Argument values; `.` and `..` segments are rejected before substitution.
fn path_value() -> impl Strategy<Value = String> {
    any::<String>().prop_filter("dot segments are rejected", |value| {
        !value.split('/').any(|segment| segment == "." || segment == "..")
    })
}

/// Segment name -> (source key, argument value).
fn segments() -> impl Strategy<Value = BTreeMap<String, (String, String)>> {
    prop::collection::btree_map("[a-z]{1,8}", ("[a-zA-Z]{1,8}", path_value()), 1..5)
}

fn template_for(segments: &BTreeMap<String, (String, String)>) -> String {
    segments.keys().map(|segment| format!("/{segment}/{{{segment}}}")).collect()
}

fn mapping_for(segments: &BTreeMap<String, (String, String)>) -> ArgumentMapping {
    let mut mapping = ArgumentMapping::default();
    for (segment, (source, _)) in segments {
        mapping.path.insert(segment.clone(), source.clone());
    }
    mapping
}

proptest! {
    #[test]
    fn composed_paths_never_contain_braces(segments in segments()) {
        let template = template_for(&segments);
        let mapping = mapping_for(&segments);
        let mut args = Arguments::new();
        for (source, value) in segments.values() {
            args.insert(source.clone(), Value::String(value.clone()));
        }
        let path = compose_path(&template, &mapping, &args).unwrap();
        prop_assert!(!path.contains(['{', '}']), "braces left in {}", path);
    }

    #[test]
    fn missing_path_keys_always_fail_with_missing_argument(
        segments in segments(),
        drop_index in any::<prop::sample::Index>(),
    ) {
        let template = template_for(&segments);
        let mapping = mapping_for(&segments);
        let sources: Vec<&String> = segments.values().map(|(source, _)| source).collect();
        let dropped = sources[drop_index.index(sources.len())].clone();
        let mut args = Arguments::new();
        for (source, value) in segments.values() {
            if *source != dropped {
                args.insert(source.clone(), Value::String(value.clone()));
            }
        }
        let err = compose_path(&template, &mapping, &args).unwrap_err();
        prop_assert_eq!(err, BindingError::MissingArgument(dropped));
    }
}
