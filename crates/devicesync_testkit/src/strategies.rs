//! Proptest strategies.

use proptest::prelude::*;
use std::collections::BTreeSet;

/// Edge names: mixed case, unique once lowercased.
pub fn edge_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z0-9-]{0,8}", 0..max).prop_flat_map(|lower| {
        let len = lower.len();
        (Just(lower), prop::collection::vec(any::<bool>(), len))
    })
    .prop_map(|(lower, upper): (BTreeSet<String>, Vec<bool>)| {
        lower
            .into_iter()
            .zip(upper)
            .map(|(name, up)| {
                if up {
                    let mut chars = name.chars();
                    chars
                        .next()
                        .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
                        .unwrap_or_default()
                } else {
                    name
                }
            })
            .collect()
    })
}

/// Property values as the edge platform reports them.
pub fn property_value() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        "[a-z]{1,6}",
    ]
}
