// gallery-core/src/install/merge.rs
use serde_yaml_ng::{Mapping, Value};
use tracing::debug;

/// Recursively merges `overrides` into `base`. Nested mappings are merged key
/// by key; any other value in `overrides` replaces the one in `base`.
pub fn deep_merge(base: &mut Mapping, overrides: &Mapping) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(nested)) => {
                deep_merge(existing, nested);
            }
            (Some(existing), _) => {
                if existing != value {
                    debug!("Override replaces {:?}: {:?} -> {:?}", key, existing, value);
                }
                *existing = value.clone();
            }
            (None, _) => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Catalog-declared overrides with the request's overrides applied on top.
pub fn merge_overrides(element: &Mapping, request: &Mapping) -> Mapping {
    let mut merged = element.clone();
    deep_merge(&mut merged, request);
    merged
}
