use std::collections::BTreeMap;

use serde_json::Value;

/// Module flags implied by a policy's settings: every top-level section that is
/// an object with a boolean `enabled` contributes `section -> enabled`.
pub fn module_flags_from_settings(settings: &Value) -> BTreeMap<String, bool> {
    let Some(sections) = settings.as_object() else {
        return BTreeMap::new();
    };
    sections
        .iter()
        .filter_map(|(name, section)| {
            section
                .get("enabled")
                .and_then(Value::as_bool)
                .map(|enabled| (name.clone(), enabled))
        })
        .collect()
}
