use std::collections::BTreeMap;

use skeet_common::target_info::TargetInfo;

/// Key in the targets ConfigMap holding the JSON description of the target.
pub const TARGETS_MAP_KEY: &str = "targets.json";

/// Name of the ConfigMap benchmark drivers mount to discover the target.
pub fn targets_config_map_name(name: &str) -> String {
    format!("{name}-targets")
}

/// Data for the targets ConfigMap.
pub fn targets_config_map_data(info: &TargetInfo) -> BTreeMap<String, String> {
    BTreeMap::from_iter(vec![(
        TARGETS_MAP_KEY.to_owned(),
        serde_json::to_string(info).expect("should be able to serialize TargetInfo"),
    )])
}
