use std::collections::BTreeMap;

/// Create labels that can be used as a unique selector for a given app name.
pub fn selector_labels(app: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from_iter(vec![(
        "app".to_owned(),
        app.to_owned(),
    )]))
}

/// Managed by label
pub const MANAGED_BY_LABEL_SELECTOR: &str = "managed-by=skeet";

/// Labels that indicate the resource is managed by the skeet operator.
pub fn managed_labels() -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from_iter(vec![(
        "managed-by".to_owned(),
        "skeet".to_owned(),
    )]))
}

/// Extend existing labels with the managed by labels.
pub fn managed_labels_extend(
    labels: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match labels {
        Some(mut labels) => {
            labels.extend(managed_labels().unwrap_or_default());
            Some(labels)
        }
        None => managed_labels(),
    }
}
