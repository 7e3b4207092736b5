//! Operational metadata redaction for leaked objects

use serde_json::Value;

/// Annotation written by `kubectl apply`
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Strip `metadata.managedFields` and the last-applied annotation in place.
///
/// Application data is never touched.
pub fn redact_object(object: &mut Value) {
    let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) else {
        return;
    };

    metadata.remove("managedFields");

    if let Some(annotations) = metadata
        .get_mut("annotations")
        .and_then(Value::as_object_mut)
    {
        annotations.remove(LAST_APPLIED_ANNOTATION);
    }
}

/// Redact every object of a leaked list
pub fn redact_items(mut items: Vec<Value>) -> Vec<Value> {
    items.iter_mut().for_each(redact_object);
    items
}
