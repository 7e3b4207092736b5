//! Depth-first sensitive field resolution over the schema graph
//!
//! Walks object properties from a resource's request body schema and records
//! the `$`-rooted path of every property the classifier accepts. Named
//! references are resolved through the [`SchemaMap`]; references already
//! open on the current branch are not re-entered, so cyclic definitions
//! terminate while the same definition reached through different paths is
//! still reported at each path.

use super::classifier::FieldClassifier;
use super::document::{SchemaMap, SchemaNode};
use std::collections::{BTreeSet, HashSet};

/// Root segment of every sensitive field path
pub const PATH_ROOT: &str = "$";

/// Sensitive field paths found for one resource
pub type SensitiveFields = BTreeSet<String>;

/// Resolves sensitive field paths for one body schema
pub struct SchemaResolver<'a> {
    definitions: &'a SchemaMap,
    classifier: &'a dyn FieldClassifier,
}

impl<'a> SchemaResolver<'a> {
    /// Create a resolver over `definitions` using `classifier`
    pub fn new(definitions: &'a SchemaMap, classifier: &'a dyn FieldClassifier) -> Self {
        Self {
            definitions,
            classifier,
        }
    }

    /// Collect every sensitive field path reachable from `root`
    pub fn resolve(&self, root: &SchemaNode) -> SensitiveFields {
        let mut walk = Walk {
            definitions: self.definitions,
            classifier: self.classifier,
            open: HashSet::new(),
            found: BTreeSet::new(),
        };
        walk.visit(root, &[PATH_ROOT.to_string()]);
        walk.found
    }
}

struct Walk<'a> {
    definitions: &'a SchemaMap,
    classifier: &'a dyn FieldClassifier,
    /// References open on the active branch
    open: HashSet<&'a str>,
    found: SensitiveFields,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, node: &'a SchemaNode, path: &[String]) {
        let Some(name) = node.reference_name() else {
            self.visit_object(node, path);
            return;
        };

        if self.open.contains(name) {
            tracing::trace!("Cycle cut at {} ({})", name, path.join("."));
            return;
        }
        let Some(target) = self.definitions.get(name) else {
            return;
        };

        self.open.insert(name);
        self.visit(target, path);
        self.open.remove(name);
    }

    fn visit_object(&mut self, node: &'a SchemaNode, path: &[String]) {
        for (property, child) in &node.properties {
            let mut child_path = path.to_vec();
            child_path.push(property.clone());

            if self.classifier.is_sensitive(property) {
                self.found.insert(child_path.join("."));
            }

            self.visit(child, &child_path);
        }

        // Array items and map values add no path segment
        if let Some(items) = node.items.as_deref() {
            self.visit(items, path);
        }
        if let Some(values) = node.additional_schema() {
            self.visit(values, path);
        }
    }
}
