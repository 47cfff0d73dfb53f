use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SynthError;
use crate::template::{LogicalId, Output, Resource, Template, TEMPLATE_FORMAT_VERSION};

/// A named collection of resources that deploys as one template.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: BTreeMap<LogicalId, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope rooted at the stack; constructs add resources through it.
    pub fn root(&mut self) -> Scope<'_> {
        Scope {
            stack: self,
            path: String::new(),
        }
    }

    pub fn resource(&self, logical_id: &LogicalId) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn add_output(
        &mut self,
        name: &str,
        description: Option<&str>,
        value: serde_json::Value,
    ) -> Result<(), SynthError> {
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateLogicalId {
                logical_id: name.to_string(),
                path: format!("Outputs/{name}"),
            });
        }
        self.outputs.insert(
            name.to_string(),
            Output {
                description: description.map(str::to_string),
                value,
            },
        );
        Ok(())
    }

    fn add_resource(&mut self, path: &str, resource: Resource) -> Result<LogicalId, SynthError> {
        let logical_id = LogicalId::from_path(path);
        if logical_id.as_str().is_empty() {
            return Err(SynthError::invalid_config(format!(
                "construct path '{path}' has no alphanumeric characters for a logical id"
            )));
        }
        if self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId {
                logical_id: logical_id.to_string(),
                path: path.to_string(),
            });
        }

        debug!(
            stack = %self.name,
            %logical_id,
            resource_type = %resource.resource_type,
            "adding resource"
        );
        self.resources.insert(logical_id.clone(), resource);
        Ok(logical_id)
    }

    pub fn synth(&self) -> Template {
        Template {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

/// A position in the construct tree of one stack.
#[derive(Debug)]
pub struct Scope<'a> {
    stack: &'a mut Stack,
    path: String,
}

impl Scope<'_> {
    pub fn child(&mut self, id: &str) -> Scope<'_> {
        let path = join_path(&self.path, id);
        Scope {
            stack: &mut *self.stack,
            path,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stack_name(&self) -> &str {
        self.stack.name()
    }

    /// Registers `resource` at `{path}/{id}`.
    pub fn add(&mut self, id: &str, resource: Resource) -> Result<LogicalId, SynthError> {
        let path = join_path(&self.path, id);
        self.stack.add_resource(&path, resource)
    }
}

fn join_path(parent: &str, id: &str) -> String {
    if parent.is_empty() {
        id.to_string()
    } else {
        format!("{parent}/{id}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_duplicate_construct_paths() {
        let mut stack = Stack::new("testStack");
        let mut root = stack.root();
        root.add("Bucket", Resource::new("AWS::S3::Bucket", json!({})))
            .expect("first bucket should register");

        let error = root
            .add("Bucket", Resource::new("AWS::S3::Bucket", json!({})))
            .expect_err("duplicate bucket should fail");
        assert_eq!(
            error,
            SynthError::DuplicateLogicalId {
                logical_id: "Bucket".to_string(),
                path: "Bucket".to_string(),
            }
        );
    }

    #[test]
    fn rejects_ids_without_alphanumerics() {
        let mut stack = Stack::new("testStack");
        let error = stack
            .root()
            .add("--", Resource::new("AWS::S3::Bucket", json!({})))
            .expect_err("empty logical id should fail");

        assert_eq!(
            error,
            SynthError::invalid_config(
                "construct path '--' has no alphanumeric characters for a logical id"
            )
        );
        assert!(stack.synth().resources.is_empty());
    }

    #[test]
    fn child_scopes_extend_the_construct_path() {
        let mut stack = Stack::new("testStack");
        let logical_id = {
            let mut root = stack.root();
            let mut integration = root.child("Integration");
            let mut table = integration.child("Sentiment");
            assert_eq!(table.path(), "Integration/Sentiment");
            table
                .add("Table", Resource::new("AWS::Glue::Table", json!({})))
                .expect("table should register")
        };

        assert_eq!(logical_id, LogicalId::from_path("Integration/Sentiment/Table"));
        assert!(stack.resource(&logical_id).is_some());
    }

    #[test]
    fn synth_is_stable_for_identical_stacks() {
        let build = || {
            let mut stack = Stack::new("testStack").with_description("desc");
            let mut root = stack.root();
            root.add("B", Resource::new("AWS::S3::Bucket", json!({})))
                .expect("bucket should register");
            root.add("A", Resource::new("AWS::S3::Bucket", json!({})))
                .expect("bucket should register");
            stack
                .add_output("BucketName", None, json!({"Ref": "A"}))
                .expect("output should register");
            stack.synth()
        };

        let first = build();
        let second = build();
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.to_json()["Description"], json!("desc"));
        let ids: Vec<&str> = first.resources.keys().map(LogicalId::as_str).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
