use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

const LOGICAL_ID_HASH_LEN: usize = 8;
const MAX_LOGICAL_ID_LEN: usize = 255;

/// CloudFormation logical id of a resource within one template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derives a logical id from a construct path such as
    /// `Integration/TopicMappings/Topics`.
    ///
    /// Top-level constructs keep their id verbatim. Nested paths concatenate
    /// the alphanumeric parts of each component and append a short hash of
    /// the full path, so two paths that flatten to the same text still get
    /// distinct ids. `Resource` and `Default` components are dropped from the
    /// readable part only.
    pub fn from_path(path: &str) -> Self {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.len() == 1 {
            return Self(alphanumeric(components[0]));
        }

        let mut readable: String = components
            .iter()
            .filter(|component| !matches!(**component, "Resource" | "Default"))
            .map(|component| alphanumeric(component))
            .collect();
        readable.truncate(MAX_LOGICAL_ID_LEN - LOGICAL_ID_HASH_LEN);

        let mut hasher = Sha256::new();
        hasher.update(components.join("/"));
        let digest = format!("{:X}", hasher.finalize());
        Self(format!("{readable}{}", &digest[..LOGICAL_ID_HASH_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"Ref": id}`
    pub fn reference(&self) -> Value {
        reference(&self.0)
    }

    /// `{"Fn::GetAtt": [id, attribute]}`
    pub fn get_att(&self, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [self.0, attribute] })
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn alphanumeric(component: &str) -> String {
    component
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

/// Deletion and replacement policy that keeps the physical resource.
pub const RETAIN: &str = "Retain";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<&'static str>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<&'static str>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        }
    }

    pub fn depends_on(mut self, logical_id: &LogicalId) -> Self {
        if !self.depends_on.contains(logical_id) {
            self.depends_on.push(logical_id.clone());
            self.depends_on.sort();
        }
        self
    }

    /// Keeps the resource when it leaves the stack or is replaced.
    pub fn retained(mut self) -> Self {
        self.update_replace_policy = Some(RETAIN);
        self.deletion_policy = Some(RETAIN);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Output {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// A synthesized CloudFormation template.
///
/// Every section is an ordered map, so identical stacks serialize to
/// identical JSON and share a [`Template::fingerprint`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<LogicalId, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(id, _)| id.as_str() == logical_id)
            .map(|(_, resource)| resource)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource.resource_type == resource_type)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("serialization of template should not fail")
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("serialization of template should not fail")
    }

    /// SHA-256 of the compact template JSON.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(stable_template_json(self));
        format!("{:x}", hasher.finalize())
    }
}

pub fn stable_template_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of template value should not fail")
}

pub fn reference(name: &str) -> Value {
    json!({ "Ref": name })
}

pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// `Fn::Join`, folded to a plain string when every part is already literal.
///
/// Parts that are themselves a `Fn::Join` over the same delimiter are spliced
/// in, so wrapping an existing join never nests.
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    let mut folded: Vec<Value> = Vec::with_capacity(parts.len());
    for part in parts.into_iter().flat_map(|part| splice_join(delimiter, part)) {
        if delimiter.is_empty() {
            if let (Some(Value::String(previous)), Value::String(next)) = (folded.last_mut(), &part)
            {
                previous.push_str(next);
                continue;
            }
        }
        folded.push(part);
    }

    if folded.iter().all(Value::is_string) {
        let literal: Vec<&str> = folded.iter().filter_map(Value::as_str).collect();
        return Value::String(literal.join(delimiter));
    }

    json!({ "Fn::Join": [delimiter, folded] })
}

fn splice_join(delimiter: &str, part: Value) -> Vec<Value> {
    let nested = part
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.get("Fn::Join"))
        .and_then(Value::as_array)
        .filter(|args| args.len() == 2 && args[0].as_str() == Some(delimiter))
        .and_then(|args| args[1].as_array());
    match nested {
        Some(inner) => inner.clone(),
        None => vec![part],
    }
}

/// `arn:<partition>:<service>:<region>:<account>:<resource...>`
pub fn regional_arn(service: &str, resource: Vec<Value>) -> Value {
    let mut parts = vec![
        json!("arn:"),
        aws_partition(),
        json!(format!(":{service}:")),
        aws_region(),
        json!(":"),
        aws_account_id(),
        json!(":"),
    ];
    parts.extend(resource);
    join("", parts)
}

pub fn aws_region() -> Value {
    reference("AWS::Region")
}

pub fn aws_account_id() -> Value {
    reference("AWS::AccountId")
}

pub fn aws_partition() -> Value {
    reference("AWS::Partition")
}

pub fn aws_stack_name() -> Value {
    reference("AWS::StackName")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_logical_id_keeps_construct_id() {
        assert_eq!(LogicalId::from_path("AccessLog").as_str(), "AccessLog");
        assert_eq!(LogicalId::from_path("Access-Log").as_str(), "AccessLog");
    }

    #[test]
    fn nested_logical_id_appends_path_hash() {
        let id = LogicalId::from_path("Integration/TopicMappings/Topics");
        assert!(id.as_str().starts_with("IntegrationTopicMappingsTopics"));
        assert_eq!(id.as_str().len(), "IntegrationTopicMappingsTopics".len() + 8);
        assert_eq!(id, LogicalId::from_path("Integration/TopicMappings/Topics"));
    }

    #[test]
    fn flattened_collisions_get_distinct_hashes() {
        let first = LogicalId::from_path("A/BC");
        let second = LogicalId::from_path("AB/C");
        assert_ne!(first, second);
    }

    #[test]
    fn resource_component_is_hidden_from_readable_part() {
        let id = LogicalId::from_path("Ingestion/Role/Resource");
        assert!(id.as_str().starts_with("IngestionRole"));
        assert!(!id.as_str().contains("Resource"));
    }

    #[test]
    fn join_folds_literals() {
        let joined = join("", vec![json!("s3://"), json!("bucket"), json!("/raw/")]);
        assert_eq!(joined, json!("s3://bucket/raw/"));
    }

    #[test]
    fn join_keeps_intrinsics() {
        let joined = join(
            "",
            vec![json!("arn:"), aws_partition(), json!(":s3:::"), json!("b")],
        );
        assert_eq!(
            joined,
            json!({ "Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":s3:::b"]] })
        );
    }

    #[test]
    fn join_splices_nested_join_with_same_delimiter() {
        let arn = join("", vec![json!("arn:"), aws_partition(), json!(":s3:::b")]);
        let objects = join("", vec![arn, json!("/*")]);
        assert_eq!(
            objects,
            json!({ "Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":s3:::b/*"]] })
        );
    }

    #[test]
    fn join_keeps_nested_join_with_other_delimiter() {
        let names = join(",", vec![json!("a"), aws_region()]);
        let joined = join("", vec![json!("x-"), names.clone()]);
        assert_eq!(joined, json!({ "Fn::Join": ["", ["x-", names]] }));
    }

    #[test]
    fn resource_serializes_optional_sections_only_when_set() {
        let bare = serde_json::to_value(Resource::new("AWS::S3::Bucket", Value::Null))
            .expect("resource should serialize");
        assert_eq!(bare, json!({ "Type": "AWS::S3::Bucket" }));

        let retained = Resource::new("AWS::KMS::Key", json!({ "EnableKeyRotation": true }))
            .retained();
        let value = serde_json::to_value(retained).expect("resource should serialize");
        assert_eq!(value["DeletionPolicy"], json!("Retain"));
        assert_eq!(value["UpdateReplacePolicy"], json!("Retain"));
    }
}
