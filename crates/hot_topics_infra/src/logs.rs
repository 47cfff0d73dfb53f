use serde_json::{json, Value};

use crate::error::SynthError;
use crate::kms::Key;
use crate::stack::Scope;
use crate::template::{LogicalId, Resource};

pub const DEFAULT_RETENTION_DAYS: u32 = 731;

#[derive(Debug, Clone, PartialEq)]
pub struct LogGroupProps {
    pub retention_days: u32,
    pub encryption_key: Option<Key>,
}

impl Default for LogGroupProps {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            encryption_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogGroup {
    logical_id: LogicalId,
}

impl LogGroup {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: LogGroupProps) -> Result<Self, SynthError> {
        let mut properties = json!({ "RetentionInDays": props.retention_days });
        let mut resource_deps = Vec::new();
        if let Some(key) = &props.encryption_key {
            properties["KmsKeyId"] = key.arn();
            resource_deps.push(key.logical_id().clone());
        }

        let mut resource = Resource::new("AWS::Logs::LogGroup", properties).retained();
        for dependency in &resource_deps {
            resource = resource.depends_on(dependency);
        }
        let logical_id = scope.add(id, resource)?;
        Ok(Self { logical_id })
    }

    pub fn log_group_name(&self) -> Value {
        self.logical_id.reference()
    }

    pub fn arn(&self) -> Value {
        self.logical_id.get_att("Arn")
    }

    /// Adds a stream with a fixed name to this group.
    pub fn add_stream(
        &self,
        scope: &mut Scope<'_>,
        id: &str,
        stream_name: &str,
    ) -> Result<LogStream, SynthError> {
        let logical_id = scope.add(
            id,
            Resource::new(
                "AWS::Logs::LogStream",
                json!({
                    "LogGroupName": self.log_group_name(),
                    "LogStreamName": stream_name,
                }),
            )
            .retained(),
        )?;
        Ok(LogStream {
            logical_id,
            name: stream_name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogStream {
    logical_id: LogicalId,
    name: String,
}

impl LogStream {
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use crate::kms::KeyProps;
    use crate::stack::Stack;

    use super::*;

    #[test]
    fn encrypted_log_group_references_key_arn() {
        let mut stack = Stack::new("testStack");
        let mut root = stack.root();
        let key = Key::new(&mut root, "Key", KeyProps::default()).expect("key should register");
        let group = LogGroup::new(
            &mut root,
            "Group",
            LogGroupProps {
                encryption_key: Some(key),
                ..LogGroupProps::default()
            },
        )
        .expect("group should register");
        group
            .add_stream(&mut root, "Stream", "S3Delivery")
            .expect("stream should register");

        let template = stack.synth().to_json();
        assert_eq!(
            template["Resources"]["Group"]["Properties"]["KmsKeyId"],
            json!({"Fn::GetAtt": ["Key", "Arn"]})
        );
        assert_eq!(template["Resources"]["Group"]["DependsOn"], json!(["Key"]));
        assert_eq!(
            template["Resources"]["Stream"]["Properties"]["LogGroupName"],
            json!({"Ref": "Group"})
        );
    }
}
