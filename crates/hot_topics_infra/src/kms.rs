use serde_json::{json, Value};

use crate::error::SynthError;
use crate::iam::POLICY_VERSION;
use crate::stack::Scope;
use crate::template::{aws_account_id, aws_partition, join, sub, LogicalId, Resource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProps {
    pub enable_key_rotation: bool,
    pub description: Option<String>,
    /// Lets CloudWatch Logs in the stack's region use the key, required
    /// before a log group can be encrypted with it.
    pub allow_cloudwatch_logs: bool,
}

impl Default for KeyProps {
    fn default() -> Self {
        Self {
            enable_key_rotation: true,
            description: None,
            allow_cloudwatch_logs: true,
        }
    }
}

/// Customer-managed KMS key. Retained on stack deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    logical_id: LogicalId,
}

impl Key {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: KeyProps) -> Result<Self, SynthError> {
        let mut statements = vec![json!({
            "Action": "kms:*",
            "Effect": "Allow",
            "Principal": {
                "AWS": join(
                    "",
                    vec![
                        json!("arn:"),
                        aws_partition(),
                        json!(":iam::"),
                        aws_account_id(),
                        json!(":root"),
                    ],
                ),
            },
            "Resource": "*",
        })];
        if props.allow_cloudwatch_logs {
            statements.push(json!({
                "Action": [
                    "kms:Encrypt*",
                    "kms:Decrypt*",
                    "kms:ReEncrypt*",
                    "kms:GenerateDataKey*",
                    "kms:Describe*",
                ],
                "Effect": "Allow",
                "Principal": { "Service": sub("logs.${AWS::Region}.amazonaws.com") },
                "Resource": "*",
            }));
        }

        let mut properties = json!({
            "EnableKeyRotation": props.enable_key_rotation,
            "KeyPolicy": {
                "Version": POLICY_VERSION,
                "Statement": statements,
            },
        });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }

        let resource = Resource::new("AWS::KMS::Key", properties).retained();
        let logical_id = scope.add(id, resource)?;
        Ok(Self { logical_id })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn arn(&self) -> Value {
        self.logical_id.get_att("Arn")
    }
}
