use serde_json::{json, Value};

use crate::error::SynthError;
use crate::stack::Scope;
use crate::template::{aws_partition, join, LogicalId, Resource};

/// S3-managed server-side encryption.
const SSE_ALGORITHM: &str = "AES256";
const LOG_DELIVERY_WRITE: &str = "LogDeliveryWrite";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerAccessLogs {
    pub destination: BucketRef,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketProps {
    pub versioned: bool,
    /// Grants the S3 log delivery group write access, for access-log targets.
    pub log_delivery_write: bool,
    pub block_public_access: bool,
    pub server_access_logs: Option<ServerAccessLogs>,
}

impl Default for BucketProps {
    fn default() -> Self {
        Self {
            versioned: false,
            log_delivery_write: false,
            block_public_access: true,
            server_access_logs: None,
        }
    }
}

/// Bucket declared in this stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    logical_id: LogicalId,
    bucket_ref: BucketRef,
}

impl Bucket {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: BucketProps) -> Result<Self, SynthError> {
        let mut properties = json!({
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": SSE_ALGORITHM },
                }],
            },
        });
        if props.log_delivery_write {
            properties["AccessControl"] = json!(LOG_DELIVERY_WRITE);
        }
        if props.block_public_access {
            properties["PublicAccessBlockConfiguration"] = json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            });
        }
        if props.versioned {
            properties["VersioningConfiguration"] = json!({ "Status": "Enabled" });
        }
        if let Some(logs) = &props.server_access_logs {
            properties["LoggingConfiguration"] = json!({
                "DestinationBucketName": logs.destination.bucket_name(),
                "LogFilePrefix": logs.prefix,
            });
        }

        let resource = Resource::new("AWS::S3::Bucket", properties).retained();
        let logical_id = scope.add(id, resource)?;
        let bucket_ref = BucketRef {
            name: logical_id.reference(),
            arn: logical_id.get_att("Arn"),
        };
        Ok(Self {
            logical_id,
            bucket_ref,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn bucket_ref(&self) -> &BucketRef {
        &self.bucket_ref
    }
}

/// Name and ARN of a bucket, owned by this stack or imported by name.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRef {
    name: Value,
    arn: Value,
}

impl BucketRef {
    pub fn from_bucket_name(name: &str) -> Self {
        Self {
            name: json!(name),
            arn: join(
                "",
                vec![json!("arn:"), aws_partition(), json!(":s3:::"), json!(name)],
            ),
        }
    }

    pub fn bucket_name(&self) -> &Value {
        &self.name
    }

    pub fn arn(&self) -> &Value {
        &self.arn
    }

    pub fn arn_for_objects(&self, key_pattern: &str) -> Value {
        join("", vec![self.arn.clone(), json!(format!("/{key_pattern}"))])
    }

    pub fn s3_url_for_prefix(&self, prefix: &str) -> Value {
        join(
            "",
            vec![json!("s3://"), self.name.clone(), json!(format!("/{prefix}"))],
        )
    }
}
