use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::SynthError;
use crate::iam::Role;
use crate::stack::Scope;
use crate::template::{aws_region, join, LogicalId, Resource};

/// Custom runtime used by the Rust `bootstrap` binaries.
pub const PROVIDED_RUNTIME: &str = "provided.al2023";
pub const BOOTSTRAP_HANDLER: &str = "bootstrap";

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCode {
    pub s3_bucket: Value,
    pub s3_key: String,
}

impl FunctionCode {
    /// Zip published to the regional `solutions-<region>` asset bucket.
    pub fn solution_asset(solution_name: &str, artifact: &str) -> Self {
        Self {
            s3_bucket: join("", vec![json!("solutions-"), aws_region()]),
            s3_key: format!("{solution_name}/{artifact}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProps<'a> {
    pub description: Option<String>,
    pub code: FunctionCode,
    pub role: &'a Role,
    pub environment: BTreeMap<String, Value>,
    pub memory_size_mb: u32,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    logical_id: LogicalId,
}

impl Function {
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: FunctionProps<'_>,
    ) -> Result<Self, SynthError> {
        let mut properties = json!({
            "Code": {
                "S3Bucket": props.code.s3_bucket,
                "S3Key": props.code.s3_key,
            },
            "Handler": BOOTSTRAP_HANDLER,
            "MemorySize": props.memory_size_mb,
            "Role": props.role.arn(),
            "Runtime": PROVIDED_RUNTIME,
            "Timeout": props.timeout_seconds,
        });
        if !props.environment.is_empty() {
            properties["Environment"] = json!({ "Variables": props.environment });
        }
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }

        let resource = Resource::new("AWS::Lambda::Function", properties)
            .depends_on(props.role.logical_id());
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

#[cfg(test)]
mod tests {
    use crate::iam::RoleProps;
    use crate::stack::Stack;

    use super::*;

    #[test]
    fn function_runs_bootstrap_from_solution_bucket() {
        let mut stack = Stack::new("testStack");
        let function = {
            let mut root = stack.root();
            let role = Role::new(
                &mut root,
                "Role",
                RoleProps {
                    assumed_by: "lambda.amazonaws.com".to_string(),
                    description: None,
                    policies: Vec::new(),
                },
            )
            .expect("role should register");
            Function::new(
                &mut root,
                "Fn",
                FunctionProps {
                    description: None,
                    code: FunctionCode::solution_asset("SO0122", "producer.zip"),
                    role: &role,
                    environment: BTreeMap::new(),
                    memory_size_mb: 128,
                    timeout_seconds: 30,
                },
            )
            .expect("function should register")
        };

        let template = stack.synth();
        let resource = template
            .resource(function.logical_id().as_str())
            .expect("function should exist");
        assert_eq!(resource.properties["Handler"], json!("bootstrap"));
        assert_eq!(resource.properties["Code"]["S3Key"], json!("SO0122/producer.zip"));
        assert_eq!(
            resource.properties["Code"]["S3Bucket"],
            json!({"Fn::Join": ["", ["solutions-", {"Ref": "AWS::Region"}]]})
        );
        assert!(resource.property("Environment").is_none());
        assert_eq!(resource.depends_on, vec![LogicalId::from_path("Role")]);
    }
}
