use serde::Serialize;
use serde_json::{json, Value};

use crate::error::SynthError;
use crate::stack::Scope;
use crate::template::{LogicalId, Resource};

pub const POLICY_VERSION: &str = "2012-10-17";

const ALLOW: &str = "Allow";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: &'static str,
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    #[serde(rename = "Resource")]
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            effect: ALLOW,
            actions: actions.iter().map(|action| action.to_string()).collect(),
            resources,
        }
    }
}

/// Inline policy attached to a role.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub statements: Vec<PolicyStatement>,
}

impl Policy {
    pub fn new(name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "PolicyName": self.name,
            "PolicyDocument": {
                "Version": POLICY_VERSION,
                "Statement": self.statements,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleProps {
    /// Service principal allowed to assume the role, e.g. `events.amazonaws.com`.
    pub assumed_by: String,
    pub description: Option<String>,
    pub policies: Vec<Policy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    logical_id: LogicalId,
}

impl Role {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: RoleProps) -> Result<Self, SynthError> {
        let mut properties = json!({
            "AssumeRolePolicyDocument": {
                "Version": POLICY_VERSION,
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": props.assumed_by },
                }],
            },
        });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        if !props.policies.is_empty() {
            let policies: Vec<Value> = props.policies.iter().map(Policy::to_value).collect();
            properties["Policies"] = Value::Array(policies);
        }

        let logical_id = scope.add(id, Resource::new("AWS::IAM::Role", properties))?;
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
    use crate::stack::Stack;

    use super::*;

    #[test]
    fn role_carries_trust_and_inline_policies() {
        let mut stack = Stack::new("testStack");
        let role = Role::new(
            &mut stack.root(),
            "EventsRole",
            RoleProps {
                assumed_by: "events.amazonaws.com".to_string(),
                description: None,
                policies: vec![Policy::new(
                    "StartExecution",
                    vec![PolicyStatement::allow(
                        &["states:StartExecution"],
                        vec![json!("arn:aws:states:::stateMachine:x")],
                    )],
                )],
            },
        )
        .expect("role should register");

        let template = stack.synth().to_json();
        let properties = &template["Resources"][role.logical_id().as_str()]["Properties"];
        assert_eq!(
            properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            json!("events.amazonaws.com")
        );
        assert_eq!(
            properties["Policies"][0]["PolicyDocument"]["Statement"][0],
            json!({
                "Effect": "Allow",
                "Action": ["states:StartExecution"],
                "Resource": ["arn:aws:states:::stateMachine:x"],
            })
        );
        assert!(properties.get("Description").is_none());
    }
}
