//! Scheduled trigger for the ingestion state machine and the producer
//! function it drives.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::SynthError;
use crate::events::{Rule, RuleProps, RuleTarget, RuleTrigger, Schedule};
use crate::iam::{Policy, PolicyStatement, Role, RoleProps};
use crate::lambda_fn::{Function, FunctionCode, FunctionProps};
use crate::stack::Scope;
use crate::template::{aws_stack_name, regional_arn};

pub const PRODUCER_ARTIFACT: &str = "ingestion-producer.zip";
pub const PRODUCER_MEMORY_MB: u32 = 256;
pub const PRODUCER_TIMEOUT_SECONDS: u32 = 300;
pub const PRODUCER_DESCRIPTION: &str =
    "Resolves the bearer token and plans one search per supported language";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionProps {
    pub state_machine_arn: String,
    pub solution_name: String,
    /// `(0/2 * * * ? *)`, `cron(...)` or `rate(...)`.
    pub ingest_frequency: String,
    /// Comma-separated language codes, e.g. `de,en,es`.
    pub supported_lang: String,
    pub query_parameter: String,
    /// SSM path holding the bearer token; empty lets the producer create a
    /// placeholder under `/{solution}/{stack}/` on first run.
    pub credential_key_path: String,
    pub producer_code: Option<FunctionCode>,
}

impl IngestionProps {
    pub fn supported_languages(&self) -> Vec<String> {
        self.supported_lang
            .split(',')
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    schedule: Schedule,
    schedule_rule: Rule,
    producer: Function,
}

impl Ingestion {
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: IngestionProps,
    ) -> Result<Self, SynthError> {
        let schedule = Schedule::expression(&props.ingest_frequency)?;
        let languages = props.supported_languages();
        if languages.is_empty() {
            return Err(SynthError::invalid_config("supported_lang cannot be empty"));
        }
        if props.state_machine_arn.trim().is_empty() {
            return Err(SynthError::invalid_config("state_machine_arn cannot be empty"));
        }
        if props.solution_name.trim().is_empty() {
            return Err(SynthError::invalid_config("solution_name cannot be empty"));
        }

        let mut scope = scope.child(id);

        let producer_role = Role::new(
            &mut scope,
            "ProducerRole",
            RoleProps {
                assumed_by: "lambda.amazonaws.com".to_string(),
                description: None,
                policies: vec![
                    Policy::new(
                        "ParameterStore",
                        vec![PolicyStatement::allow(
                            &["ssm:GetParameter", "ssm:PutParameter"],
                            parameter_arns(&props),
                        )],
                    ),
                    Policy::new(
                        "Logs",
                        vec![PolicyStatement::allow(
                            &[
                                "logs:CreateLogGroup",
                                "logs:CreateLogStream",
                                "logs:PutLogEvents",
                            ],
                            vec![regional_arn("logs", vec![json!("log-group:/aws/lambda/*")])],
                        )],
                    ),
                ],
            },
        )?;

        let environment = BTreeMap::from([
            ("CREDENTIAL_KEY_PATH".to_string(), json!(props.credential_key_path)),
            ("QUERY_PARAMETER".to_string(), json!(props.query_parameter)),
            ("SOLUTION_NAME".to_string(), json!(props.solution_name)),
            ("STACK_NAME".to_string(), aws_stack_name()),
            ("SUPPORTED_LANG".to_string(), json!(languages.join(","))),
        ]);
        let code = props.producer_code.clone().unwrap_or_else(|| {
            FunctionCode::solution_asset(&props.solution_name, PRODUCER_ARTIFACT)
        });
        let producer = Function::new(
            &mut scope,
            "Producer",
            FunctionProps {
                description: Some(PRODUCER_DESCRIPTION.to_string()),
                code,
                role: &producer_role,
                environment,
                memory_size_mb: PRODUCER_MEMORY_MB,
                timeout_seconds: PRODUCER_TIMEOUT_SECONDS,
            },
        )?;

        let state_machine_arn = json!(props.state_machine_arn);
        let schedule_role = Role::new(
            &mut scope,
            "ScheduleRole",
            RoleProps {
                assumed_by: "events.amazonaws.com".to_string(),
                description: None,
                policies: vec![Policy::new(
                    "StartExecution",
                    vec![PolicyStatement::allow(
                        &["states:StartExecution"],
                        vec![state_machine_arn.clone()],
                    )],
                )],
            },
        )?;
        let schedule_rule = Rule::new(
            &mut scope,
            "Schedule",
            RuleProps {
                description: Some(format!("Starts {} ingestion", props.solution_name)),
                event_bus: None,
                trigger: RuleTrigger::Schedule(schedule.clone()),
                targets: vec![RuleTarget {
                    id: "Target0".to_string(),
                    arn: state_machine_arn,
                    role_arn: Some(schedule_role.arn()),
                    input: None,
                }],
                enabled: true,
            },
        )?;

        Ok(Self {
            schedule,
            schedule_rule,
            producer,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn schedule_rule(&self) -> &Rule {
        &self.schedule_rule
    }

    pub fn producer(&self) -> &Function {
        &self.producer
    }
}

/// Parameters the producer may read or stub out.
fn parameter_arns(props: &IngestionProps) -> Vec<Value> {
    let mut arns = vec![regional_arn(
        "ssm",
        vec![json!(format!("parameter/{}/*", props.solution_name))],
    )];
    let configured = props.credential_key_path.trim();
    if !configured.is_empty() {
        let path = configured.trim_start_matches('/');
        arns.push(regional_arn("ssm", vec![json!(format!("parameter/{path}"))]));
    }
    arns
}

#[cfg(test)]
mod tests {
    use crate::stack::Stack;

    use super::*;

    fn sample_props() -> IngestionProps {
        IngestionProps {
            state_machine_arn: "stateMachineArn".to_string(),
            solution_name: "test-solution".to_string(),
            ingest_frequency: "(0/2 * * * ? *)".to_string(),
            supported_lang: "de,en,es,it,pt,fr,ja,ko,hi,ar,zh-cn,zh-tw".to_string(),
            query_parameter: "Health".to_string(),
            credential_key_path: "/some/dummy/path/test".to_string(),
            producer_code: None,
        }
    }

    #[test]
    fn schedule_rule_targets_exact_state_machine_reference() {
        let mut stack = Stack::new("testStack");
        let ingestion = Ingestion::new(&mut stack.root(), "Ingestion", sample_props())
            .expect("ingestion should register");

        let template = stack.synth();
        let rule = template
            .resource(ingestion.schedule_rule().logical_id().as_str())
            .expect("rule should exist");
        assert_eq!(rule.resource_type, "AWS::Events::Rule");
        assert_eq!(
            rule.properties["ScheduleExpression"],
            json!("cron(0/2 * * * ? *)")
        );
        let targets = rule.properties["Targets"]
            .as_array()
            .expect("targets should be an array");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0]["Arn"], json!("stateMachineArn"));
    }

    #[test]
    fn producer_environment_carries_query_configuration() {
        let mut stack = Stack::new("testStack");
        let ingestion = Ingestion::new(&mut stack.root(), "Ingestion", sample_props())
            .expect("ingestion should register");

        let template = stack.synth();
        let producer = template
            .resource(ingestion.producer().logical_id().as_str())
            .expect("producer should exist");
        let variables = &producer.properties["Environment"]["Variables"];
        assert_eq!(variables["CREDENTIAL_KEY_PATH"], json!("/some/dummy/path/test"));
        assert_eq!(variables["QUERY_PARAMETER"], json!("Health"));
        assert_eq!(
            variables["SUPPORTED_LANG"],
            json!("de,en,es,it,pt,fr,ja,ko,hi,ar,zh-cn,zh-tw")
        );
        assert_eq!(variables["STACK_NAME"], json!({"Ref": "AWS::StackName"}));
        assert_eq!(producer.properties["Runtime"], json!("provided.al2023"));
        assert_eq!(
            producer.properties["Description"],
            json!("Resolves the bearer token and plans one search per supported language")
        );
    }

    #[test]
    fn producer_code_override_replaces_solution_asset() {
        let mut stack = Stack::new("testStack");
        let ingestion = Ingestion::new(
            &mut stack.root(),
            "Ingestion",
            IngestionProps {
                producer_code: Some(FunctionCode {
                    s3_bucket: json!("my-artifacts"),
                    s3_key: "lambda/ingestion-producer.zip".to_string(),
                }),
                ..sample_props()
            },
        )
        .expect("ingestion should register");

        let template = stack.synth();
        let producer = template
            .resource(ingestion.producer().logical_id().as_str())
            .expect("producer should exist");
        assert_eq!(
            producer.properties["Code"],
            json!({"S3Bucket": "my-artifacts", "S3Key": "lambda/ingestion-producer.zip"})
        );
    }

    #[test]
    fn rejects_empty_language_list() {
        let mut stack = Stack::new("testStack");
        let error = Ingestion::new(
            &mut stack.root(),
            "Ingestion",
            IngestionProps {
                supported_lang: " , ".to_string(),
                ..sample_props()
            },
        )
        .expect_err("empty language list should fail");
        assert_eq!(
            error,
            SynthError::invalid_config("supported_lang cannot be empty")
        );
        assert!(stack.synth().resources.is_empty());
    }

    #[test]
    fn parameter_policy_covers_solution_prefix_and_configured_path() {
        let arns = parameter_arns(&sample_props());
        assert_eq!(arns.len(), 2);

        let unset = parameter_arns(&IngestionProps {
            credential_key_path: String::new(),
            ..sample_props()
        });
        assert_eq!(unset.len(), 1);
    }
}
