use serde_json::{json, Value};

use crate::error::SynthError;
use crate::stack::Scope;
use crate::template::{LogicalId, Resource};

/// Custom EventBridge bus.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBus {
    logical_id: LogicalId,
}

impl EventBus {
    pub fn new(scope: &mut Scope<'_>, id: &str, name: Value) -> Result<Self, SynthError> {
        let logical_id = scope.add(
            id,
            Resource::new("AWS::Events::EventBus", json!({ "Name": name })),
        )?;
        Ok(Self { logical_id })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `Ref` on an event bus resolves to its name.
    pub fn name(&self) -> Value {
        self.logical_id.reference()
    }

    pub fn arn(&self) -> Value {
        self.logical_id.get_att("Arn")
    }
}

/// A validated EventBridge schedule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule(String);

impl Schedule {
    /// Accepts `rate(...)`, `cron(...)`, or a bare parenthesized cron body
    /// such as `(0/2 * * * ? *)`, which is prefixed with `cron`.
    pub fn expression(raw: &str) -> Result<Self, SynthError> {
        let trimmed = raw.trim();
        let invalid = || SynthError::InvalidSchedule(raw.to_string());
        let without_close = trimmed.strip_suffix(')').ok_or_else(invalid)?;

        let (prefix, body) = without_close.split_once('(').ok_or_else(invalid)?;
        if body.trim().is_empty() {
            return Err(invalid());
        }

        match prefix {
            "" => Ok(Self(format!("cron{trimmed}"))),
            "cron" | "rate" => Ok(Self(trimmed.to_string())),
            _ => Err(invalid()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPattern {
    pub sources: Vec<String>,
    pub detail_types: Vec<String>,
}

impl EventPattern {
    fn to_value(&self) -> Value {
        let mut pattern = json!({ "source": self.sources });
        if !self.detail_types.is_empty() {
            pattern["detail-type"] = json!(self.detail_types);
        }
        pattern
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTrigger {
    Schedule(Schedule),
    Pattern(EventPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleTarget {
    pub id: String,
    pub arn: Value,
    pub role_arn: Option<Value>,
    /// Constant JSON passed to the target instead of the matched event.
    pub input: Option<Value>,
}

impl RuleTarget {
    fn to_value(&self) -> Value {
        let mut target = json!({ "Arn": self.arn, "Id": self.id });
        if let Some(role_arn) = &self.role_arn {
            target["RoleArn"] = role_arn.clone();
        }
        if let Some(input) = &self.input {
            target["Input"] = json!(input.to_string());
        }
        target
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleProps<'a> {
    pub description: Option<String>,
    pub event_bus: Option<&'a EventBus>,
    pub trigger: RuleTrigger,
    pub targets: Vec<RuleTarget>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    logical_id: LogicalId,
}

impl Rule {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: RuleProps<'_>) -> Result<Self, SynthError> {
        let targets: Vec<Value> = props.targets.iter().map(RuleTarget::to_value).collect();
        let state = if props.enabled { "ENABLED" } else { "DISABLED" };
        let mut properties = json!({
            "State": state,
            "Targets": targets,
        });
        match &props.trigger {
            RuleTrigger::Schedule(schedule) => {
                properties["ScheduleExpression"] = json!(schedule.as_str());
            }
            RuleTrigger::Pattern(pattern) => {
                properties["EventPattern"] = pattern.to_value();
            }
        }
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        if let Some(bus) = props.event_bus {
            properties["EventBusName"] = bus.name();
        }

        let logical_id = scope.add(id, Resource::new("AWS::Events::Rule", properties))?;
        Ok(Self { logical_id })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }
}

#[cfg(test)]
mod tests {
    use crate::stack::Stack;

    use super::*;

    #[test]
    fn bare_cron_body_gets_cron_prefix() {
        let schedule = Schedule::expression("(0/2 * * * ? *)").expect("schedule should parse");
        assert_eq!(schedule.as_str(), "cron(0/2 * * * ? *)");
    }

    #[test]
    fn full_expressions_pass_through() {
        for raw in ["rate(5 minutes)", "cron(0 12 * * ? *)"] {
            let schedule = Schedule::expression(raw).expect("schedule should parse");
            assert_eq!(schedule.as_str(), raw);
        }
    }

    #[test]
    fn rejects_malformed_schedules() {
        for raw in [
            "",
            "()",
            "cron()",
            "rate( )",
            "every 2 minutes",
            "cron(0 12 * * ? *",
            "daily(1 day)",
        ] {
            let error = Schedule::expression(raw).expect_err("schedule should fail");
            assert_eq!(error, SynthError::InvalidSchedule(raw.to_string()));
        }
    }

    #[test]
    fn pattern_rule_targets_bus_and_filters_detail_type() {
        let mut stack = Stack::new("testStack");
        let mut root = stack.root();
        let bus = EventBus::new(&mut root, "Bus", json!("inference-bus"))
            .expect("bus should register");
        Rule::new(
            &mut root,
            "Rule",
            RuleProps {
                description: None,
                event_bus: Some(&bus),
                trigger: RuleTrigger::Pattern(EventPattern {
                    sources: vec!["com.test".to_string()],
                    detail_types: vec!["Sentiment".to_string()],
                }),
                targets: vec![RuleTarget {
                    id: "Target0".to_string(),
                    arn: json!("arn:aws:firehose:::deliverystream/x"),
                    role_arn: None,
                    input: Some(json!({"a": 1})),
                }],
                enabled: true,
            },
        )
        .expect("rule should register");

        let template = stack.synth().to_json();
        let properties = &template["Resources"]["Rule"]["Properties"];
        assert_eq!(properties["EventBusName"], json!({"Ref": "Bus"}));
        assert_eq!(
            properties["EventPattern"],
            json!({"source": ["com.test"], "detail-type": ["Sentiment"]})
        );
        assert_eq!(properties["Targets"][0]["Input"], json!("{\"a\":1}"));
        assert!(properties.get("ScheduleExpression").is_none());
    }
}
