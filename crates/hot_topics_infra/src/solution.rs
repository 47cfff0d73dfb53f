//! The complete deployment: shared logging bucket and key, the inference
//! landing zone, and the ingestion trigger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::SynthError;
use crate::ingestion::{Ingestion, IngestionProps, PRODUCER_ARTIFACT};
use crate::integration::{AnalysisKind, AppIntegration, AppIntegrationProps};
use crate::kms::{Key, KeyProps};
use crate::lambda_fn::FunctionCode;
use crate::s3::{Bucket, BucketProps};
use crate::stack::Stack;

pub const DEFAULT_INGEST_FREQUENCY: &str = "(0/2 * * * ? *)";
pub const DEFAULT_SUPPORTED_LANG: &str = "de,en,es,it,pt,fr,ja,ko,hi,ar,zh-cn,zh-tw";
pub const DEFAULT_TEXT_ANALYSIS_NS: &str = "com.analyze.inference.text";
pub const DEFAULT_TOPICS_ANALYSIS_NS: &str = "com.analyze.inference.topic";
pub const DEFAULT_TOPIC_MAPPINGS_NS: &str = "com.analyze.inference.topicmappings";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentConfig {
    pub stack_name: String,
    pub solution_name: String,
    pub state_machine_arn: String,
    pub query_parameter: String,
    #[serde(default = "default_ingest_frequency")]
    pub ingest_frequency: String,
    #[serde(default = "default_supported_lang")]
    pub supported_lang: String,
    #[serde(default)]
    pub credential_key_path: String,
    #[serde(default = "default_text_analysis_ns")]
    pub text_analysis_inf_ns: String,
    #[serde(default = "default_topics_analysis_ns")]
    pub topics_analysis_inf_ns: String,
    #[serde(default = "default_topic_mappings_ns")]
    pub topic_mappings_inf_ns: String,
    #[serde(default = "default_table_mappings")]
    pub table_mappings: BTreeMap<String, String>,
    /// Bucket holding the packaged producer zip. Unset deploys from the
    /// regional `solutions-<region>` bucket.
    #[serde(default)]
    pub producer_code_bucket: Option<String>,
    /// Defaults to `{solution_name}/ingestion-producer.zip`.
    #[serde(default)]
    pub producer_code_key: Option<String>,
}

impl DeploymentConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, SynthError> {
        serde_json::from_str(raw).map_err(|error| {
            SynthError::invalid_config(format!("malformed deployment config: {error}"))
        })
    }

    /// Where the producer function is deployed from, if not the solution bucket.
    pub fn producer_code(&self) -> Result<Option<FunctionCode>, SynthError> {
        let bucket = self
            .producer_code_bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty());
        let key = self
            .producer_code_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        match (bucket, key) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(SynthError::invalid_config(
                "producer_code_key requires producer_code_bucket",
            )),
            (Some(bucket), key) => Ok(Some(FunctionCode {
                s3_bucket: json!(bucket),
                s3_key: key.map(str::to_string).unwrap_or_else(|| {
                    format!("{}/{PRODUCER_ARTIFACT}", self.solution_name)
                }),
            })),
        }
    }
}

pub fn default_ingest_frequency() -> String {
    DEFAULT_INGEST_FREQUENCY.to_string()
}

pub fn default_supported_lang() -> String {
    DEFAULT_SUPPORTED_LANG.to_string()
}

fn default_text_analysis_ns() -> String {
    DEFAULT_TEXT_ANALYSIS_NS.to_string()
}

fn default_topics_analysis_ns() -> String {
    DEFAULT_TOPICS_ANALYSIS_NS.to_string()
}

fn default_topic_mappings_ns() -> String {
    DEFAULT_TOPIC_MAPPINGS_NS.to_string()
}

/// One table per analysis type, named after it.
pub fn default_table_mappings() -> BTreeMap<String, String> {
    AnalysisKind::ALL
        .into_iter()
        .map(|kind| {
            (
                kind.logical_name().to_string(),
                kind.default_table_name().to_string(),
            )
        })
        .collect()
}

pub fn build_solution_stack(config: &DeploymentConfig) -> Result<Stack, SynthError> {
    if config.stack_name.trim().is_empty() {
        return Err(SynthError::invalid_config("stack_name cannot be empty"));
    }

    let producer_code = config.producer_code()?;

    let mut stack = Stack::new(config.stack_name.as_str()).with_description(format!(
        "({}) - Discovering hot topics using machine learning",
        config.solution_name
    ));

    let (integration, ingestion) = {
        let mut root = stack.root();
        let access_log = Bucket::new(
            &mut root,
            "AccessLog",
            BucketProps {
                log_delivery_write: true,
                ..BucketProps::default()
            },
        )?;
        let glue_key = Key::new(
            &mut root,
            "GlueCloudWatch",
            KeyProps {
                description: Some("Encrypts Firehose delivery logs".to_string()),
                ..KeyProps::default()
            },
        )?;

        let integration = AppIntegration::new(
            &mut root,
            "Integration",
            AppIntegrationProps {
                text_analysis_inf_ns: config.text_analysis_inf_ns.clone(),
                topics_analysis_inf_ns: config.topics_analysis_inf_ns.clone(),
                topic_mappings_inf_ns: config.topic_mappings_inf_ns.clone(),
                table_mappings: config.table_mappings.clone(),
                glue_kms_key: glue_key,
                s3_logging_bucket: access_log.bucket_ref().clone(),
            },
        )?;
        let ingestion = Ingestion::new(
            &mut root,
            "Ingestion",
            IngestionProps {
                state_machine_arn: config.state_machine_arn.clone(),
                solution_name: config.solution_name.clone(),
                ingest_frequency: config.ingest_frequency.clone(),
                supported_lang: config.supported_lang.clone(),
                query_parameter: config.query_parameter.clone(),
                credential_key_path: config.credential_key_path.clone(),
                producer_code,
            },
        )?;
        (integration, ingestion)
    };

    stack.add_output(
        "EventBusName",
        Some("Bus receiving inference events"),
        integration.event_bus().name(),
    )?;
    stack.add_output("EventBusArn", None, integration.event_bus().arn())?;
    stack.add_output(
        "DataBucketName",
        Some("Bucket holding the Parquet analysis tables"),
        integration.data_bucket().bucket_ref().bucket_name().clone(),
    )?;
    stack.add_output(
        "GlueDatabaseName",
        None,
        integration.database().database_name().clone(),
    )?;
    stack.add_output("IngestionSchedule", None, json!(ingestion.schedule().as_str()))?;
    stack.add_output("ProducerFunctionArn", None, ingestion.producer().arn())?;

    info!(
        stack = %config.stack_name,
        tables = config.table_mappings.len(),
        "composed solution stack"
    );
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json_falls_back_to_defaults() {
        let config = DeploymentConfig::from_json_str(
            r#"{
                "stack_name": "hot-topics",
                "solution_name": "SO0122",
                "state_machine_arn": "arn:aws:states:us-east-1:111111111111:stateMachine:ingest",
                "query_parameter": "Health"
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.ingest_frequency, DEFAULT_INGEST_FREQUENCY);
        assert_eq!(config.table_mappings.len(), 9);
        assert_eq!(
            config.table_mappings.get("TopicMappings").map(String::as_str),
            Some("topic-mappings")
        );
        assert!(config.credential_key_path.is_empty());
        assert_eq!(config.producer_code(), Ok(None));
    }

    #[test]
    fn producer_code_key_defaults_under_solution_prefix() {
        let config = DeploymentConfig::from_json_str(
            r#"{
                "stack_name": "hot-topics",
                "solution_name": "SO0122",
                "state_machine_arn": "arn:aws:states:us-east-1:111111111111:stateMachine:ingest",
                "query_parameter": "Health",
                "producer_code_bucket": "my-artifacts"
            }"#,
        )
        .expect("config should parse");

        assert_eq!(
            config.producer_code(),
            Ok(Some(FunctionCode {
                s3_bucket: json!("my-artifacts"),
                s3_key: "SO0122/ingestion-producer.zip".to_string(),
            }))
        );
    }

    #[test]
    fn producer_code_key_without_bucket_is_rejected() {
        let config = DeploymentConfig::from_json_str(
            r#"{
                "stack_name": "hot-topics",
                "solution_name": "SO0122",
                "state_machine_arn": "arn:aws:states:us-east-1:111111111111:stateMachine:ingest",
                "query_parameter": "Health",
                "producer_code_key": "lambda/producer.zip"
            }"#,
        )
        .expect("config should parse");

        assert_eq!(
            config.producer_code(),
            Err(SynthError::invalid_config(
                "producer_code_key requires producer_code_bucket"
            ))
        );
    }

    #[test]
    fn malformed_config_is_reported() {
        let error = DeploymentConfig::from_json_str("{\"stack_name\": 1}")
            .expect_err("config should fail");
        assert!(matches!(
            error,
            SynthError::InvalidConfig(message) if message.starts_with("malformed deployment config")
        ));
    }
}
