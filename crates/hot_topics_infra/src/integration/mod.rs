//! Landing zone for inference results.
//!
//! Each analysis type published on the inference event bus gets its own
//! delivery path: an EventBridge rule matching the publishing namespace and
//! the analysis name as `detail-type`, a Firehose stream converting the
//! events to Parquet, and a Glue table describing the files it writes.

pub mod schemas;

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::SynthError;
use crate::events::{EventBus, EventPattern, Rule, RuleProps, RuleTarget, RuleTrigger};
use crate::firehose::{DeliveryStream, DeliveryStreamProps, DEFAULT_BUFFER_INTERVAL_SECONDS};
use crate::glue::{Column, DataFormat, Database, DatabaseProps, GlueType, Table, TableProps};
use crate::iam::{Policy, PolicyStatement, Role, RoleProps};
use crate::kms::Key;
use crate::logs::{LogGroup, LogGroupProps};
use crate::s3::{Bucket, BucketProps, BucketRef, ServerAccessLogs};
use crate::stack::Scope;
use crate::template::{aws_stack_name, join, regional_arn};
use crate::visualization::topic_mappings::{TopicMappingsProps, TopicMappingsTable, PARTITION_KEY};

pub use schemas::{AnalysisKind, InferenceSource};

pub const DATA_BUCKET_LOG_PREFIX: &str = "app-integration-data-bucket/";
pub const DELIVERY_LOG_STREAM_NAME: &str = "S3Delivery";

#[derive(Debug, Clone, PartialEq)]
pub struct AppIntegrationProps {
    pub text_analysis_inf_ns: String,
    pub topics_analysis_inf_ns: String,
    pub topic_mappings_inf_ns: String,
    /// Analysis logical name (`Sentiment`, `TopicMappings`, ...) to Glue table name.
    pub table_mappings: BTreeMap<String, String>,
    pub glue_kms_key: Key,
    pub s3_logging_bucket: BucketRef,
}

impl AppIntegrationProps {
    fn namespace(&self, source: InferenceSource) -> &str {
        match source {
            InferenceSource::TextAnalysis => &self.text_analysis_inf_ns,
            InferenceSource::TopicsAnalysis => &self.topics_analysis_inf_ns,
            InferenceSource::TopicMappings => &self.topic_mappings_inf_ns,
        }
    }

    fn resolve_mappings(&self) -> Result<Vec<MappingEntry<'_>>, SynthError> {
        if self.table_mappings.is_empty() {
            return Err(SynthError::invalid_config("table_mappings cannot be empty"));
        }
        for (field, value) in [
            ("text_analysis_inf_ns", &self.text_analysis_inf_ns),
            ("topics_analysis_inf_ns", &self.topics_analysis_inf_ns),
            ("topic_mappings_inf_ns", &self.topic_mappings_inf_ns),
        ] {
            if value.trim().is_empty() {
                return Err(SynthError::invalid_config(format!("{field} cannot be empty")));
            }
        }

        self.table_mappings
            .iter()
            .map(|(logical_name, table_name)| {
                let kind = AnalysisKind::from_logical_name(logical_name)
                    .ok_or_else(|| SynthError::UnknownTableMapping(logical_name.clone()))?;
                if table_name.trim().is_empty() {
                    return Err(SynthError::invalid_config(format!(
                        "table name for '{logical_name}' cannot be empty"
                    )));
                }
                Ok(MappingEntry {
                    kind,
                    logical_name,
                    table_name,
                })
            })
            .collect()
    }
}

struct MappingEntry<'a> {
    kind: AnalysisKind,
    logical_name: &'a str,
    table_name: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppIntegration {
    event_bus: EventBus,
    database: Database,
    data_bucket: Bucket,
    tables: BTreeMap<String, Table>,
    delivery_streams: BTreeMap<String, DeliveryStream>,
}

impl AppIntegration {
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: AppIntegrationProps,
    ) -> Result<Self, SynthError> {
        let entries = props.resolve_mappings()?;
        let mut scope = scope.child(id);

        let event_bus = EventBus::new(
            &mut scope,
            "Bus",
            join("", vec![aws_stack_name(), json!("-inference-bus")]),
        )?;
        let database_name = catalog_database_name(scope.stack_name());
        let database = Database::new(
            &mut scope,
            "Database",
            DatabaseProps {
                database_name: json!(database_name),
            },
        )?;
        let data_bucket = Bucket::new(
            &mut scope,
            "Data",
            BucketProps {
                server_access_logs: Some(ServerAccessLogs {
                    destination: props.s3_logging_bucket.clone(),
                    prefix: DATA_BUCKET_LOG_PREFIX.to_string(),
                }),
                ..BucketProps::default()
            },
        )?;
        let firehose_role = Role::new(
            &mut scope,
            "FirehoseRole",
            firehose_role_props(data_bucket.bucket_ref(), &database, &props.glue_kms_key),
        )?;

        let mut tables = BTreeMap::new();
        let mut delivery_streams = BTreeMap::new();
        for entry in &entries {
            let mut entry_scope = scope.child(entry.logical_name);
            let table =
                declare_table(&mut entry_scope, entry, &database, data_bucket.bucket_ref())?;

            let log_group = LogGroup::new(
                &mut entry_scope,
                "DeliveryLogs",
                LogGroupProps {
                    encryption_key: Some(props.glue_kms_key.clone()),
                    ..LogGroupProps::default()
                },
            )?;
            let log_stream = log_group.add_stream(
                &mut entry_scope,
                "DeliveryLogStream",
                DELIVERY_LOG_STREAM_NAME,
            )?;
            let delivery_stream = DeliveryStream::new(
                &mut entry_scope,
                "Delivery",
                DeliveryStreamProps {
                    bucket: data_bucket.bucket_ref(),
                    prefix: delivery_prefix(entry.table_name),
                    error_output_prefix: error_output_prefix(entry.table_name),
                    role: &firehose_role,
                    schema_table: &table,
                    log_group: &log_group,
                    log_stream: &log_stream,
                    buffer_interval_seconds: DEFAULT_BUFFER_INTERVAL_SECONDS,
                },
            )?;

            debug!(
                analysis = entry.logical_name,
                table = entry.table_name,
                "declared inference delivery path"
            );
            tables.insert(entry.logical_name.to_string(), table);
            delivery_streams.insert(entry.logical_name.to_string(), delivery_stream);
        }

        let stream_arns: Vec<Value> = delivery_streams.values().map(DeliveryStream::arn).collect();
        let events_role = Role::new(
            &mut scope,
            "EventsRole",
            RoleProps {
                assumed_by: "events.amazonaws.com".to_string(),
                description: None,
                policies: vec![Policy::new(
                    "FirehosePut",
                    vec![PolicyStatement::allow(
                        &["firehose:PutRecord", "firehose:PutRecordBatch"],
                        stream_arns,
                    )],
                )],
            },
        )?;

        for entry in &entries {
            let delivery_stream = &delivery_streams[entry.logical_name];
            let mut entry_scope = scope.child(entry.logical_name);
            Rule::new(
                &mut entry_scope,
                "Rule",
                RuleProps {
                    description: Some(format!(
                        "Routes {} inference events to Firehose",
                        entry.logical_name
                    )),
                    event_bus: Some(&event_bus),
                    trigger: RuleTrigger::Pattern(EventPattern {
                        sources: vec![props.namespace(entry.kind.source()).to_string()],
                        detail_types: vec![entry.logical_name.to_string()],
                    }),
                    targets: vec![RuleTarget {
                        id: "Target0".to_string(),
                        arn: delivery_stream.arn(),
                        role_arn: Some(events_role.arn()),
                        input: None,
                    }],
                    enabled: true,
                },
            )?;
        }

        Ok(Self {
            event_bus,
            database,
            data_bucket,
            tables,
            delivery_streams,
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn data_bucket(&self) -> &Bucket {
        &self.data_bucket
    }

    pub fn table(&self, logical_name: &str) -> Option<&Table> {
        self.tables.get(logical_name)
    }

    pub fn delivery_stream(&self, logical_name: &str) -> Option<&DeliveryStream> {
        self.delivery_streams.get(logical_name)
    }
}

/// Glue database names are lowercase with underscores.
fn catalog_database_name(stack_name: &str) -> String {
    let normalized: String = stack_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{normalized}_socialmediadb")
}

/// Firehose writes Hive-style `created_at=` partitions under the table prefix.
fn delivery_prefix(table_name: &str) -> String {
    format!("{table_name}/{PARTITION_KEY}=!{{timestamp:yyyy-MM-dd}}/")
}

fn error_output_prefix(table_name: &str) -> String {
    format!("{table_name}-errors/!{{firehose:error-output-type}}/!{{timestamp:yyyy-MM-dd}}/")
}

fn declare_table(
    scope: &mut Scope<'_>,
    entry: &MappingEntry<'_>,
    database: &Database,
    bucket: &BucketRef,
) -> Result<Table, SynthError> {
    let prefix = format!("{}/", entry.table_name);
    if entry.kind == AnalysisKind::TopicMappings {
        let construct = TopicMappingsTable::new(
            scope,
            "Table",
            TopicMappingsProps {
                s3_input_data_bucket: bucket.clone(),
                s3_bucket_prefix: prefix,
                database: database.clone(),
                table_name: entry.table_name.to_string(),
            },
        )?;
        return Ok(construct.table().clone());
    }

    Table::new(
        scope,
        "Table",
        TableProps {
            database: database.clone(),
            table_name: entry.table_name.to_string(),
            description: None,
            columns: entry.kind.columns(),
            partition_keys: vec![Column::new(PARTITION_KEY, GlueType::Timestamp)],
            data_format: DataFormat::Parquet,
            bucket: bucket.clone(),
            s3_prefix: prefix,
            stored_as_sub_directories: true,
        },
    )
}

fn firehose_role_props(bucket: &BucketRef, database: &Database, key: &Key) -> RoleProps {
    let database_name = database.database_name().clone();
    RoleProps {
        assumed_by: "firehose.amazonaws.com".to_string(),
        description: Some("Delivers inference events to the data bucket".to_string()),
        policies: vec![
            Policy::new(
                "S3Delivery",
                vec![PolicyStatement::allow(
                    &[
                        "s3:AbortMultipartUpload",
                        "s3:GetBucketLocation",
                        "s3:GetObject",
                        "s3:ListBucket",
                        "s3:ListBucketMultipartUploads",
                        "s3:PutObject",
                    ],
                    vec![bucket.arn().clone(), bucket.arn_for_objects("*")],
                )],
            ),
            Policy::new(
                "GlueSchema",
                vec![PolicyStatement::allow(
                    &["glue:GetTable", "glue:GetTableVersion", "glue:GetTableVersions"],
                    vec![
                        regional_arn("glue", vec![json!("catalog")]),
                        regional_arn("glue", vec![json!("database/"), database_name.clone()]),
                        regional_arn("glue", vec![json!("table/"), database_name, json!("/*")]),
                    ],
                )],
            ),
            Policy::new(
                "DeliveryLogs",
                vec![
                    PolicyStatement::allow(
                        &["logs:PutLogEvents"],
                        vec![regional_arn("logs", vec![json!("log-group:*")])],
                    ),
                    PolicyStatement::allow(
                        &["kms:Decrypt", "kms:GenerateDataKey"],
                        vec![key.arn()],
                    ),
                ],
            ),
        ],
    }
}
