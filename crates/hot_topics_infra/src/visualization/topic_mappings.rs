use crate::error::SynthError;
use crate::glue::{Column, DataFormat, Database, GlueType, Table, TableProps};
use crate::s3::BucketRef;
use crate::stack::Scope;

pub const PARTITION_KEY: &str = "created_at";

#[derive(Debug, Clone, PartialEq)]
pub struct TopicMappingsProps {
    pub s3_input_data_bucket: BucketRef,
    pub s3_bucket_prefix: String,
    pub database: Database,
    pub table_name: String,
}

/// Parquet table mapping each post (`id_str`) to the topic a modeling job
/// assigned it, partitioned by `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMappingsTable {
    table: Table,
}

impl TopicMappingsTable {
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: TopicMappingsProps,
    ) -> Result<Self, SynthError> {
        let mut scope = scope.child(id);
        let table = Table::new(
            &mut scope,
            "Topics",
            TableProps {
                database: props.database,
                table_name: props.table_name,
                description: None,
                columns: topic_mappings_columns(),
                partition_keys: vec![Column::new(PARTITION_KEY, GlueType::Timestamp)],
                data_format: DataFormat::Parquet,
                bucket: props.s3_input_data_bucket,
                s3_prefix: props.s3_bucket_prefix,
                stored_as_sub_directories: true,
            },
        )?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

pub fn topic_mappings_columns() -> Vec<Column> {
    vec![
        Column::new("job_id", GlueType::String),
        Column::new("job_timestamp", GlueType::Timestamp),
        Column::new("topic", GlueType::String),
        Column::new("id_str", GlueType::String),
    ]
}
