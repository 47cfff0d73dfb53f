//! Glue Data Catalog databases and tables.

use std::fmt;

use serde_json::{json, Value};

use crate::error::SynthError;
use crate::s3::BucketRef;
use crate::stack::Scope;
use crate::template::{aws_account_id, LogicalId, Resource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlueType {
    String,
    Timestamp,
    Int,
    Double,
}

impl fmt::Display for GlueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Int => f.write_str("int"),
            Self::Double => f.write_str("double"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: GlueType,
}

impl Column {
    pub fn new(name: &str, column_type: GlueType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }

    fn to_value(&self) -> Value {
        json!({ "Name": self.name, "Type": self.column_type.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Parquet,
}

impl DataFormat {
    fn classification(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
        }
    }

    fn input_format(self) -> &'static str {
        match self {
            Self::Parquet => "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat",
        }
    }

    fn output_format(self) -> &'static str {
        match self {
            Self::Parquet => "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat",
        }
    }

    fn serialization_library(self) -> &'static str {
        match self {
            Self::Parquet => "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseProps {
    pub database_name: Value,
}

/// Handle to a catalog database, owned by this stack or imported by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    name: Value,
}

impl Database {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: DatabaseProps) -> Result<Self, SynthError> {
        let logical_id = scope.add(
            id,
            Resource::new(
                "AWS::Glue::Database",
                json!({
                    "CatalogId": aws_account_id(),
                    "DatabaseInput": { "Name": props.database_name },
                }),
            ),
        )?;
        Ok(Self {
            name: logical_id.reference(),
        })
    }

    pub fn from_database_name(name: &str) -> Self {
        Self { name: json!(name) }
    }

    pub fn database_name(&self) -> &Value {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableProps {
    pub database: Database,
    pub table_name: String,
    pub description: Option<String>,
    pub columns: Vec<Column>,
    pub partition_keys: Vec<Column>,
    pub data_format: DataFormat,
    pub bucket: BucketRef,
    pub s3_prefix: String,
    pub stored_as_sub_directories: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    logical_id: LogicalId,
    props: TableProps,
}

impl Table {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: TableProps) -> Result<Self, SynthError> {
        let description = props
            .description
            .clone()
            .unwrap_or_else(|| format!("{} generated by hot_topics_infra", props.table_name));
        let columns: Vec<Value> = props.columns.iter().map(Column::to_value).collect();
        let partition_keys: Vec<Value> =
            props.partition_keys.iter().map(Column::to_value).collect();

        let properties = json!({
            "CatalogId": aws_account_id(),
            "DatabaseName": props.database.database_name(),
            "TableInput": {
                "Name": props.table_name,
                "Description": description,
                "Parameters": {
                    "classification": props.data_format.classification(),
                    "has_encrypted_data": false,
                },
                "PartitionKeys": partition_keys,
                "StorageDescriptor": {
                    "Columns": columns,
                    "Compressed": false,
                    "InputFormat": props.data_format.input_format(),
                    "Location": props.bucket.s3_url_for_prefix(&props.s3_prefix),
                    "OutputFormat": props.data_format.output_format(),
                    "SerdeInfo": {
                        "SerializationLibrary": props.data_format.serialization_library(),
                    },
                    "StoredAsSubDirectories": props.stored_as_sub_directories,
                },
                "TableType": "EXTERNAL_TABLE",
            },
        });

        let logical_id = scope.add(id, Resource::new("AWS::Glue::Table", properties))?;
        Ok(Self { logical_id, props })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn table_name(&self) -> &str {
        &self.props.table_name
    }

    pub fn database(&self) -> &Database {
        &self.props.database
    }

    pub fn columns(&self) -> &[Column] {
        &self.props.columns
    }

    pub fn partition_keys(&self) -> &[Column] {
        &self.props.partition_keys
    }
}
