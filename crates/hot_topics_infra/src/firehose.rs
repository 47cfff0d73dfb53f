use serde_json::{json, Value};

use crate::error::SynthError;
use crate::glue::Table;
use crate::iam::Role;
use crate::logs::{LogGroup, LogStream};
use crate::s3::BucketRef;
use crate::stack::Scope;
use crate::template::{aws_account_id, aws_region, LogicalId, Resource};

/// Parquet conversion requires a buffer of at least 64 MiB.
pub const PARQUET_BUFFER_SIZE_MB: u32 = 128;
pub const DEFAULT_BUFFER_INTERVAL_SECONDS: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryStreamProps<'a> {
    pub bucket: &'a BucketRef,
    pub prefix: String,
    pub error_output_prefix: String,
    pub role: &'a Role,
    pub schema_table: &'a Table,
    pub log_group: &'a LogGroup,
    pub log_stream: &'a LogStream,
    pub buffer_interval_seconds: u32,
}

/// Direct-put delivery stream that lands JSON records in S3 as Parquet.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryStream {
    logical_id: LogicalId,
}

impl DeliveryStream {
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: DeliveryStreamProps<'_>,
    ) -> Result<Self, SynthError> {
        let properties = json!({
            "DeliveryStreamType": "DirectPut",
            "DeliveryStreamEncryptionConfigurationInput": { "KeyType": "AWS_OWNED_CMK" },
            "ExtendedS3DestinationConfiguration": {
                "BucketARN": props.bucket.arn(),
                "BufferingHints": {
                    "IntervalInSeconds": props.buffer_interval_seconds,
                    "SizeInMBs": PARQUET_BUFFER_SIZE_MB,
                },
                "CloudWatchLoggingOptions": {
                    "Enabled": true,
                    "LogGroupName": props.log_group.log_group_name(),
                    "LogStreamName": props.log_stream.name(),
                },
                "CompressionFormat": "UNCOMPRESSED",
                "DataFormatConversionConfiguration": {
                    "Enabled": true,
                    "InputFormatConfiguration": {
                        "Deserializer": { "OpenXJsonSerDe": {} },
                    },
                    "OutputFormatConfiguration": {
                        "Serializer": { "ParquetSerDe": {} },
                    },
                    "SchemaConfiguration": {
                        "CatalogId": aws_account_id(),
                        "DatabaseName": props.schema_table.database().database_name(),
                        "Region": aws_region(),
                        "RoleARN": props.role.arn(),
                        "TableName": props.schema_table.table_name(),
                        "VersionId": "LATEST",
                    },
                },
                "ErrorOutputPrefix": props.error_output_prefix,
                "Prefix": props.prefix,
                "RoleARN": props.role.arn(),
            },
        });

        let resource = Resource::new("AWS::KinesisFirehose::DeliveryStream", properties)
            .depends_on(props.role.logical_id())
            .depends_on(props.schema_table.logical_id())
            .depends_on(props.log_stream.logical_id());
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
