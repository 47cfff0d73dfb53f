use aws_sdk_ssm::types::ParameterType as SsmParameterType;
use hot_topics_lambda::adapters::parameter_store::{
    ParameterStore, ParameterType, PutParameterRequest,
};
use hot_topics_lambda::handlers::producer::{handle_producer_event, ProducerEnv};
use hot_topics_lambda::secrets::{AccountSecrets, SecretsEnv};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

struct SsmParameterStore {
    ssm_client: aws_sdk_ssm::Client,
}

impl ParameterStore for SsmParameterStore {
    fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<Option<String>, String> {
        let client = self.ssm_client.clone();
        let parameter_name = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .get_parameter()
                    .name(parameter_name)
                    .with_decryption(with_decryption)
                    .send()
                    .await
                    .map(|output| output.parameter.and_then(|parameter| parameter.value))
                    .map_err(|error| format!("failed to read ssm parameter: {error}"))
            })
        })
    }

    fn put_parameter(&self, request: &PutParameterRequest) -> Result<(), String> {
        let client = self.ssm_client.clone();
        let request = request.clone();
        let parameter_type = match request.parameter_type {
            ParameterType::String => SsmParameterType::String,
            ParameterType::SecureString => SsmParameterType::SecureString,
        };

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_parameter()
                    .name(request.name)
                    .value(request.value)
                    .description(request.description)
                    .r#type(parameter_type)
                    .overwrite(request.overwrite)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write ssm parameter: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = SsmParameterStore {
        ssm_client: aws_sdk_ssm::Client::new(&aws_config),
    };
    let producer_env = ProducerEnv::from_env()?;
    let secrets = AccountSecrets::new(&store, SecretsEnv::from_env());

    let response = handle_producer_event(&event.payload, &producer_env, &secrets)?;
    serde_json::to_value(response)
        .map_err(|error| Error::from(format!("failed to serialize producer response: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
