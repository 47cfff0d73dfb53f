use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::secrets::{AccountSecrets, SecretError};

pub const SUPPORTED_LANG_ENV: &str = "SUPPORTED_LANG";
pub const QUERY_PARAMETER_ENV: &str = "QUERY_PARAMETER";

/// Name of the bearer-token parameter under the solution path.
pub const BEARER_TOKEN_PARAMETER: &str = "BearerToken";

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("environment variable {0} must be configured")]
    MissingEnvironment(&'static str),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerEnv {
    pub query_parameter: String,
    pub supported_languages: Vec<String>,
}

impl ProducerEnv {
    pub fn from_env() -> Result<Self, ProducerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProducerError> {
        let query_parameter = lookup(QUERY_PARAMETER_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ProducerError::MissingEnvironment(QUERY_PARAMETER_ENV))?;
        let supported_languages: Vec<String> = lookup(SUPPORTED_LANG_ENV)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect();
        if supported_languages.is_empty() {
            return Err(ProducerError::MissingEnvironment(SUPPORTED_LANG_ENV));
        }

        Ok(Self {
            query_parameter,
            supported_languages,
        })
    }
}

/// One search the producer issues per supported language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub lang: String,
}

/// Returned to the state machine. The token itself never leaves the handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProducerResponse {
    pub status: String,
    pub searches: Vec<SearchRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

pub fn handle_producer_event(
    event: &Value,
    env: &ProducerEnv,
    secrets: &AccountSecrets<'_>,
) -> Result<ProducerResponse, ProducerError> {
    let bearer_token = secrets.get_secret_value(BEARER_TOKEN_PARAMETER)?;
    if bearer_token.is_empty() {
        return Err(SecretError::EmptyValue {
            key_path: secrets
                .env()
                .configured_key_path()
                .unwrap_or_default()
                .to_string(),
        }
        .into());
    }

    let searches: Vec<SearchRequest> = env
        .supported_languages
        .iter()
        .map(|lang| SearchRequest {
            query: env.query_parameter.clone(),
            lang: lang.clone(),
        })
        .collect();
    let execution_id = event
        .get("execution_id")
        .or_else(|| event.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    info!(
        query = %env.query_parameter,
        languages = searches.len(),
        "prepared ingestion searches"
    );
    Ok(ProducerResponse {
        status: "ready".to_string(),
        searches,
        execution_id,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::adapters::parameter_store::{ParameterStore, PutParameterRequest};
    use crate::secrets::SecretsEnv;

    struct StaticParameterStore {
        values: BTreeMap<String, String>,
    }

    impl ParameterStore for StaticParameterStore {
        fn get_parameter(
            &self,
            name: &str,
            _with_decryption: bool,
        ) -> Result<Option<String>, String> {
            Ok(self.values.get(name).cloned())
        }

        fn put_parameter(&self, _request: &PutParameterRequest) -> Result<(), String> {
            Ok(())
        }
    }

    fn lookup(values: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: BTreeMap<String, String> = values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    fn configured_secrets_env() -> SecretsEnv {
        SecretsEnv {
            credential_key_path: Some("/token".to_string()),
            solution_name: "SO0122".to_string(),
            stack_name: "hot-topics".to_string(),
        }
    }

    #[test]
    fn producer_env_splits_languages() {
        let env = ProducerEnv::from_lookup(lookup(&[
            ("QUERY_PARAMETER", "Health"),
            ("SUPPORTED_LANG", "de, en,,es"),
        ]))
        .expect("env should parse");

        assert_eq!(env.query_parameter, "Health");
        assert_eq!(env.supported_languages, vec!["de", "en", "es"]);
    }

    #[test]
    fn producer_env_requires_query() {
        let error = ProducerEnv::from_lookup(lookup(&[("SUPPORTED_LANG", "en")]))
            .expect_err("missing query should fail");
        assert_eq!(
            error.to_string(),
            "environment variable QUERY_PARAMETER must be configured"
        );
    }

    #[test]
    fn handler_plans_one_search_per_language_without_leaking_token() {
        let store = StaticParameterStore {
            values: BTreeMap::from([("/token".to_string(), "abc123".to_string())]),
        };
        let secrets = AccountSecrets::new(&store, configured_secrets_env());
        let env = ProducerEnv {
            query_parameter: "Health".to_string(),
            supported_languages: vec!["en".to_string(), "es".to_string()],
        };

        let response = handle_producer_event(&json!({"id": "exec-1"}), &env, &secrets)
            .expect("handler should succeed");

        assert_eq!(response.status, "ready");
        assert_eq!(response.searches.len(), 2);
        assert_eq!(response.searches[1].lang, "es");
        assert_eq!(response.execution_id.as_deref(), Some("exec-1"));
        let serialized = serde_json::to_string(&response).expect("response should serialize");
        assert!(!serialized.contains("abc123"));
    }

    #[test]
    fn handler_fails_when_credentials_are_not_configured() {
        let store = StaticParameterStore {
            values: BTreeMap::new(),
        };
        let secrets = AccountSecrets::new(
            &store,
            SecretsEnv {
                credential_key_path: None,
                ..configured_secrets_env()
            },
        );
        let env = ProducerEnv {
            query_parameter: "Health".to_string(),
            supported_languages: vec!["en".to_string()],
        };

        let error = handle_producer_event(&json!({}), &env, &secrets)
            .expect_err("missing configuration should fail");
        assert!(matches!(
            error,
            ProducerError::Secret(SecretError::ConfigurationMissing { .. })
        ));
    }
}
