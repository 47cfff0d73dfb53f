//! Bearer-token lookup for the ingestion producer.
//!
//! The token lives in SSM under the path named by `CREDENTIAL_KEY_PATH`.
//! When that variable is missing, the retriever stubs out a placeholder
//! parameter at `/{SOLUTION_NAME}/{STACK_NAME}/{name}` so the operator has a
//! concrete location to fill in, then fails the invocation.

use thiserror::Error;
use tracing::{debug, error};

use crate::adapters::parameter_store::{ParameterStore, ParameterType, PutParameterRequest};

pub const CREDENTIAL_KEY_PATH_ENV: &str = "CREDENTIAL_KEY_PATH";
pub const SOLUTION_NAME_ENV: &str = "SOLUTION_NAME";
pub const STACK_NAME_ENV: &str = "STACK_NAME";

pub const PLACEHOLDER_VALUE: &str = "Dummy Values";
pub const PLACEHOLDER_DESCRIPTION: &str = "Twitter Bearer Token";

/// Rendered in place of a missing solution or stack name.
const UNDEFINED: &str = "undefined";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error(
        "no credential key path configured; create the bearer token parameter at '{key_path}' \
         and set the Lambda environment variable CREDENTIAL_KEY_PATH to that path"
    )]
    ConfigurationMissing { key_path: String },

    #[error("parameter store request failed: {0}")]
    Store(String),

    #[error("parameter '{key_path}' has no value")]
    EmptyValue { key_path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsEnv {
    pub credential_key_path: Option<String>,
    pub solution_name: String,
    pub stack_name: String,
}

impl SecretsEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            credential_key_path: lookup(CREDENTIAL_KEY_PATH_ENV),
            solution_name: lookup(SOLUTION_NAME_ENV).unwrap_or_else(|| UNDEFINED.to_string()),
            stack_name: lookup(STACK_NAME_ENV).unwrap_or_else(|| UNDEFINED.to_string()),
        }
    }

    /// The operator-provided path, if it is set to something non-empty.
    pub fn configured_key_path(&self) -> Option<&str> {
        self.credential_key_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }

    pub fn placeholder_key_path(&self, name: &str) -> String {
        format!("/{}/{}/{name}", self.solution_name, self.stack_name)
    }
}

pub struct AccountSecrets<'a> {
    store: &'a dyn ParameterStore,
    env: SecretsEnv,
}

impl<'a> AccountSecrets<'a> {
    pub fn new(store: &'a dyn ParameterStore, env: SecretsEnv) -> Self {
        Self { store, env }
    }

    pub fn env(&self) -> &SecretsEnv {
        &self.env
    }

    pub fn get_secret_value(&self, name: &str) -> Result<String, SecretError> {
        if let Some(key_path) = self.env.configured_key_path() {
            debug!(key_path, "reading credential from parameter store");
            return self
                .store
                .get_parameter(key_path, true)
                .map_err(SecretError::Store)?
                .ok_or_else(|| SecretError::EmptyValue {
                    key_path: key_path.to_string(),
                });
        }

        let key_path = self.env.placeholder_key_path(name);
        error!(
            key_path = %key_path,
            "credential key path is not configured; insert the bearer token at this path \
             and set CREDENTIAL_KEY_PATH on the function"
        );
        self.store
            .put_parameter(&PutParameterRequest {
                name: key_path.clone(),
                value: PLACEHOLDER_VALUE.to_string(),
                description: PLACEHOLDER_DESCRIPTION.to_string(),
                parameter_type: ParameterType::SecureString,
                overwrite: false,
            })
            .map_err(SecretError::Store)?;

        Err(SecretError::ConfigurationMissing { key_path })
    }
}
