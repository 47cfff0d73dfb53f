/// Supported SSM parameter types for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    SecureString,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::SecureString => "SecureString",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutParameterRequest {
    pub name: String,
    pub value: String,
    pub description: String,
    pub parameter_type: ParameterType,
    pub overwrite: bool,
}

pub trait ParameterStore {
    /// `Ok(None)` when the parameter exists but carries no value.
    fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<Option<String>, String>;

    fn put_parameter(&self, request: &PutParameterRequest) -> Result<(), String>;
}
