use std::collections::HashMap;

use crate::error::SecretError;

/// Resolves named secrets such as the API bearer token.
pub trait SecretProvider: Send + Sync {
    fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `{prefix}{name}` from the process environment.
pub struct EnvSecrets {
    prefix: String,
    lookup: Lookup,
}

impl EnvSecrets {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub fn with_lookup<F>(prefix: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            prefix: prefix.into(),
            lookup: Box::new(lookup),
        }
    }
}

impl std::fmt::Debug for EnvSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSecrets")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl SecretProvider for EnvSecrets {
    fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        let key = format!("{}{}", self.prefix, name);
        (self.lookup)(&key)
            .filter(|value| !value.is_empty())
            .ok_or(SecretError::NotFound { name: key })
    }
}

/// Fixed values, for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        self.values
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })
    }
}
