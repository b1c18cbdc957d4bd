use serde::{Deserialize, Serialize};

use crate::env::EnvMap;

pub const ENVIRONMENT_NAME: &str = "test-env";
pub const ENVIRONMENT_SCOPE: &str = "environment";
pub const HOST_KEY: &str = "HOST";

/// Postman environment document handed to the engine alongside the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub values: Vec<EnvVariable>,
    #[serde(rename = "_postman_variable_scope")]
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
}

impl EnvVariable {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind: "text".to_string(),
            enabled: true,
        }
    }
}

impl Environment {
    /// The run environment: a single enabled `HOST` text variable.
    pub fn for_host(base_url: &str) -> Self {
        Self {
            name: ENVIRONMENT_NAME.to_string(),
            values: vec![EnvVariable::text(HOST_KEY, base_url)],
            scope: ENVIRONMENT_SCOPE.to_string(),
        }
    }

    /// Appends extra variables. `HOST` always stays the resolved base URL and
    /// later duplicates of a key replace earlier ones.
    pub fn with_variables<I>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in extra {
            if key == HOST_KEY {
                continue;
            }
            match self.values.iter_mut().find(|var| var.key == key) {
                Some(existing) => existing.value = value,
                None => self.values.push(EnvVariable::text(key, value)),
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|var| var.enabled && var.key == key)
            .map(|var| var.value.as_str())
    }

    pub fn to_map(&self) -> EnvMap {
        self.values
            .iter()
            .filter(|var| var.enabled)
            .map(|var| (var.key.clone(), var.value.clone()))
            .collect()
    }
}
