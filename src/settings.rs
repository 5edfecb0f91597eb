//! Target application settings, sourced from the environment
//!
//! The application under test is deployed and managed outside of this
//! harness; the only contract is a reachable URL and one valid account.

use crate::error::{E2eError, E2eResult};

pub const SERVER_URL_VAR: &str = "ACCEPTANCE_TEST_SERVER_URL";
pub const USERNAME_VAR: &str = "ACCEPTANCE_TEST_USERNAME";
pub const PASSWORD_VAR: &str = "ACCEPTANCE_TEST_PASSWORD";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the running application, without a trailing slash
    pub url: String,

    /// Credentials of an account allowed to upload activities
    pub username: String,
    pub password: String,
}

impl Settings {
    /// Load settings from the process environment. Fails before any test
    /// runs if one of the required variables is missing.
    pub fn from_env() -> E2eResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> E2eResult<Self> {
        Ok(Self {
            url: required(&lookup, SERVER_URL_VAR)?,
            username: required(&lookup, USERNAME_VAR)?,
            password: required(&lookup, PASSWORD_VAR)?,
        })
    }
}

// An empty value counts as unset.
fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> E2eResult<String> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(E2eError::Configuration(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        env(&[
            (SERVER_URL_VAR, "http://127.0.0.1:8080"),
            (USERNAME_VAR, "runner"),
            (PASSWORD_VAR, "s3cret"),
        ])
    }

    #[test]
    fn test_loads_all_variables() {
        let vars = complete();
        let settings = Settings::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(settings.url, "http://127.0.0.1:8080");
        assert_eq!(settings.username, "runner");
        assert_eq!(settings.password, "s3cret");
    }

    #[test]
    fn test_missing_variable_is_named() {
        for missing in [SERVER_URL_VAR, USERNAME_VAR, PASSWORD_VAR] {
            let mut vars = complete();
            vars.remove(missing);

            let err = Settings::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("{} environment variable is not set", missing)
            );
        }
    }

    #[test]
    fn test_empty_variable_counts_as_unset() {
        let mut vars = complete();
        vars.insert(PASSWORD_VAR.to_string(), String::new());

        let err = Settings::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, E2eError::Configuration(PASSWORD_VAR)));
    }
}
