use anyhow::Result;
use regex::Regex;
use std::env;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("placeholder pattern compiles"))
}

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
///
/// Unset variables keep their placeholder; the validator reports them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let mut missing_vars = Vec::new();

    let result = placeholder_regex().replace_all(content, |caps: &regex::Captures<'_>| {
        let placeholder = caps.get(0).map_or("", |m| m.as_str());
        let Some(var_name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return placeholder.to_string();
        };
        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                placeholder.to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    placeholder_regex().is_match(content)
}

/// Names of the placeholders still present in `content`
pub fn unresolved_env_vars(content: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_set_variables() {
        env::set_var("REWARDX_TEST_DB_HOST", "db.internal");
        let out = substitute_env_vars("host: ${REWARDX_TEST_DB_HOST}\nport: 5432").unwrap();
        assert_eq!(out, "host: db.internal\nport: 5432");
        assert!(!has_unresolved_env_vars(&out));
    }

    #[test]
    fn test_keeps_missing_placeholders() {
        env::remove_var("REWARDX_TEST_MISSING_PASSWORD");
        let out = substitute_env_vars("password: ${REWARDX_TEST_MISSING_PASSWORD}").unwrap();
        assert_eq!(out, "password: ${REWARDX_TEST_MISSING_PASSWORD}");
        assert!(has_unresolved_env_vars(&out));
        assert_eq!(unresolved_env_vars(&out), vec!["REWARDX_TEST_MISSING_PASSWORD"]);
    }

    #[test]
    fn test_bare_dollar_form() {
        env::set_var("REWARDX_TEST_BARE", "42");
        let out = substitute_env_vars("value: $REWARDX_TEST_BARE").unwrap();
        assert_eq!(out, "value: 42");
    }
}
