use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const ENV_VAR_PATTERN: &str = r"\$\{(\w+)\}|\$(\w+)";

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN)?;
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for caps in re.captures_iter(content) {
        let Some(var) = caps.get(1).or(caps.get(2)) else {
            continue;
        };
        let var_name = var.as_str();
        let placeholder = &caps[0];

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {} = \"{}\"", var_name, value);
                result = result.replace(placeholder, &value);
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                // Placeholder is kept; parse_config warns once more after substitution
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        debug!("Environment variables not set: {:?}", missing_vars);
    }

    Ok(result)
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(ENV_VAR_PATTERN)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_both_forms() {
        env::set_var("GEX_SUB_A", "alpha");
        env::set_var("GEX_SUB_B", "beta");

        let out = substitute_env_vars("a: ${GEX_SUB_A}\nb: $GEX_SUB_B\n").unwrap();
        assert_eq!(out, "a: alpha\nb: beta\n");
        assert!(!has_unresolved_env_vars(&out));
    }

    #[test]
    fn test_missing_var_keeps_placeholder() {
        env::remove_var("GEX_SUB_MISSING");

        let out = substitute_env_vars("port: ${GEX_SUB_MISSING}").unwrap();
        assert_eq!(out, "port: ${GEX_SUB_MISSING}");
        assert!(has_unresolved_env_vars(&out));
    }
}
