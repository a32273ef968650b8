//! Reader configuration files.
//!
//! A YAML file holds any subset of [`ReaderConfig`] fields; the rest keep
//! their defaults. Values may reference the environment with `${VAR}` or
//! `${VAR:-default}`.

use anyhow::{Context, Result};
use point_reader::ReaderConfig;
use std::path::Path;

/// Load from `path` when given, otherwise from environment variables.
pub fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => ReaderConfig::from_env(),
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid reader configuration: {}", e))?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<ReaderConfig> {
    let expanded = expand_env_vars(content)?;
    if expanded.trim().is_empty() {
        return Ok(ReaderConfig::default());
    }
    Ok(serde_yaml::from_str(&expanded)?)
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }
            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
