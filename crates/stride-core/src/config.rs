use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::graph::CyclePolicy;

/// Project-level settings from `.stride/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub dependencies: DependencyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Unset means "inherit from the user config, else reject".
    #[serde(default)]
    pub cycle_policy: Option<CyclePolicy>,
}

/// Per-user defaults from `~/.config/stride/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub cycle_policy: Option<CyclePolicy>,
}

/// Settings after applying CLI flags, environment, project and user files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cycle_policy: CyclePolicy,
    pub resolved_output: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::default(),
            resolved_output: "json".to_string(),
        }
    }
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".stride/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("stride/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective configuration.
///
/// Precedence, highest first: CLI flags, `STRIDE_CYCLE_POLICY` / `FORMAT`
/// environment variables, project config, user config, built-in defaults.
pub fn resolve_config(
    project_root: &Path,
    cli_json: bool,
    cli_policy: Option<CyclePolicy>,
) -> Result<EngineConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_policy = env::var("STRIDE_CYCLE_POLICY").ok();
    let cycle_policy = resolve_cycle_policy(
        cli_policy,
        env_policy.as_deref(),
        project.dependencies.cycle_policy,
        user.cycle_policy,
    )?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output, env_format);

    Ok(EngineConfig {
        cycle_policy,
        resolved_output,
    })
}

fn resolve_cycle_policy(
    cli: Option<CyclePolicy>,
    env_value: Option<&str>,
    project: Option<CyclePolicy>,
    user: Option<CyclePolicy>,
) -> Result<CyclePolicy> {
    if let Some(policy) = cli {
        return Ok(policy);
    }
    if let Some(raw) = env_value {
        return raw
            .parse::<CyclePolicy>()
            .map_err(anyhow::Error::msg)
            .context("Invalid STRIDE_CYCLE_POLICY");
    }
    Ok(project.or(user).unwrap_or_default())
}

fn resolve_output(cli_json: bool, user_output: Option<String>, env_format: Option<String>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "human" => Some("pretty"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "json".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.dependencies.cycle_policy, None);
    }

    #[test]
    fn project_config_parses_policy() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        std::fs::create_dir_all(root.path().join(".stride")).expect("create .stride");
        std::fs::write(
            root.path().join(".stride/config.toml"),
            "[dependencies]\ncycle_policy = \"warn\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.dependencies.cycle_policy, Some(CyclePolicy::Warn));
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        std::fs::create_dir_all(root.path().join(".stride")).expect("create .stride");
        std::fs::write(
            root.path().join(".stride/config.toml"),
            "[dependencies]\ncycle_policy = \"sometimes\"\n",
        )
        .expect("write config");

        let err = load_project_config(root.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"), "{err}");
    }

    #[test]
    fn cli_policy_wins() {
        let policy = resolve_cycle_policy(
            Some(CyclePolicy::Reject),
            Some("warn"),
            Some(CyclePolicy::Warn),
            Some(CyclePolicy::Warn),
        )
        .expect("resolve should succeed");
        assert_eq!(policy, CyclePolicy::Reject);
    }

    #[test]
    fn env_policy_beats_files() {
        let policy = resolve_cycle_policy(None, Some("warn"), Some(CyclePolicy::Reject), None)
            .expect("resolve should succeed");
        assert_eq!(policy, CyclePolicy::Warn);
        assert!(resolve_cycle_policy(None, Some("maybe"), None, None).is_err());
    }

    #[test]
    fn project_beats_user_beats_default() {
        assert_eq!(
            resolve_cycle_policy(None, None, Some(CyclePolicy::Reject), Some(CyclePolicy::Warn))
                .expect("resolve"),
            CyclePolicy::Reject
        );
        assert_eq!(
            resolve_cycle_policy(None, None, None, Some(CyclePolicy::Warn)).expect("resolve"),
            CyclePolicy::Warn
        );
        assert_eq!(
            resolve_cycle_policy(None, None, None, None).expect("resolve"),
            CyclePolicy::Reject
        );
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn output_aliases_are_normalized() {
        assert_eq!(resolve_output(false, None, Some("human".to_string())), "pretty");
        assert_eq!(resolve_output(false, Some("json".to_string()), Some("bogus".to_string())), "json");
    }

    #[test]
    fn user_config_parses() {
        let cfg: UserConfig =
            toml::from_str("output = \"json\"\ncycle_policy = \"warn\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.cycle_policy, Some(CyclePolicy::Warn));
    }
}
