use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the external compiler is invoked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ToolchainConfig {
    pub program: String,
    /// Arguments for the host build. `{output}` and `{entry}` are substituted.
    pub host_args: Vec<String>,
    /// Arguments for a plugin build. `{output}` and `{source}` are substituted.
    pub plugin_args: Vec<String>,
    /// File extension of a loadable plugin artifact, without the dot
    pub plugin_extension: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub extra_env: HashMap<String, String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            host_args: ["build", "-o", "{output}", "{entry}"]
                .map(String::from)
                .to_vec(),
            plugin_args: ["build", "-buildmode=plugin", "-o", "{output}", "{source}"]
                .map(String::from)
                .to_vec(),
            plugin_extension: "so".to_string(),
            extra_env: HashMap::new(),
        }
    }
}

/// Substitute `{name}` placeholders in an argument template
pub fn render_args(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let config = ToolchainConfig::default();
        let args = render_args(
            &config.plugin_args,
            &[("output", "/out/docs.so"), ("source", "/src/contrib/docs")],
        );
        assert_eq!(
            args,
            vec!["build", "-buildmode=plugin", "-o", "/out/docs.so", "/src/contrib/docs"]
        );
    }

    #[test]
    fn test_render_args_inside_larger_argument() {
        let template = vec!["-c".to_string(), "touch {output}".to_string()];
        let args = render_args(&template, &[("output", "/tmp/x.so")]);
        assert_eq!(args[1], "touch /tmp/x.so");
    }

    #[test]
    fn test_unknown_placeholder_is_left_alone() {
        let template = vec!["{other}".to_string()];
        assert_eq!(render_args(&template, &[("output", "x")]), vec!["{other}"]);
    }
}
