use crate::config::OutputFormat;
use anyhow::{Context, Result};
use serde::Serialize;

/// Render a composed graph in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat, pretty: bool) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json if pretty => {
            serde_json::to_string_pretty(value).context("Failed to serialize graph as JSON")?
        }
        OutputFormat::Json => {
            serde_json::to_string(value).context("Failed to serialize graph as JSON")?
        }
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(value).context("Failed to serialize graph as YAML")?
        }
    };

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"
version: '2.0'
basic:
  tasks:
    a:
      on-success: [b]
    b: {}
"#;

    #[test]
    fn test_render_json() {
        let graph = weft_core::compose(DEFINITION).unwrap();

        let compact = render(&graph, OutputFormat::Json, false).unwrap();
        assert!(!compact.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(value["tasks"][0]["id"], "a");
        assert_eq!(value["sequences"][0]["to"], "b");

        let pretty = render(&graph, OutputFormat::Json, true).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_render_yaml() {
        let graph = weft_core::compose(DEFINITION).unwrap();
        let yaml = render(&graph, OutputFormat::Yaml, true).unwrap();

        assert!(yaml.contains("tasks:"));
        assert!(yaml.contains("sequences:"));
        assert!(yaml.contains("from: a"));
    }
}
