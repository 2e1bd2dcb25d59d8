use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::blend::DEFAULT_TARGET;
use crate::merge::MergeMode;

/// Project configuration loaded from `.blender.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlenderConfig {
    /// OpenAPI document to blend into.
    pub input: Option<String>,
    /// Output file; defaults to `<input>.modified`.
    pub output: Option<String>,
    pub model_name: String,
    pub spec_root_dir: String,
    pub blending_schemas: Vec<String>,
    pub mode: MergeMode,
    pub autodiscover: bool,
    pub sorted: bool,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            model_name: DEFAULT_TARGET.to_string(),
            spec_root_dir: ".".to_string(),
            blending_schemas: Vec::new(),
            mode: MergeMode::Fix,
            autodiscover: false,
            sorted: false,
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".blender.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<BlenderConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: BlenderConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# blender configuration
# input: api/productOrderManagement.api.yaml
# output: api/productOrderManagement.blended.yaml
model_name: MEFProductConfiguration
spec_root_dir: .
blending_schemas: []
  # - product-schemas/carrier-ethernet/access-eline-ovc.yaml
  # - product-schemas/common/model.yaml#/definitions/Uni

mode: fix             # fix | relaxed | strict
autodiscover: false   # honour x-mef-target on product schemas
sorted: false         # sort schema components by name
"#
}
