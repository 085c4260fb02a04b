use crm::TextureOptions;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use srfile::ParseOptions;
use std::path::Path;

/// Settings file layout:
///
/// ```toml
/// [parse]
/// forced_platform = "psx"
///
/// [textures]
/// quantize_bounds = true
/// use_each_unique_texture_clut_variation = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parse: ParseOptions,
    pub textures: TextureOptions,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&raw).wrap_err_with(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).into_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srmodel::Platform;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").expect("config");
        assert_eq!(config.parse, ParseOptions::default());
        assert_eq!(config.textures, TextureOptions::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            "[parse]\nforced_platform = \"dreamcast\"\n\n[textures]\nquantize_bounds = false\nunhide_completely_transparent_textures = true\n",
        )
        .expect("config");
        assert_eq!(config.parse.forced_platform, Some(Platform::Dreamcast));
        assert!(!config.textures.quantize_bounds);
        assert!(config.textures.unhide_completely_transparent_textures);
        assert!(!config.textures.draw_greyscale_first);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(Config::from_toml("[parse]\nforced_platform = \"saturn\"\n").is_err());
    }
}
