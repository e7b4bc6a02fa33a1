use std::path::Path;

use chunkgraph_extract::{ScopeRanges, TypeCode};
use serde::{Deserialize, Serialize};

use crate::analyze::validate::PASS_NAMES;
use crate::error::ConfigError;

/// Conventional config file name looked up next to the inputs.
pub const CONFIG_FILE_NAME: &str = "chunkgraph.toml";

/// Top-level chunkgraph configuration, matching `chunkgraph.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkgraphConfig {
    #[serde(default)]
    pub scope: ScopeRanges,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub input: InputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Default bound for blast-radius traversal.
    pub blast_radius_depth: usize,
    /// Sibling examples shown per orphan explanation.
    pub max_sibling_examples: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            blast_radius_depth: 3,
            max_sibling_examples: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    /// Validator passes to run, by name.
    pub passes: Vec<String>,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            passes: PASS_NAMES.iter().map(|&name| name.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Type codes that must have a registered rule before a build starts.
    pub required_types: Vec<TypeCode>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            required_types: vec![
                TypeCode::BHAV,
                TypeCode::OBJD,
                TypeCode::TTAB,
                TypeCode::OBJF,
                TypeCode::DGRP,
                TypeCode::SPR2,
                TypeCode::BCON,
                TypeCode::STR,
                TypeCode::GLOB,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.json".into()],
            exclude_patterns: vec![CONFIG_FILE_NAME.into(), "**/target/**".into()],
        }
    }
}

impl ChunkgraphConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file is an error here; see
    /// [`Self::load_or_default`] for the lenient variant.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `path` if given and present, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            Some(p) => {
                tracing::debug!(path = %p.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject semantically invalid values that parsed fine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scope
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.analysis.blast_radius_depth == 0 {
            return Err(ConfigError::Invalid(
                "analysis.blast_radius_depth must be at least 1".into(),
            ));
        }

        let unknown: Vec<&str> = self
            .validation
            .passes
            .iter()
            .map(String::as_str)
            .filter(|name| !PASS_NAMES.contains(name))
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "unknown validation pass(es): {} (known: {})",
                unknown.join(", "),
                PASS_NAMES.join(", ")
            )));
        }

        if self.input.include_patterns.is_empty() {
            return Err(ConfigError::Invalid(
                "input.include_patterns must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkgraph_extract::IdRange;

    #[test]
    fn default_config_is_valid() {
        let config = ChunkgraphConfig::default();
        config.validate().unwrap();
        assert_eq!(config.analysis.blast_radius_depth, 3);
        assert_eq!(config.validation.passes.len(), PASS_NAMES.len());
        assert!(config.registry.required_types.contains(&TypeCode::BHAV));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ChunkgraphConfig::from_toml_str(
            r#"
            [analysis]
            blast_radius_depth = 5
            max_sibling_examples = 1

            [registry]
            required_types = ["BHAV", "STR#"]
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.blast_radius_depth, 5);
        assert_eq!(config.registry.required_types, vec![TypeCode::BHAV, TypeCode::STR]);
        assert_eq!(config.input.include_patterns, vec!["**/*.json".to_string()]);
        assert_eq!(config.scope.object_local, ScopeRanges::default().object_local);
    }

    #[test]
    fn single_field_section_fills_the_rest() {
        let config =
            ChunkgraphConfig::from_toml_str("[analysis]\nblast_radius_depth = 5\n").unwrap();
        assert_eq!(config.analysis.blast_radius_depth, 5);
        assert_eq!(config.analysis.max_sibling_examples, 3);

        let config =
            ChunkgraphConfig::from_toml_str("[input]\ninclude_patterns = [\"*.dump.json\"]\n")
                .unwrap();
        assert_eq!(config.input.include_patterns, vec!["*.dump.json".to_string()]);
        assert_eq!(config.input.exclude_patterns, InputSection::default().exclude_patterns);
    }

    #[test]
    fn scope_ranges_are_injectable() {
        let config = ChunkgraphConfig::from_toml_str(
            r"
            [scope]
            object_local = { start = 0x1000, end = 0x1800 }
            shared_library = { start = 0x1800, end = 0x3000 }
            ",
        )
        .unwrap();
        assert_eq!(config.scope.shared_library, IdRange::new(0x1800, 0x3000));
    }

    #[test]
    fn overlapping_ranges_are_invalid() {
        let err = ChunkgraphConfig::from_toml_str(
            r"
            [scope]
            object_local = { start = 0x1000, end = 0x2800 }
            ",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ChunkgraphConfig::from_toml_str("[analysis\nblast").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_pass_is_rejected() {
        let err = ChunkgraphConfig::from_toml_str(
            r#"
            [validation]
            passes = ["missing_ref", "spelling"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("spelling"));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(CONFIG_FILE_NAME);
        let config = ChunkgraphConfig::load_or_default(Some(&missing)).unwrap();
        assert_eq!(config.analysis.max_sibling_examples, 3);
        assert!(matches!(
            ChunkgraphConfig::load(&missing),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[input]\ninclude_patterns = [\"*.dump.json\"]\nexclude_patterns = []\n",
        )
            .unwrap();
        let config = ChunkgraphConfig::load(&path).unwrap();
        assert_eq!(config.input.include_patterns, vec!["*.dump.json".to_string()]);
    }
}
