//! Provider Catalog
//!
//! TOML configuration mapping vendor name to model name to a parameter
//! bundle. The exchange core never reads this file during an exchange; it
//! consumes the bundle [`Catalog::resolve`] produces.
//!
//! # Example Catalog
//!
//! ```toml
//! [vendors.deepseek]
//! api_key = "sk-..."
//!
//! [vendors.deepseek.models."deepseek-chat"]
//! max_tokens = 8192
//! temperature = 0.7
//!
//! [vendors.qwen]
//! base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1"
//!
//! [vendors.qwen.models."qwen-turbo"]
//! max_tokens = 4096
//! ```
//!
//! `base_url` is optional per vendor; each supported vendor has a built-in
//! default endpoint.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{ProviderParams, Vendor, DEFAULT_MAX_TOKENS};

/// Errors from loading or resolving the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("failed to read catalog at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// The vendor is not supported or not present in the catalog
    #[error("unknown vendor: {0}")]
    UnknownVendor(String),

    /// The vendor exists but does not list this model
    #[error("unknown model {model} for vendor {vendor}")]
    UnknownModel {
        /// Vendor that was looked up
        vendor: String,
        /// Model that was missing
        model: String,
    },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct VendorToml {
    base_url: Option<String>,
    api_key: Option<String>,
    models: HashMap<String, ModelToml>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct ModelToml {
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogToml {
    vendors: HashMap<String, VendorToml>,
}

/// Parsed provider catalog
#[derive(Debug, Default)]
pub struct Catalog {
    vendors: HashMap<String, VendorToml>,
}

impl Catalog {
    /// Load a catalog from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self, CatalogError> {
        let parsed: CatalogToml = toml::from_str(input)?;
        Ok(Self {
            vendors: parsed.vendors,
        })
    }

    /// Vendor names present in the catalog
    #[must_use]
    pub fn vendor_names(&self) -> Vec<&str> {
        self.vendors.keys().map(String::as_str).collect()
    }

    /// Resolve the parameter bundle for one vendor/model pair.
    ///
    /// # Errors
    ///
    /// [`CatalogError::UnknownVendor`] when the vendor is unsupported or not
    /// in the catalog; [`CatalogError::UnknownModel`] when the vendor does
    /// not list the model.
    pub fn resolve(&self, vendor: &str, model: &str) -> Result<ProviderParams, CatalogError> {
        let parsed: Vendor = vendor.parse()?;
        let key = parsed.as_str();

        let entry = self
            .vendors
            .get(key)
            .ok_or_else(|| CatalogError::UnknownVendor(key.to_string()))?;
        let model_entry = entry
            .models
            .get(model)
            .ok_or_else(|| CatalogError::UnknownModel {
                vendor: key.to_string(),
                model: model.to_string(),
            })?;

        let mut params = ProviderParams::new(parsed, model)
            .with_max_tokens(model_entry.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
        if let Some(base_url) = &entry.base_url {
            params = params.with_base_url(base_url.clone());
        }
        if let Some(temperature) = model_entry.temperature {
            params = params.with_temperature(temperature);
        }
        if let Some(api_key) = &entry.api_key {
            params = params.with_api_key(api_key.clone());
        }
        Ok(params)
    }
}

/// Default catalog location: `$XDG_CONFIG_HOME/courier/catalog.toml`
#[must_use]
pub fn default_catalog_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("courier").join("catalog.toml"))
        .unwrap_or_else(|| PathBuf::from("catalog.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [vendors.deepseek]
        api_key = "sk-test"

        [vendors.deepseek.models."deepseek-chat"]
        max_tokens = 8192
        temperature = 0.7

        [vendors.kimi]
        base_url = "https://kimi.example/v1"

        [vendors.kimi.models."moonshot-v1-8k"]
    "#;

    #[test]
    fn test_resolve_full_bundle() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        let params = catalog.resolve("deepseek", "deepseek-chat").unwrap();

        assert_eq!(params.vendor, Vendor::DeepSeek);
        assert_eq!(params.base_url, "https://api.deepseek.com");
        assert_eq!(params.max_tokens, 8192);
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_resolve_base_url_override_and_defaults() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        let params = catalog.resolve("kimi", "moonshot-v1-8k").unwrap();

        assert_eq!(params.base_url, "https://kimi.example/v1");
        assert_eq!(params.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(params.temperature, None);
        assert_eq!(params.api_key, None);
    }

    #[test]
    fn test_unknown_vendor() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            catalog.resolve("openai", "gpt"),
            Err(CatalogError::UnknownVendor(_))
        ));
        // Supported vendor, but absent from this catalog
        assert!(matches!(
            catalog.resolve("qwen", "qwen-turbo"),
            Err(CatalogError::UnknownVendor(_))
        ));
    }

    #[test]
    fn test_unknown_model() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            catalog.resolve("deepseek", "deepseek-reasoner"),
            Err(CatalogError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            Catalog::from_toml_str("vendors = 3"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert!(catalog.resolve("deepseek", "deepseek-chat").is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Catalog::load("/nonexistent/catalog.toml"),
            Err(CatalogError::Read { .. })
        ));
    }

    #[test]
    fn test_default_path_mentions_catalog() {
        assert!(default_catalog_path().to_string_lossy().contains("catalog.toml"));
    }
}
