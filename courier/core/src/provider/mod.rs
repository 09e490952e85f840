//! Provider Parameter Assembly
//!
//! Pure data shaping for the supported AI vendors: which endpoint a request
//! goes to and what the request body looks like. Nothing here performs I/O;
//! the assembled [`Message`] is handed to a transport by the caller.
//!
//! All four vendors speak the OpenAI-compatible chat-completions dialect,
//! differing only in endpoint base and credentials.

pub mod catalog;

pub use catalog::{default_catalog_path, Catalog, CatalogError};

use std::fmt;
use std::str::FromStr;

use crate::history::ChatMessage;
use crate::message::Message;

/// Supported AI model vendors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vendor {
    /// DeepSeek platform
    DeepSeek,
    /// Alibaba DashScope (Qwen models)
    Qwen,
    /// Moonshot (Kimi models)
    Kimi,
    /// Volcengine Ark (Doubao models)
    Doubao,
}

impl Vendor {
    /// Canonical lowercase name, as used in catalog files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::Kimi => "kimi",
            Self::Doubao => "doubao",
        }
    }

    /// Default API endpoint base for this vendor
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Self::Kimi => "https://api.moonshot.cn/v1",
            Self::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "qwen" => Ok(Self::Qwen),
            "kimi" => Ok(Self::Kimi),
            "doubao" => Ok(Self::Doubao),
            other => Err(CatalogError::UnknownVendor(other.to_string())),
        }
    }
}

/// Default token budget when the catalog does not set one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The resolved parameter bundle for one vendor/model pair.
///
/// Usually produced by [`Catalog::resolve`]; the exchange core consumes this
/// bundle and never reads the catalog file itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderParams {
    /// Which vendor the bundle targets
    pub vendor: Vendor,
    /// API endpoint base address
    pub base_url: String,
    /// Model identifier, vendor-specific
    pub model: String,
    /// Response token budget
    pub max_tokens: u32,
    /// Sampling temperature, when the catalog sets one
    pub temperature: Option<f64>,
    /// Long-lived API key, when the catalog carries one
    pub api_key: Option<String>,
}

impl ProviderParams {
    /// Create a bundle with the vendor's default endpoint and token budget
    #[must_use]
    pub fn new(vendor: Vendor, model: impl Into<String>) -> Self {
        Self {
            vendor,
            base_url: vendor.default_base_url().to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            api_key: None,
        }
    }

    /// Override the endpoint base
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the token budget
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Assembles requests for one resolved vendor/model pair.
///
/// A short-lived token, shared by every profile while it lasts, takes
/// precedence over the catalog's long-lived key.
#[derive(Clone, Debug)]
pub struct ProviderProfile {
    params: ProviderParams,
    token: Option<String>,
}

impl ProviderProfile {
    /// Create a profile from a resolved bundle
    #[must_use]
    pub fn new(params: ProviderParams) -> Self {
        Self {
            params,
            token: None,
        }
    }

    /// Set or refresh the short-lived token
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// The resolved bundle this profile assembles for
    #[must_use]
    pub fn params(&self) -> &ProviderParams {
        &self.params
    }

    /// Full chat-completions URL for this profile
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.params.base_url.trim_end_matches('/')
        )
    }

    /// Credential for the Authorization header: the short-lived token when
    /// present, otherwise the catalog's key
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().or(self.params.api_key.as_deref())
    }

    /// Assemble the request body for a transcript
    #[must_use]
    pub fn build_request(&self, messages: &[ChatMessage], stream: bool) -> Message {
        let mut request = Message::new()
            .with("model", self.params.model.clone())
            .with("messages", serde_json::json!(messages))
            .with("stream", stream)
            .with("max_tokens", self.params.max_tokens);
        if let Some(temperature) = self.params.temperature {
            request.insert("temperature", temperature);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vendor_parse_roundtrip() {
        for vendor in [Vendor::DeepSeek, Vendor::Qwen, Vendor::Kimi, Vendor::Doubao] {
            assert_eq!(vendor.as_str().parse::<Vendor>().unwrap(), vendor);
        }
        assert!("openai".parse::<Vendor>().is_err());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("DeepSeek".parse::<Vendor>().unwrap(), Vendor::DeepSeek);
    }

    #[test]
    fn test_chat_url_handles_trailing_slash() {
        let profile = ProviderProfile::new(
            ProviderParams::new(Vendor::Kimi, "moonshot-v1-8k").with_base_url("https://host/v1/"),
        );
        assert_eq!(profile.chat_url(), "https://host/v1/chat/completions");
    }

    #[test]
    fn test_build_request_shape() {
        let params = ProviderParams::new(Vendor::DeepSeek, "deepseek-chat")
            .with_max_tokens(512)
            .with_temperature(0.3);
        let profile = ProviderProfile::new(params);

        let transcript = vec![
            ChatMessage::new(Role::System, "be terse"),
            ChatMessage::new(Role::User, "hello"),
        ];
        let request = profile.build_request(&transcript, true);

        assert_eq!(
            request.get("model").and_then(|v| v.as_str()),
            Some("deepseek-chat")
        );
        assert!(request.flag("stream"));
        assert_eq!(request.get("max_tokens").and_then(|v| v.as_u64()), Some(512));
        assert_eq!(
            request.get("temperature").and_then(|v| v.as_f64()),
            Some(0.3)
        );
        let messages = request.get("messages").and_then(|v| v.as_array()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn test_temperature_omitted_when_unset() {
        let profile = ProviderProfile::new(ProviderParams::new(Vendor::Qwen, "qwen-turbo"));
        let request = profile.build_request(&[], false);
        assert!(request.get("temperature").is_none());
    }

    #[test]
    fn test_short_lived_token_wins() {
        let params = ProviderParams::new(Vendor::Doubao, "doubao-pro").with_api_key("long-lived");
        let mut profile = ProviderProfile::new(params);
        assert_eq!(profile.bearer_token(), Some("long-lived"));

        profile.set_token("short-lived");
        assert_eq!(profile.bearer_token(), Some("short-lived"));
    }
}
