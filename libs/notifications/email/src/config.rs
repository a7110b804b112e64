//! Service configuration.
//!
//! Everything here is plain data resolved by the caller. Reading the process
//! environment is left to the bootstrap layer (see `core_config::email`).

use crate::error::{EmailError, EmailResult};
use crate::models::Charsets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Region used when none is configured.
pub const DEFAULT_SES_REGION: &str = "us-east-1";

/// Options for the AWS SES provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SesOptions {
    /// AWS region; defaults to `us-east-1`
    #[serde(default)]
    pub region: Option<String>,
    /// Named profile from the shared credentials file
    #[serde(default)]
    pub profile: Option<String>,
}

impl SesOptions {
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_SES_REGION)
    }
}

/// Delivery backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    #[serde(alias = "aws")]
    Ses(SesOptions),
}

impl ProviderConfig {
    /// Select a provider by its configuration tag.
    pub fn from_tag(tag: &str, ses: SesOptions) -> EmailResult<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "ses" | "aws" => Ok(Self::Ses(ses)),
            other => Err(EmailError::Config(format!(
                "Unsupported email provider: {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ses(_) => "aws-ses",
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Ses(SesOptions::default())
    }
}

/// Which rendered bodies must be non-empty before a message is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// HTML body required, text body optional
    #[default]
    HtmlRequired,
    /// Both HTML and text bodies required
    BothRequired,
}

impl BodyPolicy {
    pub fn requires_text(&self) -> bool {
        matches!(self, Self::BothRequired)
    }
}

/// Configuration for [`crate::EmailService`], fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Root directory scanned for template files
    #[serde(default)]
    pub template_directory: Option<PathBuf>,
    pub sender_address: String,
    pub reply_to_address: String,
    #[serde(default)]
    pub charsets: Charsets,
    #[serde(default)]
    pub body_policy: BodyPolicy,
}

impl ServiceConfig {
    /// Create a config for the default provider; reply-to falls back to the sender.
    pub fn new(sender_address: impl Into<String>) -> Self {
        let sender_address = sender_address.into();
        Self {
            provider: ProviderConfig::default(),
            template_directory: None,
            reply_to_address: sender_address.clone(),
            sender_address,
            charsets: Charsets::default(),
            body_policy: BodyPolicy::default(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_template_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.template_directory = Some(directory.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to_address = reply_to.into();
        self
    }

    pub fn with_charsets(mut self, charsets: Charsets) -> Self {
        self.charsets = charsets;
        self
    }

    pub fn with_body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }
}
