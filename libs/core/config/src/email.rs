use crate::{env_flag, env_optional, env_or_default, env_required, ConfigError, FromEnv};

/// Default directory scanned for email templates
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Default AWS region for SES
pub const DEFAULT_REGION: &str = "us-east-1";

/// Email delivery configuration read from the environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailConfig {
    /// Provider tag (`ses` or `aws`)
    pub provider: String,
    pub region: String,
    /// Named AWS credential profile
    pub profile: Option<String>,
    pub template_directory: String,
    pub sender_address: String,
    pub reply_to_address: String,
    /// Reject messages whose text body renders empty
    pub require_text_body: bool,
}

impl FromEnv for EmailConfig {
    /// Requires SENDER_EMAIL_ADDRESS; everything else has a default:
    /// - REPLY_TO_ADDRESS: falls back to the sender address
    /// - EMAIL_PROVIDER: defaults to "ses"
    /// - AWS_SES_REGION, then AWS_REGION: defaults to "us-east-1"
    /// - AWS_PROFILE: optional
    /// - EMAIL_TEMPLATE_DIR: defaults to "templates"
    /// - EMAIL_REQUIRE_TEXT_BODY: defaults to false
    fn from_env() -> Result<Self, ConfigError> {
        let sender_address = env_required("SENDER_EMAIL_ADDRESS")?;
        let reply_to_address =
            env_optional("REPLY_TO_ADDRESS").unwrap_or_else(|| sender_address.clone());

        let region = env_optional("AWS_SES_REGION")
            .or_else(|| env_optional("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(Self {
            provider: env_or_default("EMAIL_PROVIDER", "ses"),
            region,
            profile: env_optional("AWS_PROFILE"),
            template_directory: env_or_default("EMAIL_TEMPLATE_DIR", DEFAULT_TEMPLATE_DIR),
            sender_address,
            reply_to_address,
            require_text_body: env_flag("EMAIL_REQUIRE_TEXT_BODY", false)?,
        })
    }
}
