//! Email service: renders a message and hands it to the configured provider.

use crate::config::ServiceConfig;
use crate::error::{EmailError, EmailResult};
use crate::models::{Destination, EmailInstance, ProviderMessage, TemplateType};
use crate::provider::{self, EmailProvider};
use crate::render::{RenderPipeline, UNNAMED_TEMPLATE};
use crate::templates::cache_key;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sends templated emails.
///
/// Each service owns its template cache and provider; instances share nothing.
pub struct EmailService {
    config: ServiceConfig,
    provider: Arc<dyn EmailProvider>,
    pipeline: RenderPipeline,
}

impl EmailService {
    /// Create a service with an explicit provider.
    ///
    /// The template directory (if any) is indexed once here.
    pub fn new(config: ServiceConfig, provider: Arc<dyn EmailProvider>) -> EmailResult<Self> {
        let pipeline = RenderPipeline::new(config.template_directory.as_deref())?;

        Ok(Self {
            config,
            provider,
            pipeline,
        })
    }

    /// Create a service with the provider selected by the configuration.
    pub async fn from_config(config: ServiceConfig) -> EmailResult<Self> {
        let provider = provider::from_config(&config.provider).await?;
        Self::new(config, provider)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Name of the configured provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Render and send one email.
    ///
    /// `template_name` selects `name.html` / `name.txt` templates; inline
    /// content, when given, is compiled under the same key instead of reading
    /// a file. Keys in `extra_context` are merged next to `email`.
    ///
    /// # Errors
    ///
    /// - [`EmailError::TemplateNotFound`] when the HTML body (or, with
    ///   [`crate::BodyPolicy::BothRequired`], the text body) renders empty
    /// - [`EmailError::Template`] / [`EmailError::Inlining`] on render failures
    /// - [`EmailError::Delivery`] when the provider fails
    ///
    /// Nothing is sent when rendering fails.
    #[instrument(skip_all, fields(template = ?template_name, name = %email.name))]
    pub async fn send_email(
        &self,
        email: &EmailInstance,
        template_name: Option<&str>,
        extra_context: Option<Map<String, Value>>,
        html_content: Option<&str>,
        text_content: Option<&str>,
    ) -> EmailResult<bool> {
        let context = email.render_context(extra_context)?;

        let html_body = self
            .pipeline
            .render_html_body(template_name, html_content, &context)
            .await?;

        let text_body = self
            .pipeline
            .render_text_body(template_name, text_content, &context)
            .await?;

        if text_body.is_empty() && self.config.body_policy.requires_text() {
            return Err(EmailError::TemplateNotFound(cache_key(
                template_name.unwrap_or(UNNAMED_TEMPLATE),
                TemplateType::Txt,
            )));
        }

        let subject = self.pipeline.render_subject(&email.subject, &context).await?;

        let message = ProviderMessage {
            html_body,
            text_body,
            subject,
            destination: Destination::from_email(email),
            sender_address: self.config.sender_address.clone(),
            reply_to_address: self.config.reply_to_address.clone(),
            charsets: self.config.charsets.clone(),
        };

        debug!(
            to = ?message.destination.to_addresses,
            subject = %message.subject,
            "Dispatching email"
        );

        self.provider.send_email(&message).await
    }

    /// Check the provider's health
    pub async fn health_check(&self) -> EmailResult<()> {
        self.provider.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyPolicy;
    use crate::provider::MockEmailProvider;
    use serde_json::json;
    use std::fs;

    fn config() -> ServiceConfig {
        ServiceConfig::new("me@company.com").with_reply_to("help@company.com")
    }

    fn bob() -> EmailInstance {
        EmailInstance::new("bob", "Welcome", "bob@company.com")
    }

    fn context(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_missing_html_template_never_calls_provider() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send_email().times(0);

        let service = EmailService::new(config(), Arc::new(provider)).unwrap();
        let result = service
            .send_email(&bob(), Some("missing"), None, None, None)
            .await;

        assert!(matches!(result, Err(EmailError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_message_is_assembled_from_config_and_email() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send_email()
            .withf(|m: &ProviderMessage| {
                m.sender_address == "me@company.com"
                    && m.reply_to_address == "help@company.com"
                    && m.destination.to_addresses == vec!["bob@company.com".to_string()]
                    && m.destination.cc_addresses.is_empty()
                    && m.destination.bcc_addresses.is_empty()
                    && m.subject == "Welcome to the party bob"
                    && m.text_body == "Reset your password, bob"
                    && m.charsets.text == "utf-8"
            })
            .times(1)
            .returning(|_| Ok(true));

        let service = EmailService::new(config(), Arc::new(provider)).unwrap();
        let email = EmailInstance::new("bob", "Welcome to the party {{ email.name }}", "bob@company.com");

        let sent = service
            .send_email(
                &email,
                None,
                None,
                Some("<p>Reset your password, {{email.name}}</p>"),
                Some("Reset your password, {{email.name}}"),
            )
            .await
            .unwrap();

        assert!(sent);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send_email()
            .times(1)
            .returning(|_| Err(EmailError::Delivery("quota exceeded".to_string())));

        let service = EmailService::new(config(), Arc::new(provider)).unwrap();
        let result = service
            .send_email(&bob(), None, None, Some("<p>hi</p>"), None)
            .await;

        match result {
            Err(EmailError::Delivery(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected Delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_text_tolerated_by_default() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send_email()
            .withf(|m: &ProviderMessage| m.text_body.is_empty())
            .times(1)
            .returning(|_| Ok(true));

        let service = EmailService::new(config(), Arc::new(provider)).unwrap();
        let sent = service
            .send_email(&bob(), None, None, Some("<p>hi</p>"), None)
            .await
            .unwrap();

        assert!(sent);
    }

    #[tokio::test]
    async fn test_missing_text_rejected_when_both_required() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send_email().times(0);

        let service = EmailService::new(
            config().with_body_policy(BodyPolicy::BothRequired),
            Arc::new(provider),
        )
        .unwrap();
        let result = service
            .send_email(&bob(), Some("welcome"), None, Some("<p>hi</p>"), None)
            .await;

        match result {
            Err(EmailError::TemplateNotFound(key)) => assert_eq!(key, "welcome.txt"),
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_required_sends_when_both_present() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send_email().times(1).returning(|_| Ok(true));

        let service = EmailService::new(
            config().with_body_policy(BodyPolicy::BothRequired),
            Arc::new(provider),
        )
        .unwrap();

        let sent = service
            .send_email(&bob(), None, None, Some("<p>hi</p>"), Some("hi"))
            .await
            .unwrap();
        assert!(sent);
    }

    #[tokio::test]
    async fn test_nested_context_in_both_bodies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("promotion.html"),
            "<p>{{email.name}} is now level {{authority.level}}</p>",
        )
        .unwrap();
        fs::write(
            dir.path().join("promotion.txt"),
            "{{email.name}} is now level {{authority.level}}",
        )
        .unwrap();

        let mut provider = MockEmailProvider::new();
        provider
            .expect_send_email()
            .withf(|m: &ProviderMessage| {
                m.html_body.contains("bob is now level 2") && m.text_body == "bob is now level 2"
            })
            .times(1)
            .returning(|_| Ok(true));

        let service = EmailService::new(
            config().with_template_directory(dir.path()),
            Arc::new(provider),
        )
        .unwrap();

        service
            .send_email(
                &bob(),
                Some("promotion"),
                context(json!({ "authority": { "level": 2 } })),
                None,
                None,
            )
            .await
            .unwrap();
    }
}
