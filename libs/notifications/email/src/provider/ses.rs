//! AWS SES (Simple Email Service) provider
//!
//! Sends emails via the AWS SES v2 API.
//!
//! ## Configuration
//!
//! Region and an optional named credential profile come from [`SesOptions`].
//! Credentials otherwise follow the standard AWS SDK resolution chain:
//! - Environment variables: `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
//! - IAM roles (EKS IRSA, EC2 instance profile)
//! - Shared credentials file

use crate::config::SesOptions;
use crate::error::{EmailError, EmailResult};
use crate::models::ProviderMessage;
use crate::provider::EmailProvider;
use async_trait::async_trait;
use aws_sdk_sesv2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client;
use tracing::{debug, error, info};

/// Request parts for a single `SendEmail` call.
#[derive(Debug, Clone)]
pub struct SesRequest {
    pub from_email_address: String,
    pub destination: Destination,
    pub content: EmailContent,
    pub reply_to_addresses: Vec<String>,
}

fn content(data: &str, charset: &str) -> EmailResult<Content> {
    Content::builder()
        .data(data)
        .charset(charset)
        .build()
        .map_err(|e| EmailError::Delivery(format!("Failed to build SES content: {}", e)))
}

/// Translate a rendered message into SES request parts.
///
/// cc/bcc lists are always set, even when empty.
pub fn build_request(message: &ProviderMessage) -> EmailResult<SesRequest> {
    let destination = Destination::builder()
        .set_to_addresses(Some(message.destination.to_addresses.clone()))
        .set_cc_addresses(Some(message.destination.cc_addresses.clone()))
        .set_bcc_addresses(Some(message.destination.bcc_addresses.clone()))
        .build();

    let body = Body::builder()
        .html(content(&message.html_body, &message.charsets.html)?)
        .text(content(&message.text_body, &message.charsets.text)?)
        .build();

    let message_content = Message::builder()
        .subject(content(&message.subject, &message.charsets.subject)?)
        .body(body)
        .build();

    Ok(SesRequest {
        from_email_address: message.sender_address.clone(),
        destination,
        content: EmailContent::builder().simple(message_content).build(),
        reply_to_addresses: vec![message.reply_to_address.clone()],
    })
}

/// Map an SES error code to a readable category.
///
/// `code` is the service error code; dispatch and credential failures carry none.
fn categorize(code: Option<&str>, detail: &str) -> String {
    match code {
        Some("TooManyRequestsException" | "LimitExceededException" | "Throttling") => {
            format!("rate limit exceeded: {}", detail)
        }
        Some(
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "InvalidClientTokenId"
            | "ExpiredTokenException"
            | "SignatureDoesNotMatch",
        ) => format!("authentication failed: {}", detail),
        Some(
            "BadRequestException"
            | "MessageRejected"
            | "MailFromDomainNotVerifiedException"
            | "NotFoundException",
        ) => format!("invalid request: {}", detail),
        _ => format!("SES error: {}", detail),
    }
}

/// AWS SES email provider
pub struct SesProvider {
    client: Client,
}

impl SesProvider {
    /// Create a new SesProvider with an existing AWS SES client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a client for the configured region and credential profile.
    pub async fn from_options(options: &SesOptions) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(options.region().to_string()));

        if let Some(profile) = &options.profile {
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;

        debug!(
            region = %options.region(),
            profile = ?options.profile,
            "AWS SES client configured"
        );

        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl EmailProvider for SesProvider {
    async fn send_email(&self, message: &ProviderMessage) -> EmailResult<bool> {
        let request = build_request(message)?;

        debug!(
            to = ?message.destination.to_addresses,
            subject = %message.subject,
            from = %request.from_email_address,
            "Sending email via AWS SES"
        );

        let response = self
            .client
            .send_email()
            .from_email_address(request.from_email_address)
            .destination(request.destination)
            .content(request.content)
            .set_reply_to_addresses(Some(request.reply_to_addresses))
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(code = ?e.code(), error = %detail, "AWS SES send failed");
                EmailError::Delivery(categorize(e.code(), &detail))
            })?;

        info!(
            message_id = ?response.message_id(),
            "Email sent successfully via AWS SES"
        );

        Ok(true)
    }

    async fn health_check(&self) -> EmailResult<()> {
        // GetAccount is a lightweight call that confirms credentials and access
        self.client
            .get_account()
            .send()
            .await
            .map_err(|e| {
                EmailError::Delivery(format!(
                    "AWS SES health check failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "aws-ses"
    }
}
