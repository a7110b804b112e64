//! Mailer
//!
//! Bootstraps an `EmailService` from the environment and sends one email
//! described on the command line. This is the only place the process
//! environment is read; the `email` library takes explicit configuration.
//!
//! ```text
//! mailer send --to bob@example.com --name bob \
//!     --subject 'Welcome {{email.name}}' --template welcome \
//!     --context '{"authority": {"level": 2}}'
//! mailer check
//! ```

use clap::{Parser, Subcommand};
use core_config::email::EmailConfig;
use core_config::{Environment, FromEnv};
use email::{BodyPolicy, EmailInstance, EmailService, ProviderConfig, ServiceConfig, SesOptions};
use eyre::{eyre, Result, WrapErr};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mailer")]
#[command(about = "Send templated transactional emails")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render and send one email
    Send {
        /// Recipient address (repeat for several)
        #[arg(long, required = true)]
        to: Vec<String>,

        /// CC address (repeatable)
        #[arg(long)]
        cc: Vec<String>,

        /// BCC address (repeatable)
        #[arg(long)]
        bcc: Vec<String>,

        /// Subject line; rendered as a template
        #[arg(short, long)]
        subject: String,

        /// Free-text name available to templates as `email.name`
        #[arg(short, long, default_value = "")]
        name: String,

        /// Template name; resolves `<name>.html` and `<name>.txt`
        #[arg(short, long)]
        template: Option<String>,

        /// Inline HTML template content
        #[arg(long)]
        html: Option<String>,

        /// Inline plain-text template content
        #[arg(long)]
        text: Option<String>,

        /// Extra render context as a JSON object
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Check that the delivery provider is reachable
    Check,
}

/// Translate the environment-derived configuration into service configuration.
pub fn service_config(config: &EmailConfig) -> Result<ServiceConfig> {
    let provider = ProviderConfig::from_tag(
        &config.provider,
        SesOptions {
            region: Some(config.region.clone()),
            profile: config.profile.clone(),
        },
    )?;

    let body_policy = if config.require_text_body {
        BodyPolicy::BothRequired
    } else {
        BodyPolicy::HtmlRequired
    };

    Ok(ServiceConfig::new(config.sender_address.clone())
        .with_reply_to(config.reply_to_address.clone())
        .with_provider(provider)
        .with_template_directory(&config.template_directory)
        .with_body_policy(body_policy))
}

/// Parse `--context` into a JSON object.
pub fn parse_context(raw: Option<&str>) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match serde_json::from_str(raw).wrap_err("Failed to parse --context as JSON")? {
        Value::Object(map) => Ok(Some(map)),
        other => Err(eyre!("--context must be a JSON object, got {}", other)),
    }
}

/// Build the email instance from `send` arguments
fn email_instance(
    name: String,
    subject: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
) -> EmailInstance {
    let mut email = if to.len() == 1 {
        EmailInstance::new(name, subject, to[0].clone())
    } else {
        EmailInstance::new(name, subject, to)
    };

    if !cc.is_empty() {
        email = email.with_cc(cc);
    }
    if !bcc.is_empty() {
        email = email.with_bcc(bcc);
    }
    email
}

/// Run the mailer
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads email configuration from the environment
/// 3. Builds the configured provider and template cache
/// 4. Executes the requested command
pub async fn run(cli: Cli) -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = EmailConfig::from_env().wrap_err("Failed to load email configuration")?;
    let service = EmailService::from_config(service_config(&config)?)
        .await
        .wrap_err("Failed to initialize email service")?;

    info!(
        provider = service.provider_name(),
        templates = service.pipeline().cache().manifest().len(),
        template_directory = %config.template_directory,
        "Email service ready"
    );

    match cli.command {
        Commands::Send {
            to,
            cc,
            bcc,
            subject,
            name,
            template,
            html,
            text,
            context,
        } => {
            let extra = parse_context(context.as_deref())?;
            let email = email_instance(name, subject, to, cc, bcc);

            service
                .send_email(
                    &email,
                    template.as_deref(),
                    extra,
                    html.as_deref(),
                    text.as_deref(),
                )
                .await
                .wrap_err("Failed to send email")?;

            info!(to = ?email.to_addresses, "Email sent");
        }
        Commands::Check => {
            service
                .health_check()
                .await
                .wrap_err("Provider health check failed")?;
            info!(provider = service.provider_name(), "Provider healthy");
        }
    }

    Ok(())
}
