//! Templated transactional email library
//!
//! Renders Handlebars templates (from files or inline content) against a
//! merge context, inlines CSS into the HTML body and hands the result to a
//! delivery provider.
//!
//! ## Components
//!
//! - **Templates**: `TemplateManifest` (exact `name.type` -> file index) and
//!   `TemplateCache` (compiled templates, populated lazily)
//! - **Rendering**: `RenderPipeline` for HTML/text bodies and subjects
//! - **Providers**: AWS SES and a recording `MockProvider`
//! - **Service**: `EmailService::send_email`, the single entry point
//!
//! ## Usage
//!
//! ```ignore
//! use email::{EmailInstance, EmailService, ServiceConfig};
//!
//! let config = ServiceConfig::new("no-reply@example.com")
//!     .with_template_directory("templates");
//! let service = EmailService::from_config(config).await?;
//!
//! let email = EmailInstance::new("bob", "Welcome {{email.name}}", "bob@example.com");
//! service.send_email(&email, Some("welcome"), None, None, None).await?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod render;
pub mod service;
pub mod templates;

pub use config::{BodyPolicy, ProviderConfig, ServiceConfig, SesOptions};
pub use error::{EmailError, EmailResult};
pub use models::{
    Charsets, Destination, EmailInstance, ProviderMessage, Recipients, TemplateType,
    DEFAULT_CHARSET,
};
pub use provider::{EmailProvider, MockProvider, SesProvider};
pub use render::RenderPipeline;
pub use service::EmailService;
pub use templates::{TemplateCache, TemplateManifest};
