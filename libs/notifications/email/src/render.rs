//! Rendering pipeline: body resolution, CSS inlining and subject rendering.

use crate::error::{EmailError, EmailResult};
use crate::models::TemplateType;
use crate::templates::{cache_key, TemplateCache, TemplateManifest};
use css_inline::{
    CSSInliner, DefaultStylesheetResolver, InlineError, StylesheetResolver, Url,
};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Template name used when the caller supplies no name.
pub(crate) const UNNAMED_TEMPLATE: &str = "inline";

/// Convert a directory into the `file://` base URL used to resolve stylesheets.
fn directory_url(directory: &Path) -> EmailResult<Url> {
    let absolute = std::path::absolute(directory).map_err(|e| {
        EmailError::Config(format!(
            "Invalid template directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    Url::from_directory_path(&absolute).map_err(|_| {
        EmailError::Config(format!(
            "Template directory {} cannot be used as a base URL",
            absolute.display()
        ))
    })
}

/// Map a joined stylesheet location back to a filesystem path.
///
/// Base URLs are percent-encoded, so `file://` locations are decoded rather
/// than trimmed.
fn stylesheet_path(location: &str) -> PathBuf {
    Url::parse(location)
        .ok()
        .filter(|url| url.scheme() == "file")
        .and_then(|url| url.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(location))
}

/// Loads stylesheets linked from HTML templates.
///
/// Local stylesheets must exist. Remote ones are fetched best effort: a failed
/// fetch is logged and contributes no rules.
struct TemplateStylesheets;

impl StylesheetResolver for TemplateStylesheets {
    fn retrieve(&self, location: &str) -> css_inline::Result<String> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return match DefaultStylesheetResolver.retrieve_from_url(location) {
                Ok(css) => Ok(css),
                Err(err) => {
                    warn!(stylesheet = %location, error = %err, "Skipping unreachable remote stylesheet");
                    Ok(String::new())
                }
            };
        }

        let path = stylesheet_path(location);
        std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => InlineError::MissingStyleSheet {
                path: path.display().to_string(),
            },
            _ => InlineError::IO(err),
        })
    }
}

/// Renders HTML/text bodies and subjects for a single template directory.
pub struct RenderPipeline {
    cache: TemplateCache,
    base_url: Url,
}

impl RenderPipeline {
    /// Build a pipeline, indexing `template_directory` once.
    ///
    /// Stylesheets referenced from HTML templates are resolved relative to the
    /// template directory, or the working directory when none is configured.
    pub fn new(template_directory: Option<&Path>) -> EmailResult<Self> {
        let (manifest, base_dir) = match template_directory {
            Some(dir) => (TemplateManifest::scan(dir), dir.to_path_buf()),
            None => (TemplateManifest::empty(), std::env::current_dir()?),
        };

        Ok(Self {
            cache: TemplateCache::new(manifest),
            base_url: directory_url(&base_dir)?,
        })
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Resolve and render a body; empty string when nothing resolved.
    ///
    /// Without a template name, inline content is rendered once and not cached.
    pub async fn render_body(
        &self,
        name: Option<&str>,
        kind: TemplateType,
        inline_content: Option<&str>,
        context: &Value,
    ) -> EmailResult<String> {
        match name {
            Some(name) => self.cache.render(name, kind, inline_content, context).await,
            None => match inline_content.filter(|c| !c.is_empty()) {
                Some(content) => self.cache.render_once(kind, content, context).await,
                None => Ok(String::new()),
            },
        }
    }

    /// Render the plain-text body; an empty result is returned as-is.
    pub async fn render_text_body(
        &self,
        name: Option<&str>,
        inline_content: Option<&str>,
        context: &Value,
    ) -> EmailResult<String> {
        self.render_body(name, TemplateType::Txt, inline_content, context)
            .await
    }

    /// Render the HTML body and inline its CSS.
    ///
    /// An empty render is an error: a message is never sent without HTML.
    pub async fn render_html_body(
        &self,
        name: Option<&str>,
        inline_content: Option<&str>,
        context: &Value,
    ) -> EmailResult<String> {
        let html = self
            .render_body(name, TemplateType::Html, inline_content, context)
            .await?;

        if html.is_empty() {
            return Err(EmailError::TemplateNotFound(cache_key(
                name.unwrap_or(UNNAMED_TEMPLATE),
                TemplateType::Html,
            )));
        }

        self.inline_css(html).await
    }

    /// Render the subject line; subjects are never cached.
    pub async fn render_subject(&self, subject: &str, context: &Value) -> EmailResult<String> {
        self.cache
            .render_once(TemplateType::Txt, subject, context)
            .await
    }

    async fn inline_css(&self, html: String) -> EmailResult<String> {
        let base_url = self.base_url.clone();
        debug!(base_url = %base_url, "Inlining CSS");

        tokio::task::spawn_blocking(move || {
            CSSInliner::options()
                .base_url(Some(base_url))
                .resolver(Arc::new(TemplateStylesheets))
                .build()
                .inline(&html)
        })
        .await
        .map_err(|e| EmailError::Inlining(format!("Inliner task failed: {}", e)))?
        .map_err(EmailError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn test_html_without_template_is_not_found() {
        let pipeline = RenderPipeline::new(None).unwrap();
        let result = pipeline
            .render_html_body(Some("welcome"), None, &json!({}))
            .await;

        match result {
            Err(EmailError::TemplateNotFound(key)) => assert_eq!(key, "welcome.html"),
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_html_style_block_is_inlined() {
        let pipeline = RenderPipeline::new(None).unwrap();
        let html = pipeline
            .render_html_body(
                Some("styled"),
                Some("<html><head><style>p { color: red; }</style></head><body><p>Hi {{email.name}}</p></body></html>"),
                &json!({ "email": { "name": "bob" } }),
            )
            .await
            .unwrap();

        assert!(html.contains("<p style="));
        assert!(html.contains("red"));
        assert!(html.contains("Hi bob"));
    }

    #[tokio::test]
    async fn test_linked_stylesheet_resolves_against_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("email.css"), "h1 { color: blue; }").unwrap();
        fs::write(
            dir.path().join("welcome.html"),
            r#"<html><head><link rel="stylesheet" href="email.css"></head><body><h1>{{email.name}}</h1></body></html>"#,
        )
        .unwrap();

        let pipeline = RenderPipeline::new(Some(dir.path())).unwrap();
        let html = pipeline
            .render_html_body(Some("welcome"), None, &json!({ "email": { "name": "bob" } }))
            .await
            .unwrap();

        assert!(html.contains("<h1 style="));
        assert!(html.contains("blue"));
    }

    #[tokio::test]
    async fn test_unnamed_inline_body_is_not_cached() {
        let pipeline = RenderPipeline::new(None).unwrap();
        let context = json!({ "email": { "name": "bob" } });

        let first = pipeline
            .render_text_body(None, Some("one {{email.name}}"), &context)
            .await
            .unwrap();
        let second = pipeline
            .render_text_body(None, Some("two {{email.name}}"), &context)
            .await
            .unwrap();

        assert_eq!(first, "one bob");
        assert_eq!(second, "two bob");
    }

    #[tokio::test]
    async fn test_subject_renders_with_spaces_in_expression() {
        let pipeline = RenderPipeline::new(None).unwrap();
        let subject = pipeline
            .render_subject(
                "Welcome to the party {{ email.name }}",
                &json!({ "email": { "name": "bob" } }),
            )
            .await
            .unwrap();
        assert_eq!(subject, "Welcome to the party bob");
    }

    #[tokio::test]
    async fn test_linked_stylesheet_in_directory_with_space() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("my templates");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("email.css"), "h1 { color: blue; }").unwrap();
        fs::write(
            dir.join("welcome.html"),
            r#"<html><head><link rel="stylesheet" href="email.css"></head><body><h1>{{email.name}}</h1></body></html>"#,
        )
        .unwrap();

        let pipeline = RenderPipeline::new(Some(dir.as_path())).unwrap();
        let html = pipeline
            .render_html_body(Some("welcome"), None, &json!({ "email": { "name": "bob" } }))
            .await
            .unwrap();

        assert!(html.contains("<h1 style="));
        assert!(html.contains("blue"));
    }

    #[tokio::test]
    async fn test_missing_local_stylesheet_is_an_inlining_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = RenderPipeline::new(Some(dir.path())).unwrap();
        let result = pipeline
            .render_html_body(
                Some("broken"),
                Some(r#"<html><head><link rel="stylesheet" href="missing.css"></head><body><p>hi</p></body></html>"#),
                &json!({}),
            )
            .await;

        match result {
            Err(EmailError::Inlining(msg)) => assert!(msg.contains("missing.css")),
            other => panic!("expected Inlining error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_remote_stylesheet_is_skipped() {
        let pipeline = RenderPipeline::new(None).unwrap();
        let html = pipeline
            .render_html_body(
                Some("fonts"),
                Some(r#"<html><head><link rel="stylesheet" href="http://127.0.0.1:9/fonts.css"><style>p { color: red; }</style></head><body><p>Hi {{email.name}}</p></body></html>"#),
                &json!({ "email": { "name": "bob" } }),
            )
            .await
            .unwrap();

        assert!(html.contains("<p style="));
        assert!(html.contains("Hi bob"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stylesheet_path_decodes_file_urls() {
        let path = stylesheet_path("file:///srv/my%20templates/email.css");
        assert_eq!(path, PathBuf::from("/srv/my templates/email.css"));
    }

    #[test]
    fn test_base_url_is_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = RenderPipeline::new(Some(dir.path())).unwrap();
        let base = pipeline.base_url.to_file_path().unwrap();
        assert_eq!(
            base.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
