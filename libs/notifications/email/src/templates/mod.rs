//! Template resolution and compiled-template cache.
//!
//! Templates are compiled with Handlebars and kept for the lifetime of the
//! cache. HTML templates escape substituted values; text templates and
//! subjects do not.

mod manifest;

pub use manifest::TemplateManifest;

use crate::error::EmailResult;
use crate::models::TemplateType;
use handlebars::Handlebars;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key for a template: `name.type`.
pub fn cache_key(name: &str, kind: TemplateType) -> String {
    format!("{}.{}", name, kind)
}

fn registry(escape_html: bool) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    if !escape_html {
        handlebars.register_escape_fn(handlebars::no_escape);
    }
    handlebars
}

/// Compiled templates keyed by `name.type`, populated lazily.
///
/// Once a key is compiled it is never re-read or invalidated.
pub struct TemplateCache {
    manifest: TemplateManifest,
    html: RwLock<Handlebars<'static>>,
    text: RwLock<Handlebars<'static>>,
}

impl TemplateCache {
    pub fn new(manifest: TemplateManifest) -> Self {
        Self {
            manifest,
            html: RwLock::new(registry(true)),
            text: RwLock::new(registry(false)),
        }
    }

    fn registry_for(&self, kind: TemplateType) -> &RwLock<Handlebars<'static>> {
        match kind {
            TemplateType::Html => &self.html,
            TemplateType::Txt => &self.text,
        }
    }

    pub fn manifest(&self) -> &TemplateManifest {
        &self.manifest
    }

    /// Check whether `key` has already been compiled
    pub async fn is_cached(&self, key: &str, kind: TemplateType) -> bool {
        self.registry_for(kind).read().await.has_template(key)
    }

    /// Resolve the compiled template for `name.type`.
    ///
    /// Returns the cache key, or `None` when neither inline content nor a
    /// template file is available.
    pub async fn resolve(
        &self,
        name: &str,
        kind: TemplateType,
        inline_content: Option<&str>,
    ) -> EmailResult<Option<String>> {
        let key = cache_key(name, kind);
        let registry = self.registry_for(kind);

        if registry.read().await.has_template(&key) {
            return Ok(Some(key));
        }

        let source = match inline_content.filter(|c| !c.is_empty()) {
            Some(content) => {
                debug!(template = %key, "Compiling inline template");
                content.to_string()
            }
            None => {
                let Some(path) = self.manifest.get(&key) else {
                    debug!(template = %key, "No template found");
                    return Ok(None);
                };
                debug!(template = %key, path = %path.display(), "Loading template file");
                tokio::fs::read_to_string(path).await?
            }
        };

        registry.write().await.register_template_string(&key, source)?;

        Ok(Some(key))
    }

    /// Resolve and render `name.type`; empty string when nothing resolved.
    pub async fn render(
        &self,
        name: &str,
        kind: TemplateType,
        inline_content: Option<&str>,
        context: &Value,
    ) -> EmailResult<String> {
        let Some(key) = self.resolve(name, kind, inline_content).await? else {
            return Ok(String::new());
        };

        let rendered = self.registry_for(kind).read().await.render(&key, context)?;
        Ok(rendered)
    }

    /// Render a template string once without caching it.
    pub async fn render_once(
        &self,
        kind: TemplateType,
        template: &str,
        context: &Value,
    ) -> EmailResult<String> {
        let rendered = self
            .registry_for(kind)
            .read()
            .await
            .render_template(template, context)?;
        Ok(rendered)
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(TemplateManifest::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn test_file_template_renders_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("welcome.txt"), "Welcome {{email.name}}").unwrap();

        let cache = TemplateCache::new(TemplateManifest::scan(dir.path()));
        let context = json!({ "email": { "name": "bob" } });

        let text = cache
            .render("welcome", TemplateType::Txt, None, &context)
            .await
            .unwrap();
        assert_eq!(text, "Welcome bob");
    }

    #[tokio::test]
    async fn test_missing_template_renders_empty() {
        let cache = TemplateCache::default();
        let text = cache
            .render("welcome", TemplateType::Txt, None, &json!({}))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_unresolved_paths_render_empty() {
        let cache = TemplateCache::default();
        let text = cache
            .render(
                "inline",
                TemplateType::Txt,
                Some("before [{{missing.path}}] after"),
                &json!({ "email": { "name": "bob" } }),
            )
            .await
            .unwrap();
        assert_eq!(text, "before [] after");
    }

    #[tokio::test]
    async fn test_compiled_template_is_reused() {
        let cache = TemplateCache::default();
        let context = json!({ "name": "bob" });

        let first = cache
            .render("greeting", TemplateType::Txt, Some("Hi {{name}}"), &context)
            .await
            .unwrap();
        assert!(cache.is_cached("greeting.txt", TemplateType::Txt).await);

        // Different inline content under the same key is ignored once cached.
        let second = cache
            .render("greeting", TemplateType::Txt, Some("Bye {{name}}"), &context)
            .await
            .unwrap();

        assert_eq!(first, "Hi bob");
        assert_eq!(second, "Hi bob");
    }

    #[tokio::test]
    async fn test_file_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("welcome.txt");
        fs::write(&path, "Welcome {{email.name}}").unwrap();

        let cache = TemplateCache::new(TemplateManifest::scan(dir.path()));
        let context = json!({ "email": { "name": "bob" } });

        cache
            .render("welcome", TemplateType::Txt, None, &context)
            .await
            .unwrap();
        fs::remove_file(&path).unwrap();

        let again = cache
            .render("welcome", TemplateType::Txt, None, &context)
            .await
            .unwrap();
        assert_eq!(again, "Welcome bob");
    }

    #[tokio::test]
    async fn test_html_escapes_but_text_does_not() {
        let cache = TemplateCache::default();
        let context = json!({ "company": "Smith & Sons" });

        let html = cache
            .render("c", TemplateType::Html, Some("<p>{{company}}</p>"), &context)
            .await
            .unwrap();
        let text = cache
            .render("c", TemplateType::Txt, Some("{{company}}"), &context)
            .await
            .unwrap();

        assert_eq!(html, "<p>Smith &amp; Sons</p>");
        assert_eq!(text, "Smith & Sons");
    }

    #[tokio::test]
    async fn test_render_once_is_not_cached() {
        let cache = TemplateCache::default();
        let subject = cache
            .render_once(
                TemplateType::Txt,
                "Welcome to the party {{ email.name }}",
                &json!({ "email": { "name": "bob" } }),
            )
            .await
            .unwrap();

        assert_eq!(subject, "Welcome to the party bob");
        assert!(cache.text.read().await.get_templates().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_template_is_an_error() {
        let cache = TemplateCache::default();
        let result = cache
            .render("broken", TemplateType::Txt, Some("{{#if}}"), &json!({}))
            .await;
        assert!(result.is_err());
    }
}
