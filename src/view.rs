//! View rendering module
//!
//! Holds the data a handler hands to its template ([`ViewContext`]), the
//! on-disk template layout ([`ViewLayout`]) and the rendering service seam
//! ([`Renderer`]). The shipped renderer is backed by minijinja.

use crate::config::ViewsConfig;
use minijinja::Environment;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rendering failure, surfaced to the dispatcher as-is
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

/// Page head fields every view receives, empty unless a handler sets them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadMetadata {
    pub title: String,
    pub keywords: String,
    pub description: String,
}

/// Data collected by a handler for its view
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub head: HeadMetadata,
    pub body: Map<String, Value>,
}

impl ViewContext {
    /// Store a body value for the template
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.body.insert(key.into(), value.into());
    }

    /// Flatten head and body into the template context
    ///
    /// Body entries win over head entries with the same key.
    pub fn merged(&self) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("title".to_string(), Value::from(self.head.title.as_str()));
        context.insert("keywords".to_string(), Value::from(self.head.keywords.as_str()));
        context.insert(
            "description".to_string(),
            Value::from(self.head.description.as_str()),
        );
        for (key, value) in &self.body {
            context.insert(key.clone(), value.clone());
        }
        context
    }
}

/// Rendered response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Where view templates live: `<base_dir>/<HandlerName>/<view>.<extension>`
#[derive(Debug, Clone)]
pub struct ViewLayout {
    base_dir: PathBuf,
    extension: String,
}

impl ViewLayout {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &ViewsConfig) -> Self {
        Self::new(config.base_dir.clone(), config.extension.clone())
    }

    /// Template path for a view of the named handler
    pub fn path_for(&self, handler_name: &str, view: &str) -> PathBuf {
        self.base_dir
            .join(handler_name)
            .join(format!("{view}.{}", self.extension))
    }
}

/// Template rendering service
pub trait Renderer: Send + Sync {
    fn render(&self, view_path: &Path, context: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Renders template files with minijinja
///
/// Templates are read from disk on every call so edits show up without a
/// restart. Auto-escaping follows the file extension (`.html` escapes).
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateRenderer;

impl Renderer for TemplateRenderer {
    fn render(&self, view_path: &Path, context: &Map<String, Value>) -> Result<String, RenderError> {
        let source = fs::read_to_string(view_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RenderError::TemplateNotFound(view_path.to_path_buf())
            } else {
                RenderError::Io {
                    path: view_path.to_path_buf(),
                    source,
                }
            }
        })?;
        let name = view_path
            .file_name()
            .map_or_else(|| "view".to_string(), |n| n.to_string_lossy().into_owned());
        let template_error = |source| RenderError::Template {
            path: view_path.to_path_buf(),
            source,
        };

        let mut env = Environment::new();
        env.add_template(&name, &source).map_err(template_error)?;
        env.get_template(&name)
            .and_then(|template| template.render(context))
            .map_err(template_error)
    }
}
