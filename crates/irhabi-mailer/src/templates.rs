use std::path::Path;

use irhabi_core::AppError;
use serde::Serialize;
use tera::{Context, Tera};

/// HTML email templates loaded from a directory.
#[derive(Clone)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load every `*.html` file under `dir`, recursively. Templates are
    /// named by their path relative to `dir`, e.g. `welcome.html`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let pattern = dir.as_ref().join("**").join("*.html");
        let tera = Tera::new(&pattern.to_string_lossy())
            .map_err(|e| AppError::Template(format!("Failed to load templates: {e}")))?;

        tracing::debug!(
            dir = %dir.as_ref().display(),
            count = tera.get_template_names().count(),
            "Loaded email templates"
        );
        Ok(Self { tera })
    }

    /// Templates registered from in-memory sources.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .map_err(|e| AppError::Template(e.to_string()))?;
        Ok(Self { tera })
    }

    /// Render `name` with `data`, which must serialize to a map.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, AppError> {
        let context = Context::from_serialize(data)
            .map_err(|e| AppError::Template(format!("Invalid template data: {e}")))?;
        self.tera
            .render(name, &context)
            .map_err(|e| AppError::Template(format!("Failed to render '{name}': {e:?}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}
