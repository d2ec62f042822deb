//! Financial report template definitions and loading.
//!
//! This module provides the template data model (an ordered list of report
//! rows), hard validation, row dependency resolution, and a loader for
//! template files. Template files are YAML documents; JSON files parse as
//! well since YAML is a superset.
//!
//! # Example
//!
//! ```ignore
//! use finreport::template::TemplateLoader;
//!
//! let mut loader = TemplateLoader::new();
//! loader.load_directory("templates/")?;
//!
//! let template = loader.get("Quarterly P&L")?;
//! println!("{} rows", template.rows.len());
//! ```

pub mod resolver;
pub mod schema;

pub use resolver::DependencyResolver;
pub use schema::{DataSource, ReportRow, ReportTemplate, ReportType, RowType};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TemplateError;

/// Loader for report template files, cached by template name.
#[derive(Debug, Default)]
pub struct TemplateLoader {
    /// Cache of loaded templates, keyed by template name.
    templates: HashMap<String, ReportTemplate>,
    /// Paths of loaded template files, keyed by template name.
    loaded_paths: HashMap<String, PathBuf>,
}

impl TemplateLoader {
    /// Creates a new empty template loader.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            loaded_paths: HashMap::new(),
        }
    }

    /// Loads a single template from a YAML file.
    ///
    /// The template is validated after parsing. If validation fails, an
    /// error is returned and the template is not added to the cache.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&ReportTemplate, TemplateError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path)?;

        let template: ReportTemplate =
            serde_yaml::from_str(&content).map_err(|e| TemplateError::ParseError {
                path: path_str.clone(),
                message: e.to_string(),
            })?;

        template.validate()?;

        let name = template.template_name.clone();
        if let Some(previous) = self.loaded_paths.get(&name) {
            warn!(
                template = %name,
                previous = %previous.display(),
                replacement = %path_str,
                "template name already loaded, replacing"
            );
        }
        debug!(template = %name, path = %path_str, "loaded template");

        self.loaded_paths.insert(name.clone(), path.to_path_buf());
        self.templates.insert(name.clone(), template);
        Ok(&self.templates[&name])
    }

    /// Loads every `.yaml`/`.yml`/`.json` file in a directory.
    ///
    /// Returns the number of templates loaded. Subdirectories are not
    /// descended into.
    pub fn load_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, TemplateError> {
        let mut count = 0;
        for entry in fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "yaml" | "yml" | "json"));
            if matches {
                self.load_file(&path)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns a loaded template by name.
    pub fn get(&self, name: &str) -> Result<&ReportTemplate, TemplateError> {
        self.templates
            .get(name)
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))
    }

    /// Returns the names of all loaded templates, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of loaded templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no templates are loaded.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
