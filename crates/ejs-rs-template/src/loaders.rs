//! Template loaders.
//!
//! Template loaders find and read template source text. Layout parents and
//! included files are requested by their resolved path; the [`TemplateLoader`]
//! trait defines the interface, with built-in implementations for the
//! filesystem and for in-memory templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use ejs_rs_core::error::EjsError;

/// Loads template source text by name.
pub trait TemplateLoader: Send + Sync {
    /// Loads the template source with the given name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the template cannot be found.
    fn load(&self, name: &str) -> Result<String, EjsError>;
}

/// Loads templates from the filesystem.
///
/// Absolute names are read directly. Relative names are searched for in each
/// configured directory in order; with no directories they are read relative
/// to the working directory.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    /// Directories to search for templates.
    dirs: Vec<PathBuf>,
}

impl FileSystemLoader {
    /// Creates a new `FileSystemLoader` with the given search directories.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn read(path: &Path) -> Result<String, EjsError> {
        std::fs::read_to_string(path).map_err(|e| {
            EjsError::TemplateDoesNotExist(format!(
                "Error reading template '{}': {e}",
                path.display()
            ))
        })
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<String, EjsError> {
        let path = Path::new(name);
        if path.is_absolute() || self.dirs.is_empty() {
            return Self::read(path);
        }
        for dir in &self.dirs {
            let candidate = dir.join(path);
            if candidate.exists() {
                return Self::read(&candidate);
            }
        }

        Err(EjsError::TemplateDoesNotExist(format!(
            "Template '{name}' not found in directories: {:?}",
            self.dirs
        )))
    }
}

/// Loads templates from an in-memory map of name to source strings.
///
/// This is useful for testing and for applications that embed their
/// templates in the binary.
#[derive(Debug, Default)]
pub struct StringLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl StringLoader {
    /// Creates a new empty `StringLoader`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `StringLoader` from a map of template names to source strings.
    pub fn from_map(templates: HashMap<String, String>) -> Self {
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Adds or replaces a template.
    pub fn add(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }
}

impl TemplateLoader for StringLoader {
    fn load(&self, name: &str) -> Result<String, EjsError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                EjsError::TemplateDoesNotExist(format!("Template '{name}' not found in StringLoader"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_loader_basic() {
        let loader = StringLoader::new();
        loader.add("views/hello.ejs", "Hello <%= name %>!");

        let source = loader.load("views/hello.ejs").unwrap();
        assert_eq!(source, "Hello <%= name %>!");
    }

    #[test]
    fn test_string_loader_not_found() {
        let loader = StringLoader::new();
        let err = loader.load("missing.ejs").unwrap_err();
        assert!(matches!(err, EjsError::TemplateDoesNotExist(_)));
    }

    #[test]
    fn test_string_loader_from_map_and_overwrite() {
        let mut map = HashMap::new();
        map.insert("a.ejs".to_string(), "content A".to_string());
        let loader = StringLoader::from_map(map);
        assert_eq!(loader.load("a.ejs").unwrap(), "content A");

        loader.add("a.ejs", "content B");
        assert_eq!(loader.load("a.ejs").unwrap(), "content B");
    }

    #[test]
    fn test_filesystem_loader_not_found() {
        let loader = FileSystemLoader::new(vec![PathBuf::from("/nonexistent/path")]);
        assert!(loader.load("missing.ejs").is_err());
    }

    #[test]
    fn test_filesystem_loader_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("views")).unwrap();
        std::fs::write(dir.path().join("views/test.ejs"), "Hello from file!").unwrap();

        let loader = FileSystemLoader::new(vec![PathBuf::from("/nonexistent"), dir.path().to_path_buf()]);
        assert_eq!(loader.load("views/test.ejs").unwrap(), "Hello from file!");
    }

    #[test]
    fn test_filesystem_loader_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abs.ejs");
        std::fs::write(&path, "absolute").unwrap();

        let loader = FileSystemLoader::default();
        assert_eq!(loader.load(path.to_str().unwrap()).unwrap(), "absolute");
    }
}
