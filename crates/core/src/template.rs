//! Kernel template loading and caching
//!
//! Templates are the unfilled, generic device-source texts for the host
//! algorithms. They are read from a backing store (file system or embedded
//! resource) on first access and cached for the process lifetime; templates
//! do not change at run time.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::{ForgeError, Result};

/// A backing store of kernel template text, addressed by algorithm name.
pub trait TemplateSource: Send + Sync {
    /// Reads the template text for a name, or `None` if this source does
    /// not carry it.
    fn read(&self, name: &str) -> io::Result<Option<String>>;
}

/// Template source reading `<dir>/<name>.cl` files from the file system.
pub struct DirTemplateSource {
    dir: PathBuf,
    extension: String,
}

impl DirTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "cl".to_string(),
        }
    }

    /// Overrides the file extension appended to template names.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl TemplateSource for DirTemplateSource {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        let path = self.dir.join(format!("{}.{}", name, self.extension));
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(path).map(Some)
    }
}

/// Template source over a static table of embedded template texts.
#[derive(Default)]
pub struct StaticTemplateSource {
    entries: HashMap<&'static str, &'static str>,
}

impl StaticTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, name: &'static str, text: &'static str) {
        self.entries.insert(name, text);
    }
}

impl TemplateSource for StaticTemplateSource {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(name).map(|text| text.to_string()))
    }
}

/// Caching front of the template sources.
///
/// The first load for a name queries the sources in registration order and
/// caches the text; later loads return the cached text without touching the
/// backing store. A name absent from every source is a packaging defect and
/// fails with [`ForgeError::TemplateNotFound`].
pub struct TemplateStore {
    sources: Vec<Box<dyn TemplateSource>>,
    cache: RwLock<HashMap<String, Arc<str>>>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Creates a store with no backing sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a backing source, queried after the already-registered ones.
    pub fn with_source(mut self, source: impl TemplateSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Appends a backing source in place.
    pub fn add_source(&mut self, source: impl TemplateSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Loads the template text for an algorithm name.
    pub fn load(&self, name: &str) -> Result<Arc<str>> {
        if let Some(text) = self.cache.read().unwrap().get(name) {
            return Ok(text.clone());
        }

        // Population holds the write lock so no reader observes a partial
        // entry and the backing store is read at most once per name.
        let mut cache = self.cache.write().unwrap();
        if let Some(text) = cache.get(name) {
            return Ok(text.clone());
        }

        for source in &self.sources {
            let read = source.read(name).map_err(|err| ForgeError::TemplateIo {
                name: name.to_string(),
                source: err,
            })?;
            if let Some(text) = read {
                log::debug!("loaded kernel template `{}` ({} bytes)", name, text.len());
                let text: Arc<str> = text.into();
                cache.insert(name.to_string(), text.clone());
                return Ok(text);
            }
        }
        Err(ForgeError::TemplateNotFound(name.to_string()))
    }

    /// Returns the number of cached templates.
    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}
