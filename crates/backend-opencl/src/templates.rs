//! Embedded kernel templates
//!
//! The `.cl` template files are compiled into the library so callers need no
//! file-system layout at run time. A file-system source can still be layered
//! on top for out-of-tree templates.

use forge_core::{StaticTemplateSource, TemplateStore};

/// Names of the templates shipped with this backend.
pub const EMBEDDED_TEMPLATE_NAMES: &[&str] = &["transform", "reduce"];

/// Returns a template source over the embedded `.cl` templates.
pub fn embedded_templates() -> StaticTemplateSource {
    StaticTemplateSource::from_entries([
        ("transform", include_str!("../templates/transform.cl")),
        ("reduce", include_str!("../templates/reduce.cl")),
    ])
}

/// Returns a template store preloaded with the embedded templates.
pub fn template_store() -> TemplateStore {
    TemplateStore::new().with_source(embedded_templates())
}
