//! Forge core: runtime kernel construction, compilation and caching
//!
//! This crate sits between a host-side parallel-algorithms library and a
//! compute backend. Given an algorithm name, a user functor source and the
//! resolved device type names, it assembles compilable device source from a
//! kernel template, invokes the backend compiler and caches the result so
//! that each distinct (template, instantiation, types, options, device)
//! combination is compiled exactly once.
//!
//! Backend implementations are provided by separate crates (e.g.
//! `forge-backend-opencl`) through the [`backend::Compiler`] and
//! [`backend::Control`] traits.
//!
//! # Example
//!
//! ```ignore
//! use forge_core::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! register_builtin_types(&registry)?;
//!
//! let forge = KernelForge::new(compiler, templates);
//! let kernel = forge.construct_and_compile(
//!     "transform",
//!     "// <float, scale>",
//!     "inline float scale(float x) { return x * 2.0f; }",
//!     &registry.lookup::<f32>()?,
//!     "scale",
//!     &ctl,
//! )?;
//! ```

pub mod backend;
pub mod cache;
pub mod construct;
pub mod engine;
pub mod error;
pub mod registry;
pub mod status;
pub mod template;

pub use backend::{BackendStatus, Compiler, Control};
pub use cache::{CacheKey, CompiledEntry, ProgramCache};
pub use construct::construct_source;
pub use engine::{KernelForge, version};
pub use error::{ForgeError, Result};
pub use registry::{TypeRegistry, register_builtin_types};
pub use status::{check_status, translate_status};
pub use template::{DirTemplateSource, StaticTemplateSource, TemplateSource, TemplateStore};

/// Prelude module with commonly used types and traits
pub mod prelude {
    pub use crate::backend::{BackendStatus, Compiler, Control};
    pub use crate::cache::{CacheKey, ProgramCache};
    pub use crate::engine::{KernelForge, version};
    pub use crate::error::{ForgeError, Result};
    pub use crate::registry::{TypeRegistry, register_builtin_types};
    pub use crate::status::{check_status, translate_status};
    pub use crate::template::{DirTemplateSource, StaticTemplateSource, TemplateStore};
}
