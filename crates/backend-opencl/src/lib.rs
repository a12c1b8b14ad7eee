//! OpenCL backend for the forge kernel compilation core
//!
//! This crate provides the [`forge_core::backend::Compiler`] and
//! [`forge_core::backend::Control`] implementations over the `opencl3`
//! crate, plus the embedded kernel templates the host algorithms compile
//! against.
//!
//! # Usage
//!
//! ```ignore
//! use forge_backend_opencl::{OpenCLCompiler, OpenCLControl, template_store};
//! use forge_core::KernelForge;
//!
//! let ctl = OpenCLControl::new()?;
//! let forge = KernelForge::new(OpenCLCompiler::new(), template_store());
//!
//! let kernel = forge.construct_and_compile(
//!     "transform",
//!     "// <float, scale>",
//!     "inline float scale(float x) { return x * 2.0f; }",
//!     "float",
//!     "scale",
//!     &ctl,
//! )?;
//! ```

mod compiler;
mod control;
mod kernel;
pub mod templates;

pub use compiler::OpenCLCompiler;
pub use control::OpenCLControl;
pub use kernel::{OpenCLKernel, OpenCLProgram};
pub use templates::{embedded_templates, template_store};

/// Checks whether any OpenCL GPU device is available on this system.
pub fn is_available() -> bool {
    OpenCLControl::is_available()
}
