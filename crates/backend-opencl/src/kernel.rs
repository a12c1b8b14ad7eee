//! OpenCL program and kernel handles
//!
//! Thin shared wrappers around the `opencl3` program and kernel objects.
//! Both are immutable after construction and shared by reference, so all
//! callers resolved to the same cache entry see the same handles.

use std::sync::Arc;

use opencl3::kernel::Kernel;
use opencl3::program::Program;

/// A built OpenCL program.
#[derive(Clone)]
pub struct OpenCLProgram {
    inner: Arc<Program>,
}

impl OpenCLProgram {
    pub(crate) fn new(program: Program) -> Self {
        Self {
            inner: Arc::new(program),
        }
    }

    /// Returns the underlying `opencl3` program.
    pub fn raw(&self) -> &Program {
        &self.inner
    }
}

// OpenCL handles thread safety internally
unsafe impl Send for OpenCLProgram {}
unsafe impl Sync for OpenCLProgram {}

/// A kernel handle extracted from a built program.
#[derive(Clone, Debug)]
pub struct OpenCLKernel {
    inner: Arc<Kernel>,
    name: Arc<str>,
}

impl OpenCLKernel {
    pub(crate) fn new(kernel: Kernel, name: &str) -> Self {
        Self {
            inner: Arc::new(kernel),
            name: name.into(),
        }
    }

    /// Returns the underlying `opencl3` kernel.
    pub fn raw(&self) -> &Kernel {
        &self.inner
    }

    /// Returns the kernel entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// OpenCL handles thread safety internally
unsafe impl Send for OpenCLKernel {}
unsafe impl Sync for OpenCLKernel {}
