//! Backend trait definitions
//!
//! These traits define the seam between the kernel compilation core and a
//! concrete compute backend. Raw numeric status codes cross this seam;
//! translation into [`crate::ForgeError`] happens on the core side.

/// Raw failure value returned by a backend operation.
///
/// Carries the numeric status code and, for program builds, the backend's
/// build log when one could be captured.
#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub code: i32,
    pub build_log: Option<String>,
}

impl BackendStatus {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            build_log: None,
        }
    }

    pub fn with_log(code: i32, log: impl Into<String>) -> Self {
        Self {
            code,
            build_log: Some(log.into()),
        }
    }
}

/// Per-call configuration bundle supplied by the caller.
///
/// The core borrows the control context for the duration of a compile or
/// lookup call and never mutates it. Concrete implementations additionally
/// carry whatever device/queue handles their backend needs.
pub trait Control {
    /// Compile options passed to the backend compiler.
    fn compile_options(&self) -> &str;

    /// Stable identity of the target device.
    ///
    /// Two control contexts addressing the same device must return equal
    /// fingerprints; the value is one axis of the compilation cache key.
    fn device_fingerprint(&self) -> &str;

    /// Bypass the compilation cache and replace the stored entry.
    fn force_recompile(&self) -> bool {
        false
    }
}

/// Backend kernel compiler.
///
/// Builds device programs from final source text and extracts named kernel
/// handles from built programs.
pub trait Compiler: Send + Sync {
    type Ctl: Control;
    type Program: Clone + Send + Sync + 'static;
    type Kernel: Clone + Send + Sync + 'static;

    /// Build a program from device source with the given compile options.
    fn build_program(
        &self,
        ctl: &Self::Ctl,
        source: &str,
        options: &str,
    ) -> Result<Self::Program, BackendStatus>;

    /// Extract a named kernel from a built program.
    ///
    /// A name absent from the program is reported as
    /// `CL_INVALID_KERNEL_NAME`.
    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, BackendStatus>;
}
