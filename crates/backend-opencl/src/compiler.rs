//! OpenCL native compiler
//!
//! Compiles OpenCL C source code into programs and extracts kernel handles.
//! Failures are reported to the core as raw status codes, with the program
//! build log attached when one can be captured.

use opencl3::kernel::Kernel;
use opencl3::program::Program;

use forge_core::backend::{BackendStatus, Compiler};

use super::control::OpenCLControl;
use super::kernel::{OpenCLKernel, OpenCLProgram};

/// OpenCL native compiler
#[derive(Debug, Clone, Default)]
pub struct OpenCLCompiler;

impl OpenCLCompiler {
    /// OpenCL fast math compilation options
    pub const FAST_MATH_OPTIONS: &'static str =
        "-cl-fast-relaxed-math -cl-mad-enable -cl-unsafe-math-optimizations";

    pub fn new() -> Self {
        Self
    }
}

impl Compiler for OpenCLCompiler {
    type Ctl = OpenCLControl;
    type Program = OpenCLProgram;
    type Kernel = OpenCLKernel;

    fn build_program(
        &self,
        ctl: &OpenCLControl,
        source: &str,
        options: &str,
    ) -> Result<OpenCLProgram, BackendStatus> {
        log::debug!(
            "building OpenCL program ({} bytes, options `{}`)",
            source.len(),
            options
        );
        let mut program = Program::create_from_sources(ctl.context(), &[source])
            .map_err(|e| BackendStatus::new(e.0))?;

        if let Err(e) = program.build(&[ctl.device_id()], options) {
            let mut status = BackendStatus::new(e.0);
            status.build_log = program.get_build_log(ctl.device_id()).ok();
            return Err(status);
        }

        Ok(OpenCLProgram::new(program))
    }

    fn create_kernel(
        &self,
        program: &OpenCLProgram,
        name: &str,
    ) -> Result<OpenCLKernel, BackendStatus> {
        Kernel::create(program.raw(), name)
            .map(|kernel| OpenCLKernel::new(kernel, name))
            .map_err(|e| BackendStatus::new(e.0))
    }
}
