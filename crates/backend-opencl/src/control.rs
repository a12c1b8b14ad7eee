//! OpenCL control context
//!
//! The per-call capability bundle consumed by the compilation core: device,
//! context and command queue handles plus the compile options and override
//! flags for one compile/lookup call.

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{CL_DEVICE_TYPE_GPU, Device as ClDevice, get_all_devices};
use opencl3::types::cl_device_id;

use forge_core::backend::{BackendStatus, Control};
use forge_core::status::{CL_DEVICE_NOT_FOUND, backend_error};
use forge_core::{ForgeError, Result};

fn cl_err(code: i32, context: &str) -> ForgeError {
    backend_error(BackendStatus::new(code), context)
}

/// OpenCL control context.
///
/// Holds the OpenCL device, context and command queue together with the
/// compile-option string and the force-recompile override. Owned by the
/// caller; the compilation core only borrows it.
pub struct OpenCLControl {
    device: ClDevice,
    context: Context,
    queue: CommandQueue,
    fingerprint: String,
    compile_options: String,
    force_recompile: bool,
}

impl OpenCLControl {
    /// Creates a control context on the default GPU device.
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    /// Creates a control context for a specific GPU device index.
    pub fn with_device_index(index: usize) -> Result<Self> {
        let device_ids = get_all_devices(CL_DEVICE_TYPE_GPU)
            .map_err(|e| cl_err(e.0, "enumerating GPU devices"))?;

        let id = device_ids.get(index).copied().ok_or_else(|| {
            cl_err(
                CL_DEVICE_NOT_FOUND,
                &format!(
                    "device index {} out of range ({} available)",
                    index,
                    device_ids.len()
                ),
            )
        })?;
        let device = ClDevice::new(id);

        let context = Context::from_device(&device)
            .map_err(|e| cl_err(e.0, "creating OpenCL context"))?;
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| cl_err(e.0, "creating command queue"))?;

        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let fingerprint = format!("{:#x}:{}", id as usize, name);
        log::debug!("opencl control context on device {}", fingerprint);

        Ok(Self {
            device,
            context,
            queue,
            fingerprint,
            compile_options: String::new(),
            force_recompile: false,
        })
    }

    /// Checks whether any OpenCL GPU device is available.
    pub fn is_available() -> bool {
        get_all_devices(CL_DEVICE_TYPE_GPU)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }

    /// Sets the compile options passed to the backend compiler.
    pub fn with_compile_options(mut self, options: impl Into<String>) -> Self {
        self.compile_options = options.into();
        self
    }

    /// Sets the force-recompile override for calls made with this context.
    pub fn with_force_recompile(mut self, force: bool) -> Self {
        self.force_recompile = force;
        self
    }

    /// Returns the OpenCL context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the command queue.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Returns the underlying OpenCL device.
    pub fn device(&self) -> &ClDevice {
        &self.device
    }

    pub(crate) fn device_id(&self) -> cl_device_id {
        self.device.id()
    }

    /// Returns the device name.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

impl Control for OpenCLControl {
    fn compile_options(&self) -> &str {
        &self.compile_options
    }

    fn device_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn force_recompile(&self) -> bool {
        self.force_recompile
    }
}

// OpenCL handles thread safety internally
unsafe impl Send for OpenCLControl {}
unsafe impl Sync for OpenCLControl {}
