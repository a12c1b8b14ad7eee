//! Backend status code translation
//!
//! The backend reports failures as raw OpenCL status codes. This module maps
//! that numeric domain to human-readable diagnostics and converts non-success
//! codes into [`ForgeError`] values carrying caller context.

use crate::backend::BackendStatus;
use crate::error::{ForgeError, Result};

pub const CL_SUCCESS: i32 = 0;
pub const CL_DEVICE_NOT_FOUND: i32 = -1;
pub const CL_BUILD_PROGRAM_FAILURE: i32 = -11;
pub const CL_INVALID_BUILD_OPTIONS: i32 = -43;
pub const CL_INVALID_KERNEL_NAME: i32 = -46;

/// Returns the symbolic name of a backend status code, if it is a defined one.
pub fn status_name(code: i32) -> Option<&'static str> {
    let name = match code {
        0 => "CL_SUCCESS",
        -1 => "CL_DEVICE_NOT_FOUND",
        -2 => "CL_DEVICE_NOT_AVAILABLE",
        -3 => "CL_COMPILER_NOT_AVAILABLE",
        -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
        -5 => "CL_OUT_OF_RESOURCES",
        -6 => "CL_OUT_OF_HOST_MEMORY",
        -7 => "CL_PROFILING_INFO_NOT_AVAILABLE",
        -8 => "CL_MEM_COPY_OVERLAP",
        -9 => "CL_IMAGE_FORMAT_MISMATCH",
        -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
        -11 => "CL_BUILD_PROGRAM_FAILURE",
        -12 => "CL_MAP_FAILURE",
        -13 => "CL_MISALIGNED_SUB_BUFFER_OFFSET",
        -14 => "CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST",
        -15 => "CL_COMPILE_PROGRAM_FAILURE",
        -16 => "CL_LINKER_NOT_AVAILABLE",
        -17 => "CL_LINK_PROGRAM_FAILURE",
        -18 => "CL_DEVICE_PARTITION_FAILED",
        -19 => "CL_KERNEL_ARG_INFO_NOT_AVAILABLE",
        -30 => "CL_INVALID_VALUE",
        -31 => "CL_INVALID_DEVICE_TYPE",
        -32 => "CL_INVALID_PLATFORM",
        -33 => "CL_INVALID_DEVICE",
        -34 => "CL_INVALID_CONTEXT",
        -35 => "CL_INVALID_QUEUE_PROPERTIES",
        -36 => "CL_INVALID_COMMAND_QUEUE",
        -37 => "CL_INVALID_HOST_PTR",
        -38 => "CL_INVALID_MEM_OBJECT",
        -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
        -40 => "CL_INVALID_IMAGE_SIZE",
        -41 => "CL_INVALID_SAMPLER",
        -42 => "CL_INVALID_BINARY",
        -43 => "CL_INVALID_BUILD_OPTIONS",
        -44 => "CL_INVALID_PROGRAM",
        -45 => "CL_INVALID_PROGRAM_EXECUTABLE",
        -46 => "CL_INVALID_KERNEL_NAME",
        -47 => "CL_INVALID_KERNEL_DEFINITION",
        -48 => "CL_INVALID_KERNEL",
        -49 => "CL_INVALID_ARG_INDEX",
        -50 => "CL_INVALID_ARG_VALUE",
        -51 => "CL_INVALID_ARG_SIZE",
        -52 => "CL_INVALID_KERNEL_ARGS",
        -53 => "CL_INVALID_WORK_DIMENSION",
        -54 => "CL_INVALID_WORK_GROUP_SIZE",
        -55 => "CL_INVALID_WORK_ITEM_SIZE",
        -56 => "CL_INVALID_GLOBAL_OFFSET",
        -57 => "CL_INVALID_EVENT_WAIT_LIST",
        -58 => "CL_INVALID_EVENT",
        -59 => "CL_INVALID_OPERATION",
        -60 => "CL_INVALID_GL_OBJECT",
        -61 => "CL_INVALID_BUFFER_SIZE",
        -62 => "CL_INVALID_MIP_LEVEL",
        -63 => "CL_INVALID_GLOBAL_WORK_SIZE",
        -64 => "CL_INVALID_PROPERTY",
        -65 => "CL_INVALID_IMAGE_DESCRIPTOR",
        -66 => "CL_INVALID_COMPILER_OPTIONS",
        -67 => "CL_INVALID_LINKER_OPTIONS",
        -68 => "CL_INVALID_DEVICE_PARTITION_COUNT",
        -69 => "CL_INVALID_PIPE_SIZE",
        -70 => "CL_INVALID_DEVICE_QUEUE",
        -71 => "CL_INVALID_SPEC_ID",
        -72 => "CL_MAX_SIZE_RESTRICTION_EXCEEDED",
        _ => return None,
    };
    Some(name)
}

/// Translates a backend status code to a diagnostic string.
///
/// Defined codes map to their symbolic names; undefined codes map to a
/// generic fallback rather than failing.
pub fn translate_status(code: i32) -> String {
    match status_name(code) {
        Some(name) => name.to_string(),
        None => format!("unknown backend error {}", code),
    }
}

/// Checks a backend status code, returning it unchanged on success.
///
/// On a non-success code this fails with [`ForgeError::BackendCompile`]
/// carrying the translated diagnostic and the caller-supplied context.
pub fn check_status(code: i32, context: &str) -> Result<i32> {
    if code == CL_SUCCESS {
        Ok(code)
    } else {
        Err(backend_error(BackendStatus::new(code), context))
    }
}

/// Converts a raw backend failure into a [`ForgeError::BackendCompile`],
/// folding the build log into the diagnostic when one was captured.
pub fn backend_error(status: BackendStatus, context: &str) -> ForgeError {
    let mut message = format!("{}: {}", translate_status(status.code), context);
    if let Some(log) = &status.build_log {
        message.push_str("\nbuild log:\n");
        message.push_str(log);
    }
    ForgeError::BackendCompile {
        status: status.code,
        message,
    }
}

/// Converts a kernel-extraction failure into the matching error kind.
///
/// `CL_INVALID_KERNEL_NAME` means the requested name is absent from the
/// compiled program; everything else is an ordinary backend failure.
pub fn kernel_error(name: &str, status: BackendStatus) -> ForgeError {
    if status.code == CL_INVALID_KERNEL_NAME {
        ForgeError::KernelNotFound {
            name: name.to_string(),
        }
    } else {
        backend_error(status, &format!("creating kernel `{}`", name))
    }
}
