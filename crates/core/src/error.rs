//! Error types for the kernel compilation core

use thiserror::Error;

/// Main error type for kernel construction and compilation
#[derive(Debug, Error)]
pub enum ForgeError {
    /// No device type name registered for a host type
    #[error("no device type name registered for host type `{type_name}`")]
    UnregisteredType { type_name: &'static str },

    /// A host type was registered twice with different device type names
    #[error(
        "host type `{type_name}` is already registered as `{existing}` (attempted `{attempted}`)"
    )]
    ConflictingRegistration {
        type_name: &'static str,
        existing: String,
        attempted: String,
    },

    /// No backing source has a template with the requested name
    #[error("kernel template not found: {0}")]
    TemplateNotFound(String),

    /// Reading a template from its backing store failed
    #[error("failed to read kernel template `{name}`: {source}")]
    TemplateIo {
        name: String,
        source: std::io::Error,
    },

    /// A requested kernel name is absent from the compiled program
    #[error("kernel `{name}` not found in compiled program")]
    KernelNotFound { name: String },

    /// The backend compiler reported a failure status
    #[error("backend compile error <{status}>: {message}")]
    BackendCompile { status: i32, message: String },
}

pub type Result<T> = std::result::Result<T, ForgeError>;
