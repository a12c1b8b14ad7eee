//! Host type to device type name registry
//!
//! Maps host value types to the literal type names used in device source.
//! The registry is populated during a deterministic startup phase and read
//! for the rest of the process lifetime.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ForgeError, Result};

struct Registration {
    literal: String,
    host_name: &'static str,
}

/// Registry of device type names, indexed by host type.
///
/// Registration is idempotent: registering the same type with the same
/// literal again is a no-op, while a different literal is a usage error.
pub struct TypeRegistry {
    entries: RwLock<HashMap<TypeId, Registration>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers the device type name for a host type.
    pub fn register<T: 'static>(&self, literal: &str) -> Result<()> {
        let host_name = std::any::type_name::<T>();
        let mut entries = self.entries.write().unwrap();
        if let Some(existing) = entries.get(&TypeId::of::<T>()) {
            if existing.literal == literal {
                return Ok(());
            }
            return Err(ForgeError::ConflictingRegistration {
                type_name: host_name,
                existing: existing.literal.clone(),
                attempted: literal.to_string(),
            });
        }
        log::debug!("registering device type name `{}` for {}", literal, host_name);
        entries.insert(
            TypeId::of::<T>(),
            Registration {
                literal: literal.to_string(),
                host_name,
            },
        );
        Ok(())
    }

    /// Looks up the device type name registered for a host type.
    pub fn lookup<T: 'static>(&self) -> Result<String> {
        let entries = self.entries.read().unwrap();
        entries
            .get(&TypeId::of::<T>())
            .map(|r| r.literal.clone())
            .ok_or(ForgeError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Returns whether a host type has a registration.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries
            .read()
            .unwrap()
            .contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists registrations as (host type name, device type name) pairs.
    pub fn registrations(&self) -> Vec<(&'static str, String)> {
        self.entries
            .read()
            .unwrap()
            .values()
            .map(|r| (r.host_name, r.literal.clone()))
            .collect()
    }
}

/// Registers the device type names for the built-in scalar types.
///
/// Intended to run once at process start, before any compilation request
/// referencing these types.
pub fn register_builtin_types(registry: &TypeRegistry) -> Result<()> {
    registry.register::<i8>("char")?;
    registry.register::<u8>("uchar")?;
    registry.register::<i16>("short")?;
    registry.register::<u16>("ushort")?;
    registry.register::<i32>("int")?;
    registry.register::<u32>("uint")?;
    registry.register::<i64>("long")?;
    registry.register::<u64>("ulong")?;
    registry.register::<f32>("float")?;
    registry.register::<f64>("double")?;
    Ok(())
}
