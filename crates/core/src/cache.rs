//! Compilation cache and compiler invocation
//!
//! Compiling a program is orders of magnitude more expensive than a lookup,
//! and the host algorithms request the same instantiations repeatedly. The
//! cache guarantees that each distinct key is compiled at most once at a
//! time and, once built, never again: a second caller for a key whose
//! compile is in flight blocks until the first attempt settles, then shares
//! the entry or retries on its own. Failed attempts are not memoized.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use crate::backend::{Compiler, Control};
use crate::error::Result;
use crate::status;

/// Composite identity of one compiled-kernel variant.
///
/// Captures every axis of variation that changes the generated program, and
/// nothing more: an over-broad key recompiles needlessly, an under-broad key
/// silently reuses the wrong kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub template: String,
    pub instantiation: String,
    pub value_type: String,
    pub functor_type: String,
    pub compile_options: String,
    pub device: String,
}

impl CacheKey {
    pub fn new(
        template: impl Into<String>,
        instantiation: impl Into<String>,
        value_type: impl Into<String>,
        functor_type: impl Into<String>,
        compile_options: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            instantiation: instantiation.into(),
            value_type: value_type.into(),
            functor_type: functor_type.into(),
            compile_options: compile_options.into(),
            device: device.into(),
        }
    }
}

/// A built program together with the kernels extracted at compile time.
///
/// Immutable after construction and shared by reference between all callers
/// of the same key, so no synchronization is needed on access.
pub struct CompiledEntry<C: Compiler> {
    program: C::Program,
    kernels: HashMap<String, C::Kernel>,
}

impl<C: Compiler> CompiledEntry<C> {
    /// The built backend program.
    pub fn program(&self) -> &C::Program {
        &self.program
    }

    /// A kernel extracted at compile time, if `name` was requested then.
    pub fn kernel(&self, name: &str) -> Option<&C::Kernel> {
        self.kernels.get(name)
    }

    /// Names of the kernels extracted at compile time.
    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.keys().map(String::as_str)
    }
}

/// One in-flight compilation; waiters block on the condvar until it settles.
struct Flight {
    done: Mutex<bool>,
    settled: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            settled: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut done = self.done.lock().unwrap();
        while !*done {
            done = self.settled.wait(done).unwrap();
        }
    }

    fn finish(&self) {
        *self.done.lock().unwrap() = true;
        self.settled.notify_all();
    }
}

enum Slot<C: Compiler> {
    Compiling(Arc<Flight>),
    Ready(Arc<CompiledEntry<C>>),
}

/// Cache of compiled programs keyed by [`CacheKey`].
///
/// Entries live until process teardown; there is no eviction. `clear` exists
/// for tests and diagnostics only.
pub struct ProgramCache<C: Compiler> {
    slots: Mutex<HashMap<CacheKey, Slot<C>>>,
}

impl<C: Compiler> Default for ProgramCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Compiler> ProgramCache<C> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached entry for a key, compiling it if absent.
    ///
    /// On a hit no backend call is made. On a miss the backend compiles
    /// `source` exactly once and one kernel per requested name is extracted
    /// and stored; a failure evicts the slot so the next identical request
    /// re-attempts compilation. With `force_recompile` set on the control
    /// context, a hit is treated as a miss and the stored entry is replaced
    /// on success.
    pub fn get_or_compile(
        &self,
        compiler: &C,
        ctl: &C::Ctl,
        key: &CacheKey,
        source: &str,
        kernel_names: &[&str],
    ) -> Result<Arc<CompiledEntry<C>>> {
        let mut forced = ctl.force_recompile();
        loop {
            let flight = {
                let mut slots = self.slots.lock().unwrap();
                match slots.get(key) {
                    Some(Slot::Ready(entry)) if !forced => {
                        log::debug!("kernel cache hit for template `{}`", key.template);
                        return Ok(entry.clone());
                    }
                    Some(Slot::Compiling(flight)) => flight.clone(),
                    _ => {
                        let flight = Arc::new(Flight::new());
                        slots.insert(key.clone(), Slot::Compiling(flight.clone()));
                        drop(slots);
                        return self.compile_slot(compiler, ctl, key, source, kernel_names, &flight);
                    }
                }
            };

            // Another caller is compiling this exact key. Block until it
            // settles, then share its entry or retry independently.
            flight.wait();
            // The forced recompile happened (or is happening) somewhere;
            // from here on a Ready entry is acceptable.
            forced = false;
        }
    }

    fn compile_slot(
        &self,
        compiler: &C,
        ctl: &C::Ctl,
        key: &CacheKey,
        source: &str,
        kernel_names: &[&str],
        flight: &Flight,
    ) -> Result<Arc<CompiledEntry<C>>> {
        log::debug!(
            "kernel cache miss for template `{}` on device `{}`, compiling",
            key.template,
            key.device
        );
        let result = compile_entry(compiler, ctl, key, source, kernel_names);

        let mut slots = self.slots.lock().unwrap();
        match &result {
            Ok(entry) => {
                slots.insert(key.clone(), Slot::Ready(entry.clone()));
            }
            Err(err) => {
                // Not memoized: the next identical request retries.
                log::debug!("compilation failed for template `{}`: {}", key.template, err);
                slots.remove(key);
            }
        }
        drop(slots);
        flight.finish();
        result
    }

    /// Number of settled entries (in-flight compiles included).
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry. In-flight compiles settle normally.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap()
            .retain(|_, slot| matches!(slot, Slot::Compiling(_)));
    }
}

fn compile_entry<C: Compiler>(
    compiler: &C,
    ctl: &C::Ctl,
    key: &CacheKey,
    source: &str,
    kernel_names: &[&str],
) -> Result<Arc<CompiledEntry<C>>> {
    let program = compiler
        .build_program(ctl, source, &key.compile_options)
        .map_err(|s| {
            status::backend_error(s, &format!("building program for template `{}`", key.template))
        })?;

    let mut kernels = HashMap::with_capacity(kernel_names.len());
    for name in kernel_names {
        let kernel = compiler
            .create_kernel(&program, name)
            .map_err(|s| status::kernel_error(name, s))?;
        kernels.insert(name.to_string(), kernel);
    }

    Ok(Arc::new(CompiledEntry { program, kernels }))
}
