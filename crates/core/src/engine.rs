//! Kernel compilation entry points
//!
//! [`KernelForge`] ties the template store, the kernel constructor and the
//! compilation cache together behind the interface the host algorithm call
//! sites use.

use std::sync::Arc;

use crate::backend::{Compiler, Control};
use crate::cache::{CacheKey, CompiledEntry, ProgramCache};
use crate::construct::construct_source;
use crate::error::{ForgeError, Result};
use crate::status;
use crate::template::TemplateStore;

/// Runtime kernel compilation engine.
///
/// Owns the template store and the compilation cache; the control context is
/// borrowed per call and never stored.
pub struct KernelForge<C: Compiler> {
    compiler: C,
    templates: TemplateStore,
    cache: ProgramCache<C>,
}

impl<C: Compiler> KernelForge<C> {
    pub fn new(compiler: C, templates: TemplateStore) -> Self {
        Self {
            compiler,
            templates,
            cache: ProgramCache::new(),
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn cache(&self) -> &ProgramCache<C> {
        &self.cache
    }

    /// Compiles caller-assembled source into a single kernel.
    ///
    /// This is the direct, uncached compile path: the source has already
    /// been constructed by the caller and is built exactly as given, with
    /// `compile_options` passed through to the backend.
    pub fn compile_functor(
        &self,
        source: &str,
        kernel_name: &str,
        compile_options: &str,
        ctl: &C::Ctl,
    ) -> Result<C::Kernel> {
        log::debug!("compiling functor kernel `{}`", kernel_name);
        let program = self
            .compiler
            .build_program(ctl, source, compile_options)
            .map_err(|s| {
                status::backend_error(
                    s,
                    &format!("building program for functor kernel `{}`", kernel_name),
                )
            })?;
        self.extract_kernel(&program, kernel_name)
    }

    /// Constructs source from the template named `api_name` and compiles it
    /// through the cache, returning the kernel named `api_name`.
    ///
    /// The template's kernel must be named exactly `api_name`.
    pub fn construct_and_compile(
        &self,
        api_name: &str,
        instantiation: &str,
        user_functor_source: &str,
        value_type_name: &str,
        functor_type_name: &str,
        ctl: &C::Ctl,
    ) -> Result<C::Kernel> {
        let mut kernels = self.compile_kernels(
            &[api_name],
            api_name,
            instantiation,
            user_functor_source,
            value_type_name,
            functor_type_name,
            ctl,
        )?;
        kernels.pop().ok_or_else(|| ForgeError::KernelNotFound {
            name: api_name.to_string(),
        })
    }

    /// Constructs source from a named template and compiles it through the
    /// cache, returning one kernel handle per requested name.
    #[allow(clippy::too_many_arguments)]
    pub fn compile_kernels(
        &self,
        kernel_names: &[&str],
        template_name: &str,
        instantiation: &str,
        user_functor_source: &str,
        value_type_name: &str,
        functor_type_name: &str,
        ctl: &C::Ctl,
    ) -> Result<Vec<C::Kernel>> {
        let template = self.templates.load(template_name)?;
        let source = construct_source(
            &template,
            instantiation,
            user_functor_source,
            value_type_name,
            functor_type_name,
        );
        let key = CacheKey::new(
            template_name,
            instantiation,
            value_type_name,
            functor_type_name,
            ctl.compile_options(),
            ctl.device_fingerprint(),
        );

        let entry = self
            .cache
            .get_or_compile(&self.compiler, ctl, &key, &source, kernel_names)?;
        kernel_names
            .iter()
            .map(|name| self.kernel_from_entry(&entry, name))
            .collect()
    }

    /// Returns a kernel from a cached entry, extracting it from the shared
    /// program when the entry was compiled for a different name set.
    fn kernel_from_entry(&self, entry: &Arc<CompiledEntry<C>>, name: &str) -> Result<C::Kernel> {
        match entry.kernel(name) {
            Some(kernel) => Ok(kernel.clone()),
            None => self.extract_kernel(entry.program(), name),
        }
    }

    fn extract_kernel(&self, program: &C::Program, name: &str) -> Result<C::Kernel> {
        self.compiler
            .create_kernel(program, name)
            .map_err(|s| status::kernel_error(name, s))
    }
}

/// Library version triple, for diagnostics.
pub fn version() -> (u32, u32, u32) {
    let parse = |s: &str| s.parse().unwrap_or(0);
    (
        parse(env!("CARGO_PKG_VERSION_MAJOR")),
        parse(env!("CARGO_PKG_VERSION_MINOR")),
        parse(env!("CARGO_PKG_VERSION_PATCH")),
    )
}
