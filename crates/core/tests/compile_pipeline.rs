//! End-to-end tests of the construct/compile/cache pipeline against a mock
//! backend that counts compiler invocations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use forge_core::backend::{BackendStatus, Compiler, Control};
use forge_core::cache::CacheKey;
use forge_core::status::{CL_BUILD_PROGRAM_FAILURE, CL_INVALID_KERNEL_NAME};
use forge_core::{
    ForgeError, KernelForge, StaticTemplateSource, TemplateStore, TypeRegistry,
    register_builtin_types,
};

const TRANSFORM_TEMPLATE: &str = "\
// @INSTANTIATION@
@FUNCTOR_SOURCE@
__kernel void transform(__global const @VALUE_TYPE@* in, __global @VALUE_TYPE@* out, uint n) {
    size_t gid = get_global_id(0);
    if (gid < n) {
        out[gid] = @FUNCTOR_TYPE@(in[gid]);
    }
}
";

const REDUCE_TEMPLATE: &str = "\
// @INSTANTIATION@
@FUNCTOR_SOURCE@
__kernel void reduce(__global const @VALUE_TYPE@* in, __global @VALUE_TYPE@* out, uint n) {
    out[0] = @FUNCTOR_TYPE@(in[0], in[1]);
}
__kernel void reduce_final(__global @VALUE_TYPE@* partials, uint n) {
    partials[0] = @FUNCTOR_TYPE@(partials[0], partials[1]);
}
";

#[derive(Clone)]
struct MockProgram {
    source: Arc<str>,
}

#[derive(Clone, Debug)]
struct MockKernel {
    name: Arc<str>,
}

struct MockControl {
    compile_options: String,
    device: String,
    force_recompile: bool,
}

impl MockControl {
    fn new() -> Self {
        Self {
            compile_options: String::new(),
            device: "mock-device-0".to_string(),
            force_recompile: false,
        }
    }

    fn with_options(options: &str) -> Self {
        Self {
            compile_options: options.to_string(),
            ..Self::new()
        }
    }

    fn with_device(device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..Self::new()
        }
    }

    fn forced() -> Self {
        Self {
            force_recompile: true,
            ..Self::new()
        }
    }
}

impl Control for MockControl {
    fn compile_options(&self) -> &str {
        &self.compile_options
    }

    fn device_fingerprint(&self) -> &str {
        &self.device
    }

    fn force_recompile(&self) -> bool {
        self.force_recompile
    }
}

/// Mock backend: a program "contains" a kernel when its source defines one
/// with that name. Build failures can be staged, builds can be slowed down
/// to widen concurrency windows, and every build is counted.
#[derive(Default)]
struct MockCompiler {
    builds: AtomicUsize,
    fail_builds: AtomicUsize,
    build_delay: Option<Duration>,
}

impl MockCompiler {
    fn new() -> Self {
        Self::default()
    }

    fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    fn fail_next_builds(&self, count: usize) {
        self.fail_builds.store(count, Ordering::SeqCst);
    }
}

impl Compiler for MockCompiler {
    type Ctl = MockControl;
    type Program = MockProgram;
    type Kernel = MockKernel;

    fn build_program(
        &self,
        _ctl: &MockControl,
        source: &str,
        _options: &str,
    ) -> Result<MockProgram, BackendStatus> {
        if let Some(delay) = self.build_delay {
            std::thread::sleep(delay);
        }
        if self
            .fail_builds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendStatus::with_log(
                CL_BUILD_PROGRAM_FAILURE,
                "mock build log: staged failure",
            ));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(MockProgram {
            source: source.into(),
        })
    }

    fn create_kernel(
        &self,
        program: &MockProgram,
        name: &str,
    ) -> Result<MockKernel, BackendStatus> {
        if program.source.contains(&format!("__kernel void {}(", name)) {
            Ok(MockKernel { name: name.into() })
        } else {
            Err(BackendStatus::new(CL_INVALID_KERNEL_NAME))
        }
    }
}

fn transform_forge() -> KernelForge<MockCompiler> {
    let templates = TemplateStore::new().with_source(StaticTemplateSource::from_entries([
        ("transform", TRANSFORM_TEMPLATE),
        ("reduce", REDUCE_TEMPLATE),
    ]));
    KernelForge::new(MockCompiler::new(), templates)
}

#[test]
fn test_identical_requests_compile_once() {
    let _ = env_logger::builder().is_test(true).try_init();
    let forge = transform_forge();
    let ctl = MockControl::new();

    let functor = "inline int twice(int x) { return x + x; }";
    let first = forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap();
    let second = forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap();

    assert_eq!(forge.compiler().build_count(), 1);
    // Both calls share the kernel extracted by the first compile
    assert!(Arc::ptr_eq(&first.name, &second.name));
    assert_eq!(forge.cache().len(), 1);
}

#[test]
fn test_each_key_axis_triggers_one_compile() {
    let forge = transform_forge();
    let functor = "inline int twice(int x) { return x + x; }";

    let compile = |template: &str, inst: &str, vty: &str, fty: &str, ctl: &MockControl| {
        forge
            .compile_kernels(&[template], template, inst, functor, vty, fty, ctl)
            .unwrap();
    };

    let ctl = MockControl::new();
    compile("transform", "// <int, twice>", "int", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 1);

    // Same key again: no additional compile
    compile("transform", "// <int, twice>", "int", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 1);

    // Value type changes
    compile("transform", "// <int, twice>", "float", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 2);

    // Functor type changes
    compile("transform", "// <int, twice>", "int", "negate", &ctl);
    assert_eq!(forge.compiler().build_count(), 3);

    // Instantiation changes
    compile("transform", "// <int, negate>", "int", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 4);

    // Template changes
    compile("reduce", "// <int, twice>", "int", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 5);

    // Compile options change
    let fast = MockControl::with_options("-cl-fast-relaxed-math");
    compile("transform", "// <int, twice>", "int", "twice", &fast);
    assert_eq!(forge.compiler().build_count(), 6);

    // Device changes
    let other = MockControl::with_device("mock-device-1");
    compile("transform", "// <int, twice>", "int", "twice", &other);
    assert_eq!(forge.compiler().build_count(), 7);

    // Every prior key is still a hit
    compile("transform", "// <int, twice>", "int", "twice", &ctl);
    compile("reduce", "// <int, twice>", "int", "twice", &ctl);
    assert_eq!(forge.compiler().build_count(), 7);
}

#[test]
fn test_concurrent_requests_single_flight() {
    let _ = env_logger::builder().is_test(true).try_init();
    let templates = TemplateStore::new().with_source(StaticTemplateSource::from_entries([(
        "transform",
        TRANSFORM_TEMPLATE,
    )]));
    let compiler = MockCompiler {
        build_delay: Some(Duration::from_millis(20)),
        ..MockCompiler::new()
    };
    let forge = Arc::new(KernelForge::new(compiler, templates));

    let threads = 8;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let forge = forge.clone();
                scope.spawn(move || {
                    let ctl = MockControl::new();
                    forge.construct_and_compile(
                        "transform",
                        "// <float, halve>",
                        "inline float halve(float x) { return x * 0.5f; }",
                        "float",
                        "halve",
                        &ctl,
                    )
                })
            })
            .collect();
        for handle in handles {
            let kernel = handle.join().unwrap().unwrap();
            assert_eq!(&*kernel.name, "transform");
        }
    });

    assert_eq!(forge.compiler().build_count(), 1);
}

#[test]
fn test_distinct_keys_compile_in_parallel() {
    let templates = TemplateStore::new().with_source(StaticTemplateSource::from_entries([(
        "transform",
        TRANSFORM_TEMPLATE,
    )]));
    let compiler = MockCompiler {
        build_delay: Some(Duration::from_millis(50)),
        ..MockCompiler::new()
    };
    let forge = Arc::new(KernelForge::new(compiler, templates));

    let start = std::time::Instant::now();
    std::thread::scope(|scope| {
        for value_type in ["char", "short", "int", "long", "float", "double"] {
            let forge = forge.clone();
            scope.spawn(move || {
                let ctl = MockControl::new();
                forge
                    .construct_and_compile(
                        "transform",
                        "// <T, id>",
                        "inline @VALUE_TYPE@ id(@VALUE_TYPE@ x) { return x; }",
                        value_type,
                        "id",
                        &ctl,
                    )
                    .unwrap();
            });
        }
    });

    assert_eq!(forge.compiler().build_count(), 6);
    // Six 50ms compiles that serialized would take at least 300ms
    assert!(start.elapsed() < Duration::from_millis(280));
}

#[test]
fn test_failed_compile_is_not_memoized() {
    let _ = env_logger::builder().is_test(true).try_init();
    let forge = transform_forge();
    let ctl = MockControl::new();
    forge.compiler().fail_next_builds(1);

    let functor = "inline int twice(int x) { return x + x; }";
    let err = forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap_err();
    match &err {
        ForgeError::BackendCompile { status, message } => {
            assert_eq!(*status, CL_BUILD_PROGRAM_FAILURE);
            assert!(message.contains("CL_BUILD_PROGRAM_FAILURE"));
            assert!(message.contains("mock build log"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(forge.cache().len(), 0);

    // The identical request re-attempts and succeeds
    forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap();
    assert_eq!(forge.cache().len(), 1);
}

#[test]
fn test_waiter_retries_after_shared_failure() {
    let templates = TemplateStore::new().with_source(StaticTemplateSource::from_entries([(
        "transform",
        TRANSFORM_TEMPLATE,
    )]));
    let compiler = MockCompiler {
        build_delay: Some(Duration::from_millis(20)),
        ..MockCompiler::new()
    };
    compiler.fail_next_builds(1);
    let forge = Arc::new(KernelForge::new(compiler, templates));

    let compile = |forge: &KernelForge<MockCompiler>| {
        let ctl = MockControl::new();
        forge.construct_and_compile(
            "transform",
            "// <int, twice>",
            "inline int twice(int x) { return x + x; }",
            "int",
            "twice",
            &ctl,
        )
    };

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let forge = forge.clone();
                scope.spawn(move || compile(&forge))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Exactly one caller observed the staged failure; everyone else either
    // shared the retry's entry or retried themselves.
    let failures = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(failures, 1);
    assert!(results.iter().any(|r| r.is_ok()));

    // The key is usable afterwards without another backend build
    let builds = forge.compiler().build_count();
    compile(&forge).unwrap();
    assert_eq!(forge.compiler().build_count(), builds);
}

#[test]
fn test_requested_kernel_missing_from_program() {
    let forge = transform_forge();
    let ctl = MockControl::new();

    let err = forge
        .compile_kernels(
            &["transform", "transform_tail"],
            "transform",
            "// <int, twice>",
            "inline int twice(int x) { return x + x; }",
            "int",
            "twice",
            &ctl,
        )
        .unwrap_err();
    assert!(matches!(err, ForgeError::KernelNotFound { name } if name == "transform_tail"));
    // Extraction failure fails the whole request; nothing is cached
    assert_eq!(forge.cache().len(), 0);
}

#[test]
fn test_multi_kernel_template() {
    let forge = transform_forge();
    let ctl = MockControl::new();

    let kernels = forge
        .compile_kernels(
            &["reduce", "reduce_final"],
            "reduce",
            "// <int, plus>",
            "inline int plus(int a, int b) { return a + b; }",
            "int",
            "plus",
            &ctl,
        )
        .unwrap();
    assert_eq!(kernels.len(), 2);
    assert_eq!(&*kernels[0].name, "reduce");
    assert_eq!(&*kernels[1].name, "reduce_final");
    assert_eq!(forge.compiler().build_count(), 1);

    // A later request for a subset hits the same entry
    forge
        .compile_kernels(
            &["reduce_final"],
            "reduce",
            "// <int, plus>",
            "inline int plus(int a, int b) { return a + b; }",
            "int",
            "plus",
            &ctl,
        )
        .unwrap();
    assert_eq!(forge.compiler().build_count(), 1);
}

#[test]
fn test_force_recompile_replaces_entry() {
    let forge = transform_forge();
    let functor = "inline int twice(int x) { return x + x; }";

    let ctl = MockControl::new();
    forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap();
    assert_eq!(forge.compiler().build_count(), 1);

    let forced = MockControl::forced();
    forge
        .construct_and_compile(
            "transform",
            "// <int, twice>",
            functor,
            "int",
            "twice",
            &forced,
        )
        .unwrap();
    assert_eq!(forge.compiler().build_count(), 2);
    assert_eq!(forge.cache().len(), 1);

    // Back to normal lookups: the replaced entry is a hit
    forge
        .construct_and_compile("transform", "// <int, twice>", functor, "int", "twice", &ctl)
        .unwrap();
    assert_eq!(forge.compiler().build_count(), 2);
}

#[test]
fn test_compile_functor_bypasses_cache() {
    let forge = transform_forge();
    let ctl = MockControl::new();

    let source = "\
inline float halve(float x) { return x * 0.5f; }
__kernel void halve_all(__global float* data, uint n) {
    size_t gid = get_global_id(0);
    if (gid < n) {
        data[gid] = halve(data[gid]);
    }
}
";
    let kernel = forge
        .compile_functor(source, "halve_all", "", &ctl)
        .unwrap();
    assert_eq!(&*kernel.name, "halve_all");

    forge.compile_functor(source, "halve_all", "", &ctl).unwrap();
    assert_eq!(forge.compiler().build_count(), 2);
    assert_eq!(forge.cache().len(), 0);
}

#[test]
fn test_missing_template_is_fatal() {
    let forge = transform_forge();
    let ctl = MockControl::new();

    let err = forge
        .construct_and_compile("sort", "// <int, less>", "", "int", "less", &ctl)
        .unwrap_err();
    assert!(matches!(err, ForgeError::TemplateNotFound(name) if name == "sort"));
    assert_eq!(forge.compiler().build_count(), 0);
}

// The end-to-end scenario: register a type, construct from a template,
// compile, and verify the second identical request is answered from the
// cache with the same kernel handle.
#[test]
fn test_register_construct_compile_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = TypeRegistry::new();
    register_builtin_types(&registry).unwrap();

    let forge = transform_forge();
    let ctl = MockControl::new();

    let value_type = registry.lookup::<i32>().unwrap();
    let functor = "inline int PlusOp(int a, int b) { return a + b; }";
    let kernels = forge
        .compile_kernels(
            &["reduce"],
            "reduce",
            "// <int, PlusOp>",
            functor,
            &value_type,
            "PlusOp",
            &ctl,
        )
        .unwrap();

    // The constructed source reached the backend with both names substituted
    let key = CacheKey::new(
        "reduce",
        "// <int, PlusOp>",
        "int",
        "PlusOp",
        "",
        "mock-device-0",
    );
    let entry = forge
        .cache()
        .get_or_compile(forge.compiler(), &ctl, &key, "unused", &[])
        .unwrap();
    assert!(entry.program().source.contains("__global const int* in"));
    assert!(entry.program().source.contains("PlusOp(in[0], in[1])"));
    assert!(!entry.program().source.contains("@VALUE_TYPE@"));

    let again = forge
        .compile_kernels(
            &["reduce"],
            "reduce",
            "// <int, PlusOp>",
            functor,
            &value_type,
            "PlusOp",
            &ctl,
        )
        .unwrap();
    assert_eq!(forge.compiler().build_count(), 1);
    assert!(Arc::ptr_eq(&kernels[0].name, &again[0].name));
}
