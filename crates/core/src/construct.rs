//! Kernel source construction
//!
//! Assembles final device source by substituting the generic placeholder
//! markers of a kernel template. Substitution is purely textual; structural
//! validity of the result is the backend compiler's concern.

/// Marker replaced with the resolved value type name.
pub const VALUE_TYPE_MARKER: &str = "@VALUE_TYPE@";
/// Marker replaced with the resolved functor type name.
pub const FUNCTOR_TYPE_MARKER: &str = "@FUNCTOR_TYPE@";
/// Marker replaced with the raw user functor source.
pub const FUNCTOR_SOURCE_MARKER: &str = "@FUNCTOR_SOURCE@";
/// Marker replaced with the algorithm instantiation parameters.
pub const INSTANTIATION_MARKER: &str = "@INSTANTIATION@";

/// Substitutes the placeholder markers of a kernel template.
///
/// The user functor source is spliced in verbatim and unescaped; producing
/// syntactically valid device code is the caller's responsibility. Markers
/// absent from the template are silently ignored. The functor source and
/// instantiation are substituted before the type markers, so markers inside
/// the user code are expanded as well.
pub fn construct_source(
    template: &str,
    instantiation: &str,
    functor_source: &str,
    value_type_name: &str,
    functor_type_name: &str,
) -> String {
    let source = template
        .replace(FUNCTOR_SOURCE_MARKER, functor_source)
        .replace(INSTANTIATION_MARKER, instantiation)
        .replace(VALUE_TYPE_MARKER, value_type_name)
        .replace(FUNCTOR_TYPE_MARKER, functor_type_name);
    log::trace!("constructed kernel source:\n{}", source);
    source
}
