//! Configuration of the ABI filters and the archive writer.

use crate::metadata::PruneOptions;

/// Options controlling what survives ABI stripping
///
/// The defaults describe a conservative run: the Kotlin metadata is honoured, `internal`
/// declarations stay, method bodies are dropped entirely and declarations are re-sorted for
/// deterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AbiConfig {
    /// Use the Kotlin-metadata-aware filter instead of the generic member filter
    pub use_metadata: bool,

    /// Treat `internal` classes and members like private ones
    /// Only meaningful together with `use_metadata`
    pub treat_internal_as_private: bool,

    /// Keep the declaration order recorded in the metadata instead of sorting it
    pub preserve_declaration_order: bool,

    /// Remove every constructor, function, property and type alias from the metadata
    pub prune_class: bool,

    /// Read method bodies and replace every non-inline, non-constructor body with a minimal
    /// synthetic one; when off, bodies are skipped entirely
    pub body_stripping: bool,

    /// Drop methods that are neither public nor protected (fields are always filtered)
    pub method_access_filter: bool,

    /// Keep `SourceFile` and `SourceDebugExtension`
    pub keep_source_debug_info: bool,

    /// Copy `META-INF/*.kotlin_module` entries into the output archive
    pub copy_kotlin_module: bool,
}

impl Default for AbiConfig {
    fn default() -> Self {
        Self {
            use_metadata: true,
            treat_internal_as_private: false,
            preserve_declaration_order: false,
            prune_class: false,
            body_stripping: false,
            method_access_filter: true,
            keep_source_debug_info: false,
            copy_kotlin_module: true,
        }
    }
}

impl AbiConfig {
    /// Configuration for plain Java output: the generic member filter only
    #[must_use]
    pub fn java() -> Self {
        Self {
            use_metadata: false,
            copy_kotlin_module: false,
            ..Self::default()
        }
    }

    /// Configuration for Kotlin output consumed by other modules
    ///
    /// `internal` declarations are not visible outside the module and are removed.
    #[must_use]
    pub fn kotlin() -> Self {
        Self {
            use_metadata: true,
            treat_internal_as_private: true,
            ..Self::default()
        }
    }

    /// Kotlin configuration that keeps loadable bytecode
    ///
    /// Inline function bodies are copied into callers at compile time, so they are kept while
    /// every other body becomes a stub.
    #[must_use]
    pub fn inline_safe() -> Self {
        Self {
            body_stripping: true,
            ..Self::kotlin()
        }
    }

    /// The metadata pruning options implied by this configuration
    #[must_use]
    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            treat_internal_as_private: self.treat_internal_as_private,
            prune_class: self.prune_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_config_presets() {
        let default = AbiConfig::default();
        assert!(default.use_metadata);
        assert!(!default.treat_internal_as_private);
        assert!(!default.preserve_declaration_order);
        assert!(!default.prune_class);
        assert!(!default.body_stripping);
        assert!(default.method_access_filter);
        assert!(!default.keep_source_debug_info);
        assert!(default.copy_kotlin_module);

        let java = AbiConfig::java();
        assert!(!java.use_metadata);
        assert!(!java.copy_kotlin_module);
        assert!(java.method_access_filter);

        let kotlin = AbiConfig::kotlin();
        assert!(kotlin.use_metadata);
        assert!(kotlin.treat_internal_as_private);
        assert!(!kotlin.body_stripping);

        let inline_safe = AbiConfig::inline_safe();
        assert!(inline_safe.treat_internal_as_private);
        assert!(inline_safe.body_stripping);
    }

    #[test]
    fn test_prune_options() {
        let options = AbiConfig {
            prune_class: true,
            ..AbiConfig::kotlin()
        }
        .prune_options();
        assert!(options.prune_class);
        assert!(options.treat_internal_as_private);
        assert_eq!(AbiConfig::default().prune_options(), PruneOptions::default());
    }
}
