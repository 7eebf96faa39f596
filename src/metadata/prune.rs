//! Removal and ordering of declarations in a [`ClassMetadata`].

use crate::metadata::model::{ClassMetadata, Visibility};

/// Controls what [`ClassMetadata::prune`] removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Remove `internal` declarations as well
    pub treat_internal_as_private: bool,
    /// Remove every constructor, function, property and type alias regardless of visibility
    pub prune_class: bool,
}

impl ClassMetadata {
    /// Removes declarations that are not part of the ABI of `class_name`.
    ///
    /// - private-tier constructors, functions, properties and type aliases
    /// - nested classes and the companion object whose binary name `class_name$Name` is
    ///   reported deleted by `is_deleted`
    /// - every delegated local variable
    ///
    /// `HAS_CONSTANT` is cleared on properties that are not `const`, since their initializers
    /// do not survive stripping. Opaque kinds are left untouched.
    ///
    /// Returns the number of declarations removed.
    pub fn prune(
        &mut self,
        class_name: &str,
        options: PruneOptions,
        is_deleted: impl Fn(&str) -> bool,
    ) -> usize {
        let Some(declarations) = self.declarations_mut() else {
            return 0;
        };
        let hidden =
            |visibility: Visibility| visibility.is_private_tier(options.treat_internal_as_private);

        let before = declarations.constructors.len()
            + declarations.functions.len()
            + declarations.properties.len()
            + declarations.type_aliases.len()
            + declarations.local_delegated_properties.len();

        if options.prune_class {
            declarations.constructors.clear();
            declarations.functions.clear();
            declarations.properties.clear();
            declarations.type_aliases.clear();
        } else {
            declarations.constructors.retain(|c| !hidden(c.visibility()));
            declarations.functions.retain(|f| !hidden(f.visibility()));
            declarations.properties.retain(|p| !hidden(p.visibility()));
            declarations.type_aliases.retain(|t| !hidden(t.visibility()));
        }
        declarations.local_delegated_properties.clear();

        for property in &mut declarations.properties {
            if !property.is_const() {
                property.clear_has_constant();
            }
        }

        let after = declarations.constructors.len()
            + declarations.functions.len()
            + declarations.properties.len()
            + declarations.type_aliases.len();

        if let Some(class) = &mut declarations.class {
            let binary_name = |simple: &str| format!("{class_name}${simple}");
            class
                .nested_classes
                .retain(|nested| !is_deleted(&binary_name(&nested.name)));
            if class
                .companion_object
                .as_ref()
                .is_some_and(|companion| is_deleted(&binary_name(&companion.name)))
            {
                class.companion_object = None;
            }
        }

        before - after
    }

    /// Orders functions by name then JVM signature, properties by name then getter signature
    /// and type aliases by name. Sorting is stable.
    pub fn sort_declarations(&mut self) {
        let Some(declarations) = self.declarations_mut() else {
            return;
        };
        declarations.functions.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.signature().cmp(&b.signature()))
        });
        declarations.properties.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.signature().cmp(&b.signature()))
        });
        declarations.type_aliases.sort_by(|a, b| a.name.cmp(&b.name));
    }
}
