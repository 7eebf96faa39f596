//! The Kotlin-metadata-aware filter.
//!
//! [`MetadataFilter`] wraps a [`MemberFilter`] and applies the visibility rules that only the
//! `@kotlin.Metadata` annotation can express. The annotation is taken out of the event stream,
//! decoded, pruned in step with the binary members and emitted again as the first annotation of
//! the class.

use log::{debug, warn};

use crate::{
    abi::{config::AbiConfig, deleted::DeletedClassNames, filter::MemberFilter},
    classfile::{
        annotation::Annotation, ClassHeader, ClassVisitor, FieldInfo, InnerClass, MethodInfo,
        OuterClass, RawAttribute, SourceInfo,
    },
    metadata::{ClassMetadata, MetadataHeader, MetadataKind, METADATA_DESCRIPTOR},
    Result,
};

/// Filters one class using both its access flags and its Kotlin metadata.
///
/// On top of [`MemberFilter`]:
///
/// - a class whose metadata declares it `private`, `private-to-this` or `local` (or `internal`
///   with [`AbiConfig::treat_internal_as_private`]) is deleted
/// - with `treat_internal_as_private`, fields and methods named like an `internal` function or
///   property are dropped; matching is by JVM name only, so every overload of such a name goes
/// - the metadata is pruned (see [`ClassMetadata::prune`]), sorted unless
///   [`AbiConfig::preserve_declaration_order`] is set, and re-encoded
/// - with [`AbiConfig::body_stripping`], bodies of `inline` functions are kept
/// - the remaining annotations are emitted sorted by descriptor
pub struct MetadataFilter<'a, V: ClassVisitor> {
    inner: MemberFilter<'a, V>,
    /// Descriptor and decoded slots of the metadata annotation
    metadata: Option<(String, MetadataHeader)>,
}

impl<'a, V: ClassVisitor> MetadataFilter<'a, V> {
    /// Creates a filter forwarding to `next` and recording deletions in `deleted`.
    pub fn new(next: V, config: &'a AbiConfig, deleted: &'a mut DeletedClassNames) -> Self {
        MetadataFilter {
            inner: MemberFilter::new(next, config, deleted),
            metadata: None,
        }
    }

    /// See [`MemberFilter::is_api_class`].
    #[must_use]
    pub fn is_api_class(&self) -> bool {
        self.inner.is_api_class()
    }

    /// The metadata captured so far, before pruning.
    #[must_use]
    pub fn metadata(&self) -> Option<&MetadataHeader> {
        self.metadata.as_ref().map(|(_, header)| header)
    }

    /// Consumes the filter and returns the next stage.
    pub fn into_inner(self) -> V {
        self.inner.into_inner()
    }

    fn apply_metadata(&mut self, descriptor: String, header: &MetadataHeader) -> Result<()> {
        let config = *self.inner.config();
        let mut metadata = ClassMetadata::parse(header)?;
        let class_name = self.inner.class_name().unwrap_or_default().to_string();

        if let Some(visibility) = metadata.class_visibility() {
            if visibility.is_private_tier(config.treat_internal_as_private) {
                debug!("{} is {} in its metadata", class_name, visibility);
                self.inner.mark_not_api();
            }
        }
        if !self.inner.is_api_class() {
            return Ok(());
        }
        if let MetadataKind::Unknown(kind) = metadata.kind() {
            warn!(
                "{} carries metadata of unknown kind {}, copying it unpruned",
                class_name, kind
            );
        }

        if config.treat_internal_as_private {
            self.inner.suppress_members(metadata.internal_member_names());
        }
        if config.body_stripping {
            self.inner.keep_bodies(metadata.inline_function_names());
        }

        let deleted = self.inner.deleted();
        let removed = metadata.prune(&class_name, config.prune_options(), |name| {
            deleted.contains(name)
        });
        if !config.preserve_declaration_order {
            metadata.sort_declarations();
        }
        if removed > 0 {
            debug!("Pruned {} declarations from the metadata of {}", removed, class_name);
        }

        let mut annotation = metadata.to_header().to_annotation()?;
        annotation.descriptor = descriptor;
        self.inner.push_leading_annotation(annotation, true);
        Ok(())
    }
}

impl<V: ClassVisitor> ClassVisitor for MetadataFilter<'_, V> {
    fn visit_header(&mut self, header: ClassHeader) -> Result<()> {
        self.inner.visit_header(header)
    }

    fn visit_source(&mut self, source: SourceInfo) -> Result<()> {
        self.inner.visit_source(source)
    }

    fn visit_nest_host(&mut self, host: String) -> Result<()> {
        self.inner.visit_nest_host(host)
    }

    fn visit_outer_class(&mut self, outer: OuterClass) -> Result<()> {
        self.inner.visit_outer_class(outer)
    }

    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()> {
        if annotation.descriptor == METADATA_DESCRIPTOR {
            let header = MetadataHeader::from_annotation(&annotation)?;
            self.metadata = Some((annotation.descriptor, header));
            return Ok(());
        }
        self.inner.visit_annotation(annotation, visible)
    }

    fn visit_attribute(&mut self, attribute: RawAttribute) -> Result<()> {
        self.inner.visit_attribute(attribute)
    }

    fn visit_nest_member(&mut self, member: String) -> Result<()> {
        self.inner.visit_nest_member(member)
    }

    fn visit_permitted_subclass(&mut self, subclass: String) -> Result<()> {
        self.inner.visit_permitted_subclass(subclass)
    }

    fn visit_inner_class(&mut self, inner: InnerClass) -> Result<()> {
        self.inner.visit_inner_class(inner)
    }

    fn visit_field(&mut self, field: FieldInfo) -> Result<()> {
        self.inner.visit_field(field)
    }

    fn visit_method(&mut self, method: MethodInfo) -> Result<()> {
        self.inner.visit_method(method)
    }

    fn visit_end(&mut self) -> Result<()> {
        if let Some((descriptor, header)) = self.metadata.take() {
            self.apply_metadata(descriptor, &header)?;
        }
        self.inner.sort_annotations();
        self.inner.visit_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::{
            access::{FieldAccessFlags, MethodAccessFlags},
            descriptor::synthetic_code,
            ClassReader, ReadOptions,
        },
        metadata::Visibility,
        test::{visibility_flags, ClassBuilder, MetadataBuilder, Recorder, INLINE},
    };

    const PUBLIC: MethodAccessFlags = MethodAccessFlags::PUBLIC;

    fn run(bytes: &[u8], config: &AbiConfig, deleted: &mut DeletedClassNames) -> (bool, Recorder) {
        let reader = ClassReader::new(bytes).unwrap();
        let mut recorder = Recorder::default();
        let mut filter = MetadataFilter::new(&mut recorder, config, deleted);
        reader.accept(&mut filter, ReadOptions::default()).unwrap();
        let api = filter.is_api_class();
        drop(filter);
        (api, recorder)
    }

    fn output_metadata(recorder: &Recorder) -> ClassMetadata {
        let (annotation, visible) = &recorder.annotations[0];
        assert_eq!(annotation.descriptor, METADATA_DESCRIPTOR);
        assert!(*visible);
        let header = MetadataHeader::from_annotation(annotation).unwrap();
        ClassMetadata::parse(&header).unwrap()
    }

    #[test]
    fn internal_class_is_deleted_when_internal_is_private() {
        let metadata = MetadataBuilder::class("com/x/B", Visibility::Internal).build();
        let bytes = ClassBuilder::new("com/x/B")
            .kotlin_metadata(&metadata)
            .method(PUBLIC, "run", "()V")
            .build()
            .unwrap();

        let mut deleted = DeletedClassNames::new();
        let (api, output) = run(&bytes, &AbiConfig::default(), &mut deleted);
        assert!(api);
        assert!(output.ended);
        assert!(deleted.is_empty());

        let (api, output) = run(&bytes, &AbiConfig::kotlin(), &mut deleted);
        assert!(!api);
        assert!(output.header.is_none());
        assert!(deleted.contains("com/x/B"));
    }

    #[test]
    fn private_class_in_metadata_is_deleted() {
        for visibility in [Visibility::Private, Visibility::PrivateToThis, Visibility::Local] {
            let metadata = MetadataBuilder::class("com/x/P", visibility).build();
            let bytes = ClassBuilder::new("com/x/P").kotlin_metadata(&metadata).build().unwrap();
            let mut deleted = DeletedClassNames::new();
            let (api, _) = run(&bytes, &AbiConfig::default(), &mut deleted);
            assert!(!api, "{visibility}");
            assert!(deleted.contains("com/x/P"));
        }
    }

    #[test]
    fn internal_members_are_removed_from_class_and_metadata() {
        let metadata = MetadataBuilder::class("com/x/A", Visibility::Public)
            .function("foo", Visibility::Internal, "()V")
            .function("bar", Visibility::Public, "()V")
            .property("size", Visibility::Internal, "I")
            .build();
        let bytes = ClassBuilder::new("com/x/A")
            .kotlin_metadata(&metadata)
            .field(FieldAccessFlags::PUBLIC, "size", "I")
            .method(PUBLIC, "foo", "()V")
            .method(PUBLIC, "bar", "()V")
            .method(PUBLIC, "getSize", "()I")
            .build()
            .unwrap();

        let mut deleted = DeletedClassNames::new();
        let (api, output) = run(&bytes, &AbiConfig::kotlin(), &mut deleted);
        assert!(api);
        assert_eq!(output.method_names(), ["bar"]);
        assert!(output.field_names().is_empty());

        let pruned = output_metadata(&output);
        let declarations = pruned.declarations().unwrap();
        let functions: Vec<&str> = declarations.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, ["bar"]);
        assert!(declarations.properties.is_empty());
    }

    #[test]
    fn metadata_is_leading_and_annotations_sorted() {
        let metadata = MetadataBuilder::class("com/x/A", Visibility::Public).build();
        let bytes = ClassBuilder::new("com/x/A")
            .annotation(Annotation::new("Lcom/x/Zeta;"), true)
            .kotlin_metadata(&metadata)
            .annotation(Annotation::new("Lcom/x/Alpha;"), false)
            .build()
            .unwrap();

        let mut deleted = DeletedClassNames::new();
        let (_, output) = run(&bytes, &AbiConfig::default(), &mut deleted);
        assert_eq!(
            output.annotation_descriptors(),
            [METADATA_DESCRIPTOR, "Lcom/x/Alpha;", "Lcom/x/Zeta;"]
        );
        // Untouched metadata is reproduced exactly
        let header = MetadataHeader::from_annotation(&output.annotations[0].0).unwrap();
        assert_eq!(header, metadata);
    }

    #[test]
    fn nested_classes_follow_deleted_set() {
        let metadata = MetadataBuilder::class("com/x/Outer", Visibility::Public)
            .companion("Companion")
            .nested_classes(&["Inner", "Kept"])
            .build();
        let bytes = ClassBuilder::new("com/x/Outer")
            .kotlin_metadata(&metadata)
            .inner_class("com/x/Outer$Inner", Some("com/x/Outer"), Some("Inner"), 0)
            .inner_class("com/x/Outer$Kept", Some("com/x/Outer"), Some("Kept"), 1)
            .build()
            .unwrap();

        let mut deleted = DeletedClassNames::new();
        deleted.insert("com/x/Outer$Inner");
        deleted.insert("com/x/Outer$Companion");
        let (_, output) = run(&bytes, &AbiConfig::default(), &mut deleted);

        assert_eq!(output.inner_classes.len(), 1);
        let pruned = output_metadata(&output);
        let class = pruned.declarations().unwrap().class.clone().unwrap();
        let nested: Vec<String> = class.nested_classes.into_iter().map(|n| n.name).collect();
        assert_eq!(nested, ["Kept"]);
        assert!(class.companion_object.is_none());
    }

    #[test]
    fn inline_bodies_survive_body_stripping() {
        let public = visibility_flags(Visibility::Public);
        let metadata = MetadataBuilder::file()
            .function_with_flags("fast", public | INLINE, "()I")
            .function("slow", Visibility::Public, "()I")
            .build();
        let bytes = ClassBuilder::new("com/x/UtilKt")
            .kotlin_metadata(&metadata)
            .method_with_body(PUBLIC | MethodAccessFlags::STATIC, "fast", "()I", vec![9, 9])
            .method_with_body(PUBLIC | MethodAccessFlags::STATIC, "slow", "()I", vec![8, 8])
            .build()
            .unwrap();

        let mut deleted = DeletedClassNames::new();
        let (_, output) = run(&bytes, &AbiConfig::inline_safe(), &mut deleted);
        assert_eq!(output.methods[0].code, Some(vec![9, 9]));
        assert_eq!(
            output.methods[1].code,
            Some(synthetic_code(PUBLIC | MethodAccessFlags::STATIC, "()I").unwrap())
        );
    }

    #[test]
    fn declaration_order_can_be_preserved() {
        let metadata = MetadataBuilder::file()
            .function("b", Visibility::Public, "()V")
            .function("a", Visibility::Public, "()V")
            .build();
        let bytes = ClassBuilder::new("com/x/FileKt").kotlin_metadata(&metadata).build().unwrap();

        let mut deleted = DeletedClassNames::new();
        let (_, sorted) = run(&bytes, &AbiConfig::default(), &mut deleted);
        let names = |recorder: &Recorder| -> Vec<String> {
            output_metadata(recorder)
                .declarations()
                .unwrap()
                .functions
                .iter()
                .map(|f| f.name.clone())
                .collect()
        };
        assert_eq!(names(&sorted), ["a", "b"]);

        let config = AbiConfig {
            preserve_declaration_order: true,
            ..AbiConfig::default()
        };
        let (_, preserved) = run(&bytes, &config, &mut deleted);
        assert_eq!(names(&preserved), ["b", "a"]);
        assert_eq!(
            MetadataHeader::from_annotation(&preserved.annotations[0].0).unwrap(),
            metadata
        );
    }

    #[test]
    fn classes_without_metadata_behave_like_member_filter() {
        let bytes = ClassBuilder::new("com/x/A")
            .method(PUBLIC, "bar", "()V")
            .method(MethodAccessFlags::PRIVATE, "baz", "()V")
            .build()
            .unwrap();
        let mut deleted = DeletedClassNames::new();
        let (api, output) = run(&bytes, &AbiConfig::kotlin(), &mut deleted);
        assert!(api);
        assert_eq!(output.method_names(), ["bar"]);
        assert!(output.annotations.is_empty());
    }

    #[test]
    fn wrong_metadata_type_is_fatal() {
        let mut annotation = Annotation::new(METADATA_DESCRIPTOR);
        annotation.elements.push((
            "k".to_string(),
            crate::classfile::annotation::ElementValue::String("1".to_string()),
        ));
        let bytes = ClassBuilder::new("com/x/A").annotation(annotation, true).build().unwrap();

        let config = AbiConfig::default();
        let mut deleted = DeletedClassNames::new();
        let reader = ClassReader::new(&bytes).unwrap();
        let mut filter = MetadataFilter::new(Recorder::default(), &config, &mut deleted);
        assert!(reader.accept(&mut filter, ReadOptions::default()).is_err());
    }
}
