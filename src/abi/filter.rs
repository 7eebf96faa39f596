//! The generic member filter.
//!
//! [`MemberFilter`] sits between a [`crate::ClassReader`] and the next [`ClassVisitor`] stage and
//! reduces one class to its public surface:
//!
//! - classes that are neither public nor protected are dropped and recorded in the
//!   [`DeletedClassNames`] of the run
//! - fields, and methods unless [`AbiConfig::method_access_filter`] is off, that are neither
//!   public nor protected are dropped
//! - `NestMembers`, `PermittedSubclasses` and `InnerClasses` entries naming deleted classes are
//!   dropped
//! - `SourceFile` and `SourceDebugExtension` are dropped unless
//!   [`AbiConfig::keep_source_debug_info`] is set
//! - fields and methods are emitted sorted by name
//!
//! # Deferred decisions
//!
//! Every event is buffered and nothing is forwarded before `visit_end`. Whether the class
//! survives can depend on an annotation (the Kotlin metadata), and class attributes carrying
//! annotations are not guaranteed to precede or follow anything in particular, so the decision is
//! taken once the whole class has been seen. The metadata-aware filter
//! ([`crate::abi::MetadataFilter`]) uses the same buffer through the `pub(crate)` hooks below.

use std::collections::HashSet;

use log::debug;

use crate::{
    abi::{config::AbiConfig, deleted::DeletedClassNames},
    classfile::{
        annotation::Annotation, descriptor::synthetic_code, AnnotationEntry, ClassHeader,
        ClassVisitor, FieldInfo, InnerClass, MethodInfo, OuterClass, RawAttribute, SourceInfo,
    },
    Result,
};

/// Filters one class down to its public and protected members.
///
/// A filter instance handles exactly one class. It forwards to `next` only if the class turns
/// out to be part of the API; afterwards [`MemberFilter::is_api_class`] reports the decision.
pub struct MemberFilter<'a, V: ClassVisitor> {
    next: V,
    config: &'a AbiConfig,
    deleted: &'a mut DeletedClassNames,
    header: Option<ClassHeader>,
    api_class: bool,
    source: Option<SourceInfo>,
    nest_host: Option<String>,
    outer_class: Option<OuterClass>,
    leading_annotations: Vec<AnnotationEntry>,
    annotations: Vec<AnnotationEntry>,
    attributes: Vec<RawAttribute>,
    nest_members: Vec<String>,
    permitted_subclasses: Vec<String>,
    inner_classes: Vec<InnerClass>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
    suppressed: HashSet<String>,
    kept_bodies: HashSet<String>,
    sort_annotations: bool,
}

impl<'a, V: ClassVisitor> MemberFilter<'a, V> {
    /// Creates a filter forwarding to `next` and recording deletions in `deleted`.
    pub fn new(next: V, config: &'a AbiConfig, deleted: &'a mut DeletedClassNames) -> Self {
        MemberFilter {
            next,
            config,
            deleted,
            header: None,
            api_class: true,
            source: None,
            nest_host: None,
            outer_class: None,
            leading_annotations: Vec::new(),
            annotations: Vec::new(),
            attributes: Vec::new(),
            nest_members: Vec::new(),
            permitted_subclasses: Vec::new(),
            inner_classes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            suppressed: HashSet::new(),
            kept_bodies: HashSet::new(),
            sort_annotations: false,
        }
    }

    /// Returns `false` once the class is known not to be part of the API.
    ///
    /// Before `visit_end` this reflects what has been seen so far; afterwards it is final.
    #[must_use]
    pub fn is_api_class(&self) -> bool {
        self.api_class
            && self
                .header
                .as_ref()
                .map_or(true, |header| header.access.is_api())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AbiConfig {
        self.config
    }

    /// The deleted class names of the run.
    #[must_use]
    pub fn deleted(&self) -> &DeletedClassNames {
        self.deleted
    }

    /// Consumes the filter and returns the next stage.
    pub fn into_inner(self) -> V {
        self.next
    }

    /// Internal name of the class, once its header has been visited.
    pub(crate) fn class_name(&self) -> Option<&str> {
        self.header.as_ref().map(|header| header.name.as_str())
    }

    /// Removes the class from the output regardless of its access flags.
    pub(crate) fn mark_not_api(&mut self) {
        self.api_class = false;
    }

    /// Queues an annotation that is emitted before every other annotation.
    pub(crate) fn push_leading_annotation(&mut self, annotation: Annotation, visible: bool) {
        self.leading_annotations.push(AnnotationEntry {
            annotation,
            visible,
        });
    }

    /// Drops every field and method with one of these names.
    pub(crate) fn suppress_members(&mut self, names: impl IntoIterator<Item = String>) {
        self.suppressed.extend(names);
    }

    /// Keeps the bodies of methods with these names when body stripping is on.
    pub(crate) fn keep_bodies(&mut self, names: impl IntoIterator<Item = String>) {
        self.kept_bodies.extend(names);
    }

    /// Emits ordinary annotations sorted by descriptor.
    pub(crate) fn sort_annotations(&mut self) {
        self.sort_annotations = true;
    }

    fn strip_body(&self, method: &mut MethodInfo) -> Result<()> {
        if method.is_constructor() || method.code.is_none() || self.kept_bodies.contains(&method.name)
        {
            return Ok(());
        }
        method.code = Some(synthetic_code(method.access, &method.descriptor)?);
        Ok(())
    }
}

impl<V: ClassVisitor> ClassVisitor for MemberFilter<'_, V> {
    fn visit_header(&mut self, header: ClassHeader) -> Result<()> {
        self.header = Some(header);
        Ok(())
    }

    fn visit_source(&mut self, source: SourceInfo) -> Result<()> {
        if self.config.keep_source_debug_info {
            self.source = Some(source);
        }
        Ok(())
    }

    fn visit_nest_host(&mut self, host: String) -> Result<()> {
        self.nest_host = Some(host);
        Ok(())
    }

    fn visit_outer_class(&mut self, outer: OuterClass) -> Result<()> {
        self.outer_class = Some(outer);
        Ok(())
    }

    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()> {
        self.annotations.push(AnnotationEntry {
            annotation,
            visible,
        });
        Ok(())
    }

    fn visit_attribute(&mut self, attribute: RawAttribute) -> Result<()> {
        self.attributes.push(attribute);
        Ok(())
    }

    fn visit_nest_member(&mut self, member: String) -> Result<()> {
        self.nest_members.push(member);
        Ok(())
    }

    fn visit_permitted_subclass(&mut self, subclass: String) -> Result<()> {
        self.permitted_subclasses.push(subclass);
        Ok(())
    }

    fn visit_inner_class(&mut self, inner: InnerClass) -> Result<()> {
        self.inner_classes.push(inner);
        Ok(())
    }

    fn visit_field(&mut self, field: FieldInfo) -> Result<()> {
        if field.access.is_api() {
            self.fields.push(field);
        }
        Ok(())
    }

    fn visit_method(&mut self, method: MethodInfo) -> Result<()> {
        if !self.config.method_access_filter || method.access.is_api() {
            self.methods.push(method);
        }
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        let api = self.is_api_class();
        let Some(header) = self.header.take() else {
            return Err(malformed_error!("Class ended without a header"));
        };
        self.api_class = api;

        if !api {
            debug!("Deleting {}: no public API", header.name);
            self.deleted.insert(header.name);
            return Ok(());
        }

        let name = header.name.clone();
        self.next.visit_header(header)?;
        if let Some(source) = self.source.take() {
            self.next.visit_source(source)?;
        }
        if let Some(host) = self.nest_host.take() {
            self.next.visit_nest_host(host)?;
        }
        if let Some(outer) = self.outer_class.take() {
            self.next.visit_outer_class(outer)?;
        }

        let mut annotations = std::mem::take(&mut self.annotations);
        if self.sort_annotations {
            annotations.sort_by(|a, b| a.annotation.descriptor.cmp(&b.annotation.descriptor));
        }
        for entry in std::mem::take(&mut self.leading_annotations)
            .into_iter()
            .chain(annotations)
        {
            self.next.visit_annotation(entry.annotation, entry.visible)?;
        }
        for attribute in std::mem::take(&mut self.attributes) {
            self.next.visit_attribute(attribute)?;
        }

        for member in std::mem::take(&mut self.nest_members) {
            if !self.deleted.contains(&member) {
                self.next.visit_nest_member(member)?;
            }
        }
        for subclass in std::mem::take(&mut self.permitted_subclasses) {
            if !self.deleted.contains(&subclass) {
                self.next.visit_permitted_subclass(subclass)?;
            }
        }
        for inner in std::mem::take(&mut self.inner_classes) {
            if !self.deleted.contains(&inner.name) {
                self.next.visit_inner_class(inner)?;
            }
        }

        let mut fields = std::mem::take(&mut self.fields);
        fields.retain(|field| !self.suppressed.contains(&field.name));
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        for field in fields {
            self.next.visit_field(field)?;
        }

        let mut methods = std::mem::take(&mut self.methods);
        methods.retain(|method| !self.suppressed.contains(&method.name));
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        for mut method in methods {
            if self.config.body_stripping {
                self.strip_body(&mut method)?;
            }
            self.next.visit_method(method)?;
        }

        debug!("Keeping {}", name);
        self.next.visit_end()
    }
}
