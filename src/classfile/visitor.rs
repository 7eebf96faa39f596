//! The structural event interface between readers, filters and writers.

use crate::{
    classfile::{
        annotation::Annotation,
        types::{ClassHeader, FieldInfo, InnerClass, MethodInfo, OuterClass, RawAttribute, SourceInfo},
    },
    Result,
};

/// Receives one class as a sequence of structural events.
///
/// [`crate::ClassReader::accept`] calls the methods in declaration order: `visit_header` first,
/// then `visit_source`, `visit_nest_host`, `visit_outer_class`, every `visit_annotation`, every
/// `visit_attribute`, `visit_nest_member`, `visit_permitted_subclass`, `visit_inner_class`,
/// `visit_field`, `visit_method` and finally `visit_end`. Events for absent structures are not
/// delivered. Every method defaults to ignoring its event, so a stage only implements what it
/// acts on.
///
/// Stages are chained by ownership: a filter holds the next visitor and forwards the events it
/// keeps. The blanket implementation for `&mut V` lets a caller keep access to the final stage
/// (usually a [`crate::ClassWriter`]) after the pipeline has run.
pub trait ClassVisitor {
    /// The class declaration.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_header(&mut self, _header: ClassHeader) -> Result<()> {
        Ok(())
    }

    /// `SourceFile` / `SourceDebugExtension`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_source(&mut self, _source: SourceInfo) -> Result<()> {
        Ok(())
    }

    /// `NestHost`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_nest_host(&mut self, _host: String) -> Result<()> {
        Ok(())
    }

    /// `EnclosingMethod`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_outer_class(&mut self, _outer: OuterClass) -> Result<()> {
        Ok(())
    }

    /// A class annotation; `visible` selects runtime-visible retention.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_annotation(&mut self, _annotation: Annotation, _visible: bool) -> Result<()> {
        Ok(())
    }

    /// A class attribute without dedicated event.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_attribute(&mut self, _attribute: RawAttribute) -> Result<()> {
        Ok(())
    }

    /// One entry of `NestMembers`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_nest_member(&mut self, _member: String) -> Result<()> {
        Ok(())
    }

    /// One entry of `PermittedSubclasses`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_permitted_subclass(&mut self, _subclass: String) -> Result<()> {
        Ok(())
    }

    /// One entry of `InnerClasses`.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_inner_class(&mut self, _inner: InnerClass) -> Result<()> {
        Ok(())
    }

    /// A field declaration.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_field(&mut self, _field: FieldInfo) -> Result<()> {
        Ok(())
    }

    /// A method declaration.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_method(&mut self, _method: MethodInfo) -> Result<()> {
        Ok(())
    }

    /// The end of the class.
    ///
    /// # Errors
    /// Implementations may fail; the reader stops at the first error.
    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<V: ClassVisitor + ?Sized> ClassVisitor for &mut V {
    fn visit_header(&mut self, header: ClassHeader) -> Result<()> {
        (**self).visit_header(header)
    }

    fn visit_source(&mut self, source: SourceInfo) -> Result<()> {
        (**self).visit_source(source)
    }

    fn visit_nest_host(&mut self, host: String) -> Result<()> {
        (**self).visit_nest_host(host)
    }

    fn visit_outer_class(&mut self, outer: OuterClass) -> Result<()> {
        (**self).visit_outer_class(outer)
    }

    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()> {
        (**self).visit_annotation(annotation, visible)
    }

    fn visit_attribute(&mut self, attribute: RawAttribute) -> Result<()> {
        (**self).visit_attribute(attribute)
    }

    fn visit_nest_member(&mut self, member: String) -> Result<()> {
        (**self).visit_nest_member(member)
    }

    fn visit_permitted_subclass(&mut self, subclass: String) -> Result<()> {
        (**self).visit_permitted_subclass(subclass)
    }

    fn visit_inner_class(&mut self, inner: InnerClass) -> Result<()> {
        (**self).visit_inner_class(inner)
    }

    fn visit_field(&mut self, field: FieldInfo) -> Result<()> {
        (**self).visit_field(field)
    }

    fn visit_method(&mut self, method: MethodInfo) -> Result<()> {
        (**self).visit_method(method)
    }

    fn visit_end(&mut self) -> Result<()> {
        (**self).visit_end()
    }
}

/// A visitor that drops every event.
///
/// Used as the final stage when only the side effects of a filter are wanted, e.g. to classify
/// a class without producing output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ClassVisitor for Discard {}
