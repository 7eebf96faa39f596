//! Encoding visitor events back into a class file.
//!
//! [`ClassWriter`] is a [`ClassVisitor`] that serializes what it receives. Members are encoded as
//! they arrive and the class is assembled on `visit_end`. Attributes are written in a fixed
//! order (signature, source, nest host, enclosing method, annotations, opaque attributes,
//! nest members, permitted subclasses, inner classes), so feeding the writer the events of a
//! class it produced yields the same bytes again.

use crate::{
    classfile::{
        annotation::{checked_count, Annotation},
        pool::ConstantPool,
        reader::ClassReader,
        types::{
            AnnotationEntry, ClassHeader, FieldInfo, InnerClass, MethodInfo, OuterClass,
            RawAttribute, SourceInfo,
        },
        visitor::ClassVisitor,
        MAGIC,
    },
    file::io::{push_be, write_be_at},
    Result,
};

/// Serializes visitor events into class file bytes.
#[derive(Debug, Default)]
pub struct ClassWriter {
    pool: ConstantPool,
    header: Option<ClassHeader>,
    source: SourceInfo,
    nest_host: Option<String>,
    outer_class: Option<OuterClass>,
    annotations: Vec<AnnotationEntry>,
    attributes: Vec<RawAttribute>,
    nest_members: Vec<String>,
    permitted_subclasses: Vec<String>,
    inner_classes: Vec<InnerClass>,
    field_count: u16,
    fields: Vec<u8>,
    method_count: u16,
    methods: Vec<u8>,
    bytes: Option<Vec<u8>>,
}

impl ClassWriter {
    /// Creates a writer with an empty constant pool.
    #[must_use]
    pub fn new() -> ClassWriter {
        ClassWriter::default()
    }

    /// Creates a writer that starts from a copy of `reader`'s constant pool.
    ///
    /// Opaque attributes delivered by that reader refer to pool indices; starting from the same
    /// pool keeps them valid.
    #[must_use]
    pub fn from_reader(reader: &ClassReader) -> ClassWriter {
        ClassWriter {
            pool: reader.pool().clone(),
            ..ClassWriter::default()
        }
    }

    /// Returns the encoded class, or `None` if no complete class was visited.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.bytes
    }

    fn write_attribute(
        &mut self,
        out: &mut Vec<u8>,
        name: &str,
        body: impl FnOnce(&mut ConstantPool, &mut Vec<u8>) -> Result<()>,
    ) -> Result<()> {
        push_be(out, self.pool.intern_utf8(name)?);
        let length_at = out.len();
        push_be(out, 0u32);
        body(&mut self.pool, out)?;

        let length = u32::try_from(out.len() - length_at - 4)
            .map_err(|_| malformed_error!("Attribute {} exceeds 4 GiB", name))?;
        let mut offset = length_at;
        write_be_at(out, &mut offset, length)
    }

    fn write_utf8_attribute(&mut self, out: &mut Vec<u8>, name: &str, value: &str) -> Result<()> {
        self.write_attribute(out, name, |pool, out| {
            push_be(out, pool.intern_utf8(value)?);
            Ok(())
        })
    }

    fn write_class_list(&mut self, out: &mut Vec<u8>, name: &str, classes: &[String]) -> Result<()> {
        self.write_attribute(out, name, |pool, out| {
            push_be(out, checked_count(classes.len())?);
            for class in classes {
                push_be(out, pool.intern_class(class)?);
            }
            Ok(())
        })
    }

    /// Writes the `Runtime[In]VisibleAnnotations` attributes; returns how many were written.
    fn write_annotations(&mut self, out: &mut Vec<u8>, annotations: &[AnnotationEntry]) -> Result<u16> {
        let mut written = 0;
        for (name, visible) in [
            ("RuntimeVisibleAnnotations", true),
            ("RuntimeInvisibleAnnotations", false),
        ] {
            let selected: Vec<&Annotation> = annotations
                .iter()
                .filter(|entry| entry.visible == visible)
                .map(|entry| &entry.annotation)
                .collect();
            if selected.is_empty() {
                continue;
            }

            self.write_attribute(out, name, |pool, out| {
                push_be(out, checked_count(selected.len())?);
                for annotation in selected {
                    annotation.write(pool, out)?;
                }
                Ok(())
            })?;
            written += 1;
        }
        Ok(written)
    }

    fn write_raw(&mut self, out: &mut Vec<u8>, attribute: &RawAttribute) -> Result<()> {
        self.write_attribute(out, &attribute.name, |_, out| {
            out.extend_from_slice(&attribute.data);
            Ok(())
        })
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let Some(header) = self.header.take() else {
            return Err(malformed_error!("visit_end without a class header"));
        };

        let access = header.access.bits();
        let this_class = self.pool.intern_class(&header.name)?;
        let super_class = match &header.super_name {
            Some(name) => self.pool.intern_class(name)?,
            None => 0,
        };
        let mut interfaces = Vec::with_capacity(header.interfaces.len());
        for interface in &header.interfaces {
            interfaces.push(self.pool.intern_class(interface)?);
        }

        let mut attributes = Vec::new();
        let mut attribute_count = 0u16;

        if let Some(signature) = &header.signature {
            self.write_utf8_attribute(&mut attributes, "Signature", signature)?;
            attribute_count += 1;
        }
        let source = std::mem::take(&mut self.source);
        if let Some(file) = &source.file {
            self.write_utf8_attribute(&mut attributes, "SourceFile", file)?;
            attribute_count += 1;
        }
        if let Some(debug) = &source.debug {
            self.write_attribute(&mut attributes, "SourceDebugExtension", |_, out| {
                out.extend_from_slice(debug);
                Ok(())
            })?;
            attribute_count += 1;
        }
        if let Some(host) = self.nest_host.take() {
            self.write_attribute(&mut attributes, "NestHost", |pool, out| {
                push_be(out, pool.intern_class(&host)?);
                Ok(())
            })?;
            attribute_count += 1;
        }
        if let Some(outer) = self.outer_class.take() {
            self.write_attribute(&mut attributes, "EnclosingMethod", |pool, out| {
                push_be(out, pool.intern_class(&outer.owner)?);
                let method = match (&outer.method_name, &outer.method_descriptor) {
                    (Some(name), Some(descriptor)) => pool.intern_name_and_type(name, descriptor)?,
                    _ => 0,
                };
                push_be(out, method);
                Ok(())
            })?;
            attribute_count += 1;
        }

        let annotations = std::mem::take(&mut self.annotations);
        attribute_count += self.write_annotations(&mut attributes, &annotations)?;

        for attribute in std::mem::take(&mut self.attributes) {
            self.write_raw(&mut attributes, &attribute)?;
            attribute_count += 1;
        }

        let nest_members = std::mem::take(&mut self.nest_members);
        if !nest_members.is_empty() {
            self.write_class_list(&mut attributes, "NestMembers", &nest_members)?;
            attribute_count += 1;
        }
        let permitted = std::mem::take(&mut self.permitted_subclasses);
        if !permitted.is_empty() {
            self.write_class_list(&mut attributes, "PermittedSubclasses", &permitted)?;
            attribute_count += 1;
        }
        let inner_classes = std::mem::take(&mut self.inner_classes);
        if !inner_classes.is_empty() {
            self.write_attribute(&mut attributes, "InnerClasses", |pool, out| {
                push_be(out, checked_count(inner_classes.len())?);
                for inner in &inner_classes {
                    push_be(out, pool.intern_class(&inner.name)?);
                    push_be(
                        out,
                        match &inner.outer_name {
                            Some(outer) => pool.intern_class(outer)?,
                            None => 0,
                        },
                    );
                    push_be(
                        out,
                        match &inner.inner_name {
                            Some(simple) => pool.intern_utf8(simple)?,
                            None => 0,
                        },
                    );
                    push_be(out, inner.access.bits());
                }
                Ok(())
            })?;
            attribute_count += 1;
        }

        let mut out = Vec::with_capacity(
            self.fields.len() + self.methods.len() + attributes.len() + 1024,
        );
        push_be(&mut out, MAGIC);
        push_be(&mut out, header.minor_version);
        push_be(&mut out, header.major_version);
        self.pool.write(&mut out);
        push_be(&mut out, access);
        push_be(&mut out, this_class);
        push_be(&mut out, super_class);
        push_be(&mut out, checked_count(interfaces.len())?);
        for interface in interfaces {
            push_be(&mut out, interface);
        }
        push_be(&mut out, self.field_count);
        out.extend_from_slice(&self.fields);
        push_be(&mut out, self.method_count);
        out.extend_from_slice(&self.methods);
        push_be(&mut out, attribute_count);
        out.extend_from_slice(&attributes);

        Ok(out)
    }
}

impl ClassVisitor for ClassWriter {
    fn visit_header(&mut self, header: ClassHeader) -> Result<()> {
        self.header = Some(header);
        Ok(())
    }

    fn visit_source(&mut self, source: SourceInfo) -> Result<()> {
        self.source = source;
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
        let mut out = std::mem::take(&mut self.fields);
        push_be(&mut out, field.access.bits());
        push_be(&mut out, self.pool.intern_utf8(&field.name)?);
        push_be(&mut out, self.pool.intern_utf8(&field.descriptor)?);

        let count_at = out.len();
        push_be(&mut out, 0u16);
        let mut count = 0u16;
        if let Some(signature) = &field.signature {
            self.write_utf8_attribute(&mut out, "Signature", signature)?;
            count += 1;
        }
        count += self.write_annotations(&mut out, &field.annotations)?;
        for attribute in &field.attributes {
            self.write_raw(&mut out, attribute)?;
            count += 1;
        }
        let mut offset = count_at;
        write_be_at(&mut out, &mut offset, count)?;

        self.fields = out;
        self.field_count = self
            .field_count
            .checked_add(1)
            .ok_or_else(|| malformed_error!("More than 65535 fields"))?;
        Ok(())
    }

    fn visit_method(&mut self, method: MethodInfo) -> Result<()> {
        let mut out = std::mem::take(&mut self.methods);
        push_be(&mut out, method.access.bits());
        push_be(&mut out, self.pool.intern_utf8(&method.name)?);
        push_be(&mut out, self.pool.intern_utf8(&method.descriptor)?);

        let count_at = out.len();
        push_be(&mut out, 0u16);
        let mut count = 0u16;
        if let Some(signature) = &method.signature {
            self.write_utf8_attribute(&mut out, "Signature", signature)?;
            count += 1;
        }
        if let Some(code) = &method.code {
            self.write_attribute(&mut out, "Code", |_, out| {
                out.extend_from_slice(code);
                Ok(())
            })?;
            count += 1;
        }
        if !method.exceptions.is_empty() {
            self.write_class_list(&mut out, "Exceptions", &method.exceptions)?;
            count += 1;
        }
        count += self.write_annotations(&mut out, &method.annotations)?;
        for attribute in &method.attributes {
            self.write_raw(&mut out, attribute)?;
            count += 1;
        }
        let mut offset = count_at;
        write_be_at(&mut out, &mut offset, count)?;

        self.methods = out;
        self.method_count = self
            .method_count
            .checked_add(1)
            .ok_or_else(|| malformed_error!("More than 65535 methods"))?;
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        let bytes = self.finish()?;
        self.bytes = Some(bytes);
        Ok(())
    }
}
