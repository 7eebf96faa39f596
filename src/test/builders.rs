//! Class file assembly and event recording for tests.

use crate::{
    archive::ClassEntry,
    classfile::{
        access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
        annotation::Annotation,
        descriptor::synthetic_code,
        ClassHeader, ClassReader, ClassVisitor, ClassWriter, FieldInfo, InnerClass, MethodInfo,
        OuterClass, RawAttribute, ReadOptions, SourceInfo,
    },
    metadata::{MetadataHeader, METADATA_DESCRIPTOR},
    Result,
};

/// An annotation that is encoded when the class is built
enum PendingAnnotation {
    Plain(Annotation),
    Metadata(MetadataHeader),
}

/// A method body that is generated when the class is built
enum PendingCode {
    None,
    Synthetic,
    Raw(Vec<u8>),
}

/// Assembles class files by feeding events into a [`ClassWriter`].
pub struct ClassBuilder {
    header: ClassHeader,
    source: SourceInfo,
    nest_host: Option<String>,
    outer_class: Option<OuterClass>,
    annotations: Vec<(PendingAnnotation, bool)>,
    attributes: Vec<RawAttribute>,
    nest_members: Vec<String>,
    permitted_subclasses: Vec<String>,
    inner_classes: Vec<InnerClass>,
    fields: Vec<FieldInfo>,
    methods: Vec<(MethodInfo, PendingCode)>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`, class file version 52
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            header: ClassHeader {
                minor_version: 0,
                major_version: 52,
                access: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
                name: name.to_string(),
                super_name: Some("java/lang/Object".to_string()),
                interfaces: Vec::new(),
                signature: None,
            },
            source: SourceInfo::default(),
            nest_host: None,
            outer_class: None,
            annotations: Vec::new(),
            attributes: Vec::new(),
            nest_members: Vec::new(),
            permitted_subclasses: Vec::new(),
            inner_classes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A class without public or protected access
    pub fn package_private(name: &str) -> Self {
        Self::new(name).access(ClassAccessFlags::SUPER)
    }

    pub fn access(mut self, access: ClassAccessFlags) -> Self {
        self.header.access = access;
        self
    }

    pub fn super_name(mut self, name: &str) -> Self {
        self.header.super_name = Some(name.to_string());
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.header.interfaces.push(name.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.header.signature = Some(signature.to_string());
        self
    }

    pub fn source_file(mut self, file: &str) -> Self {
        self.source.file = Some(file.to_string());
        self
    }

    pub fn source_debug(mut self, debug: &[u8]) -> Self {
        self.source.debug = Some(debug.to_vec());
        self
    }

    pub fn nest_host(mut self, host: &str) -> Self {
        self.nest_host = Some(host.to_string());
        self
    }

    pub fn outer_class(mut self, owner: &str) -> Self {
        self.outer_class = Some(OuterClass {
            owner: owner.to_string(),
            method_name: None,
            method_descriptor: None,
        });
        self
    }

    pub fn annotation(mut self, annotation: Annotation, visible: bool) -> Self {
        self.annotations
            .push((PendingAnnotation::Plain(annotation), visible));
        self
    }

    /// Adds `header` as a runtime-visible `@kotlin.Metadata`
    pub fn kotlin_metadata(mut self, header: &MetadataHeader) -> Self {
        self.annotations
            .push((PendingAnnotation::Metadata(header.clone()), true));
        self
    }

    pub fn attribute(mut self, name: &str, data: &[u8]) -> Self {
        self.attributes.push(RawAttribute {
            name: name.to_string(),
            data: data.to_vec(),
        });
        self
    }

    pub fn nest_member(mut self, name: &str) -> Self {
        self.nest_members.push(name.to_string());
        self
    }

    pub fn permitted_subclass(mut self, name: &str) -> Self {
        self.permitted_subclasses.push(name.to_string());
        self
    }

    pub fn inner_class(
        mut self,
        name: &str,
        outer: Option<&str>,
        inner: Option<&str>,
        access: u16,
    ) -> Self {
        self.inner_classes.push(InnerClass {
            name: name.to_string(),
            outer_name: outer.map(str::to_string),
            inner_name: inner.map(str::to_string),
            access: ClassAccessFlags::from_bits_retain(access),
        });
        self
    }

    /// Declares `name` as a private static member class, both as nest member and inner class
    pub fn member_class(self, name: &str, simple_name: &str) -> Self {
        let outer = self.header.name.clone();
        self.nest_member(name).inner_class(
            name,
            Some(&outer),
            Some(simple_name),
            (ClassAccessFlags::PRIVATE | ClassAccessFlags::STATIC).bits(),
        )
    }

    pub fn field(mut self, access: FieldAccessFlags, name: &str, descriptor: &str) -> Self {
        self.fields.push(FieldInfo {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            annotations: Vec::new(),
            attributes: Vec::new(),
        });
        self
    }

    fn push_method(
        mut self,
        access: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: PendingCode,
    ) -> Self {
        let method = MethodInfo {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            exceptions: Vec::new(),
            code: None,
            annotations: Vec::new(),
            attributes: Vec::new(),
        };
        self.methods.push((method, code));
        self
    }

    /// Adds a method without a `Code` attribute
    pub fn method(self, access: MethodAccessFlags, name: &str, descriptor: &str) -> Self {
        self.push_method(access, name, descriptor, PendingCode::None)
    }

    /// Adds a method whose body returns a default value
    pub fn method_with_code(self, access: MethodAccessFlags, name: &str, descriptor: &str) -> Self {
        self.push_method(access, name, descriptor, PendingCode::Synthetic)
    }

    /// Adds a method with an explicit `Code` payload
    pub fn method_with_body(
        self,
        access: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: Vec<u8>,
    ) -> Self {
        self.push_method(access, name, descriptor, PendingCode::Raw(code))
    }

    /// Writes the class file.
    ///
    /// # Errors
    /// Returns an error if a metadata header or a method descriptor cannot be encoded.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut writer = ClassWriter::new();
        writer.visit_header(self.header)?;
        if !self.source.is_empty() {
            writer.visit_source(self.source)?;
        }
        if let Some(host) = self.nest_host {
            writer.visit_nest_host(host)?;
        }
        if let Some(outer) = self.outer_class {
            writer.visit_outer_class(outer)?;
        }
        for (pending, visible) in self.annotations {
            let annotation = match pending {
                PendingAnnotation::Plain(annotation) => annotation,
                PendingAnnotation::Metadata(header) => header.to_annotation()?,
            };
            writer.visit_annotation(annotation, visible)?;
        }
        for attribute in self.attributes {
            writer.visit_attribute(attribute)?;
        }
        for member in self.nest_members {
            writer.visit_nest_member(member)?;
        }
        for subclass in self.permitted_subclasses {
            writer.visit_permitted_subclass(subclass)?;
        }
        for inner in self.inner_classes {
            writer.visit_inner_class(inner)?;
        }
        for field in self.fields {
            writer.visit_field(field)?;
        }
        for (mut method, code) in self.methods {
            method.code = match code {
                PendingCode::None => None,
                PendingCode::Synthetic => Some(synthetic_code(method.access, &method.descriptor)?),
                PendingCode::Raw(code) => Some(code),
            };
            writer.visit_method(method)?;
        }
        writer.visit_end()?;
        writer
            .into_bytes()
            .ok_or_else(|| malformed_error!("Class writer produced no output"))
    }

    /// Builds the class as a jar entry named after the class.
    ///
    /// # Errors
    /// See [`ClassBuilder::build`].
    pub fn entry(self) -> Result<ClassEntry> {
        let name = format!("{}.class", self.header.name);
        Ok(ClassEntry::new(name, self.build()?))
    }
}

/// Records every event it receives
#[derive(Default, Debug)]
pub struct Recorder {
    pub header: Option<ClassHeader>,
    pub source: Option<SourceInfo>,
    pub nest_host: Option<String>,
    pub outer_class: Option<OuterClass>,
    pub annotations: Vec<(Annotation, bool)>,
    pub attributes: Vec<RawAttribute>,
    pub nest_members: Vec<String>,
    pub permitted_subclasses: Vec<String>,
    pub inner_classes: Vec<InnerClass>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub ended: bool,
}

impl Recorder {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|method| method.name.as_str()).collect()
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn annotation_descriptors(&self) -> Vec<&str> {
        self.annotations
            .iter()
            .map(|(annotation, _)| annotation.descriptor.as_str())
            .collect()
    }

    /// Decodes the `@kotlin.Metadata` annotation, if present.
    ///
    /// # Errors
    /// Returns an error if the annotation does not decode.
    pub fn kotlin_metadata(&self) -> Result<Option<MetadataHeader>> {
        self.annotations
            .iter()
            .find(|(annotation, _)| annotation.descriptor == METADATA_DESCRIPTOR)
            .map(|(annotation, _)| MetadataHeader::from_annotation(annotation))
            .transpose()
    }
}

impl ClassVisitor for Recorder {
    fn visit_header(&mut self, header: ClassHeader) -> Result<()> {
        self.header = Some(header);
        Ok(())
    }

    fn visit_source(&mut self, source: SourceInfo) -> Result<()> {
        self.source = Some(source);
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
        self.annotations.push((annotation, visible));
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
        self.fields.push(field);
        Ok(())
    }

    fn visit_method(&mut self, method: MethodInfo) -> Result<()> {
        self.methods.push(method);
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}

/// Decodes `bytes` into a [`Recorder`].
///
/// # Errors
/// Returns an error if `bytes` is not a valid class file.
pub fn read_class(bytes: &[u8]) -> Result<Recorder> {
    let reader = ClassReader::new(bytes)?;
    let mut recorder = Recorder::default();
    reader.accept(&mut recorder, ReadOptions::default())?;
    Ok(recorder)
}
