//! Decoding class files into visitor events.
//!
//! [`ClassReader::new`] validates the magic, parses the constant pool and the fixed part of the
//! class declaration. [`ClassReader::accept`] decodes the members and attributes and delivers
//! them to a [`ClassVisitor`] in the order documented on that trait.
//!
//! # Examples
//!
//! ```rust,ignore
//! use classabi::{ClassReader, ClassWriter, ReadOptions};
//!
//! let reader = ClassReader::new(&bytes)?;
//! let mut writer = ClassWriter::from_reader(&reader);
//! reader.accept(&mut writer, ReadOptions::default())?;
//! let copy = writer.into_bytes();
//! ```

use crate::{
    classfile::{
        access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
        annotation::Annotation,
        pool::{Constant, ConstantPool},
        types::{
            AnnotationEntry, ClassHeader, FieldInfo, InnerClass, MethodInfo, OuterClass,
            RawAttribute, SourceInfo,
        },
        visitor::ClassVisitor,
        MAGIC,
    },
    file::parser::Parser,
    Error::{Empty, NotSupported},
    Result,
};

/// Options for [`ClassReader::accept`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Omit method `Code` attributes; [`MethodInfo::code`] is always `None`
    pub skip_code: bool,
}

/// A parsed class file that can replay itself as visitor events.
#[derive(Debug, Clone)]
pub struct ClassReader<'a> {
    data: &'a [u8],
    pool: ConstantPool,
    minor_version: u16,
    major_version: u16,
    access: ClassAccessFlags,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    /// Offset of `fields_count`
    members_offset: usize,
}

/// Attributes shared by fields and methods.
#[derive(Default)]
struct MemberAttributes {
    signature: Option<String>,
    annotations: Vec<AnnotationEntry>,
    exceptions: Vec<String>,
    code: Option<Vec<u8>>,
    attributes: Vec<RawAttribute>,
}

/// Class-level attributes, decoded before any event is delivered.
#[derive(Default)]
struct ClassAttributes {
    signature: Option<String>,
    source: SourceInfo,
    nest_host: Option<String>,
    outer_class: Option<OuterClass>,
    annotations: Vec<AnnotationEntry>,
    attributes: Vec<RawAttribute>,
    nest_members: Vec<String>,
    permitted_subclasses: Vec<String>,
    inner_classes: Vec<InnerClass>,
}

impl<'a> ClassReader<'a> {
    /// Parses the constant pool and class declaration of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::NotSupported`] if the
    /// magic is not `0xCAFEBABE`, and [`crate::Error::Malformed`] or
    /// [`crate::Error::OutOfBounds`] for corrupt or truncated input.
    pub fn new(data: &'a [u8]) -> Result<ClassReader<'a>> {
        if data.is_empty() {
            return Err(Empty);
        }

        let mut parser = Parser::new(data);
        if parser.read_be::<u32>()? != MAGIC {
            return Err(NotSupported);
        }

        let minor_version = parser.read_be::<u16>()?;
        let major_version = parser.read_be::<u16>()?;
        let pool = ConstantPool::parse(&mut parser)?;

        let access = ClassAccessFlags::from_bits_retain(parser.read_be::<u16>()?);
        let name = pool.class_name(parser.read_be::<u16>()?)?;
        let super_name = pool.optional_class_name(parser.read_be::<u16>()?)?;
        let interface_count = parser.read_be::<u16>()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(parser.read_be::<u16>()?)?);
        }

        Ok(ClassReader {
            data,
            pool,
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            members_offset: parser.pos(),
        })
    }

    /// Internal name of the class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.name
    }

    /// Access flags of the class declaration.
    #[must_use]
    pub fn access(&self) -> ClassAccessFlags {
        self.access
    }

    /// The constant pool as read.
    #[must_use]
    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }

    /// Decodes the class and delivers it to `visitor`.
    ///
    /// Everything is decoded before the first event, so a corrupt class produces an error
    /// without any partial output reaching the visitor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for corrupt input,
    /// or the first error returned by `visitor`.
    pub fn accept<V: ClassVisitor + ?Sized>(&self, visitor: &mut V, options: ReadOptions) -> Result<()> {
        let mut parser = Parser::new(self.data);
        parser.seek(self.members_offset)?;

        let field_count = parser.read_be::<u16>()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(self.read_field(&mut parser)?);
        }

        let method_count = parser.read_be::<u16>()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(self.read_method(&mut parser, options)?);
        }

        let class = self.read_class_attributes(&mut parser)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after class {}",
                parser.remaining().len(),
                self.name
            ));
        }

        visitor.visit_header(ClassHeader {
            minor_version: self.minor_version,
            major_version: self.major_version,
            access: self.access,
            name: self.name.clone(),
            super_name: self.super_name.clone(),
            interfaces: self.interfaces.clone(),
            signature: class.signature,
        })?;
        if !class.source.is_empty() {
            visitor.visit_source(class.source)?;
        }
        if let Some(host) = class.nest_host {
            visitor.visit_nest_host(host)?;
        }
        if let Some(outer) = class.outer_class {
            visitor.visit_outer_class(outer)?;
        }
        for entry in class.annotations {
            visitor.visit_annotation(entry.annotation, entry.visible)?;
        }
        for attribute in class.attributes {
            visitor.visit_attribute(attribute)?;
        }
        for member in class.nest_members {
            visitor.visit_nest_member(member)?;
        }
        for subclass in class.permitted_subclasses {
            visitor.visit_permitted_subclass(subclass)?;
        }
        for inner in class.inner_classes {
            visitor.visit_inner_class(inner)?;
        }
        for field in fields {
            visitor.visit_field(field)?;
        }
        for method in methods {
            visitor.visit_method(method)?;
        }
        visitor.visit_end()
    }

    fn read_attribute(&self, parser: &mut Parser<'a>) -> Result<(String, &'a [u8])> {
        let name = self.pool.utf8(parser.read_be::<u16>()?)?;
        let len = parser.read_be::<u32>()? as usize;
        Ok((name, parser.read_bytes(len)?))
    }

    fn read_member_attributes(
        &self,
        parser: &mut Parser<'a>,
        options: ReadOptions,
    ) -> Result<MemberAttributes> {
        let mut member = MemberAttributes::default();
        let count = parser.read_be::<u16>()?;
        for _ in 0..count {
            let (name, data) = self.read_attribute(parser)?;
            match name.as_str() {
                "Signature" => member.signature = Some(self.utf8_at(data)?),
                "RuntimeVisibleAnnotations" => self.read_annotations(data, true, &mut member.annotations)?,
                "RuntimeInvisibleAnnotations" => {
                    self.read_annotations(data, false, &mut member.annotations)?;
                }
                "Exceptions" => member.exceptions = self.class_list(data)?,
                "Code" => {
                    if !options.skip_code {
                        member.code = Some(data.to_vec());
                    }
                }
                _ => member.attributes.push(RawAttribute {
                    name,
                    data: data.to_vec(),
                }),
            }
        }
        Ok(member)
    }

    fn read_field(&self, parser: &mut Parser<'a>) -> Result<FieldInfo> {
        let access = FieldAccessFlags::from_bits_retain(parser.read_be::<u16>()?);
        let name = self.pool.utf8(parser.read_be::<u16>()?)?;
        let descriptor = self.pool.utf8(parser.read_be::<u16>()?)?;
        let member = self.read_member_attributes(parser, ReadOptions::default())?;

        Ok(FieldInfo {
            access,
            name,
            descriptor,
            signature: member.signature,
            annotations: member.annotations,
            attributes: member.attributes,
        })
    }

    fn read_method(&self, parser: &mut Parser<'a>, options: ReadOptions) -> Result<MethodInfo> {
        let access = MethodAccessFlags::from_bits_retain(parser.read_be::<u16>()?);
        let name = self.pool.utf8(parser.read_be::<u16>()?)?;
        let descriptor = self.pool.utf8(parser.read_be::<u16>()?)?;
        let member = self.read_member_attributes(parser, options)?;

        Ok(MethodInfo {
            access,
            name,
            descriptor,
            signature: member.signature,
            exceptions: member.exceptions,
            code: member.code,
            annotations: member.annotations,
            attributes: member.attributes,
        })
    }

    fn read_class_attributes(&self, parser: &mut Parser<'a>) -> Result<ClassAttributes> {
        let mut class = ClassAttributes::default();
        let count = parser.read_be::<u16>()?;
        for _ in 0..count {
            let (name, data) = self.read_attribute(parser)?;
            match name.as_str() {
                "Signature" => class.signature = Some(self.utf8_at(data)?),
                "SourceFile" => class.source.file = Some(self.utf8_at(data)?),
                "SourceDebugExtension" => class.source.debug = Some(data.to_vec()),
                "NestHost" => {
                    let mut attribute = Parser::new(data);
                    class.nest_host = Some(self.pool.class_name(attribute.read_be::<u16>()?)?);
                }
                "EnclosingMethod" => class.outer_class = Some(self.read_enclosing_method(data)?),
                "RuntimeVisibleAnnotations" => self.read_annotations(data, true, &mut class.annotations)?,
                "RuntimeInvisibleAnnotations" => {
                    self.read_annotations(data, false, &mut class.annotations)?;
                }
                "NestMembers" => class.nest_members = self.class_list(data)?,
                "PermittedSubclasses" => class.permitted_subclasses = self.class_list(data)?,
                "InnerClasses" => class.inner_classes = self.read_inner_classes(data)?,
                _ => class.attributes.push(RawAttribute {
                    name,
                    data: data.to_vec(),
                }),
            }
        }
        Ok(class)
    }

    fn utf8_at(&self, data: &[u8]) -> Result<String> {
        let mut parser = Parser::new(data);
        self.pool.utf8(parser.read_be::<u16>()?)
    }

    fn read_annotations(
        &self,
        data: &[u8],
        visible: bool,
        into: &mut Vec<AnnotationEntry>,
    ) -> Result<()> {
        for annotation in Annotation::parse_list(data, &self.pool)? {
            into.push(AnnotationEntry {
                annotation,
                visible,
            });
        }
        Ok(())
    }

    fn class_list(&self, data: &[u8]) -> Result<Vec<String>> {
        let mut parser = Parser::new(data);
        let count = parser.read_be::<u16>()?;
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            names.push(self.pool.class_name(parser.read_be::<u16>()?)?);
        }
        Ok(names)
    }

    fn read_enclosing_method(&self, data: &[u8]) -> Result<OuterClass> {
        let mut parser = Parser::new(data);
        let owner = self.pool.class_name(parser.read_be::<u16>()?)?;
        let method = parser.read_be::<u16>()?;

        let (method_name, method_descriptor) = if method == 0 {
            (None, None)
        } else {
            match self.pool.get(method)? {
                Constant::NameAndType { name, descriptor } => {
                    (Some(self.pool.utf8(*name)?), Some(self.pool.utf8(*descriptor)?))
                }
                other => {
                    return Err(malformed_error!(
                        "EnclosingMethod expects NameAndType at {}, found {:?}",
                        method,
                        other
                    ))
                }
            }
        };

        Ok(OuterClass {
            owner,
            method_name,
            method_descriptor,
        })
    }

    fn read_inner_classes(&self, data: &[u8]) -> Result<Vec<InnerClass>> {
        let mut parser = Parser::new(data);
        let count = parser.read_be::<u16>()?;
        let mut inner_classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            inner_classes.push(InnerClass {
                name: self.pool.class_name(parser.read_be::<u16>()?)?,
                outer_name: self.pool.optional_class_name(parser.read_be::<u16>()?)?,
                inner_name: self.pool.optional_utf8(parser.read_be::<u16>()?)?,
                access: ClassAccessFlags::from_bits_retain(parser.read_be::<u16>()?),
            });
        }
        Ok(inner_classes)
    }
}
