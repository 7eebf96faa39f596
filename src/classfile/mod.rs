//! A structural-event codec for JVM class files.
//!
//! This module reads a class file into a sequence of events and writes such a sequence back out.
//! It covers exactly what declaration-level filtering needs: the class declaration, its
//! annotations and cross-reference tables (`NestMembers`, `PermittedSubclasses`,
//! `InnerClasses`), and fields and methods with their annotations. Everything else (method
//! bodies, stack maps, bootstrap methods, records, modules) travels as opaque
//! [`RawAttribute`] payloads.
//!
//! # Architecture
//!
//! ```text
//! bytes ──► ClassReader ──events──► [filter stages] ──events──► ClassWriter ──► bytes
//!                │                                                   ▲
//!                └──────────────── ConstantPool (copied) ────────────┘
//! ```
//!
//! The writer starts from the reader's constant pool, so opaque payloads remain valid and
//! constants that are referenced again are found instead of duplicated.
//!
//! # Key Components
//!
//! - [`ClassReader`] / [`ReadOptions`] - Decoding and event replay
//! - [`ClassWriter`] - Event serialization
//! - [`ClassVisitor`] / [`Discard`] - The event interface and a null sink
//! - [`pool::ConstantPool`] - Append-only constant pool with lookup
//! - [`annotation`] - Materialized annotations and the annotation event interface
//! - [`access`] - Access flag sets
//! - [`descriptor`] - Method descriptor shapes and synthetic bodies

pub mod access;
pub mod annotation;
pub mod descriptor;
pub mod mutf8;
pub mod pool;
mod reader;
mod types;
mod visitor;
mod writer;

pub use reader::{ClassReader, ReadOptions};
pub use types::{
    AnnotationEntry, ClassHeader, FieldInfo, InnerClass, MethodInfo, OuterClass, RawAttribute,
    SourceInfo,
};
pub use visitor::{ClassVisitor, Discard};
pub use writer::ClassWriter;

/// The first four bytes of every class file.
pub const MAGIC: u32 = 0xCAFE_BABE;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::{
            access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
            annotation::{Annotation, ElementValue},
        },
        test::{ClassBuilder, Recorder},
        Error,
    };

    fn rich_class() -> Vec<u8> {
        ClassBuilder::new("com/x/Outer")
            .super_name("java/lang/Object")
            .interface("java/io/Serializable")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .source_file("Outer.kt")
            .source_debug(b"SMAP\nOuter.kt\n")
            .annotation(
                Annotation {
                    descriptor: "Lcom/x/Marker;".to_string(),
                    elements: vec![("value".to_string(), ElementValue::Int(1))],
                },
                true,
            )
            .annotation(Annotation::new("Lcom/x/Hidden;"), false)
            .attribute("Custom", &[1, 2, 3])
            .nest_member("com/x/Outer$Inner")
            .permitted_subclass("com/x/Outer$Sub")
            .inner_class("com/x/Outer$Inner", Some("com/x/Outer"), Some("Inner"), 0x0009)
            .field(FieldAccessFlags::PUBLIC, "count", "I")
            .method_with_code(MethodAccessFlags::PUBLIC, "run", "()V")
            .method(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, "size", "()I")
            .build()
            .unwrap()
    }

    #[test]
    fn read_reports_declaration() {
        let bytes = rich_class();
        let reader = ClassReader::new(&bytes).unwrap();
        assert_eq!(reader.class_name(), "com/x/Outer");
        assert!(reader.access().contains(ClassAccessFlags::PUBLIC));

        let mut recorder = Recorder::default();
        reader.accept(&mut recorder, ReadOptions::default()).unwrap();

        let header = recorder.header.unwrap();
        assert_eq!(header.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(header.interfaces, vec!["java/io/Serializable"]);
        assert_eq!(
            header.signature.as_deref(),
            Some("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        );
        assert_eq!(recorder.source.unwrap().file.as_deref(), Some("Outer.kt"));
        assert_eq!(recorder.annotations.len(), 2);
        assert!(recorder.annotations[0].1);
        assert_eq!(recorder.attributes[0].name, "Custom");
        assert_eq!(recorder.nest_members, vec!["com/x/Outer$Inner"]);
        assert_eq!(recorder.permitted_subclasses, vec!["com/x/Outer$Sub"]);
        assert_eq!(recorder.inner_classes[0].inner_name.as_deref(), Some("Inner"));
        assert_eq!(recorder.fields[0].name, "count");
        assert_eq!(recorder.methods.len(), 2);
        assert!(recorder.methods[0].code.is_some());
        assert!(recorder.methods[1].code.is_none());
        assert!(recorder.ended);
    }

    #[test]
    fn skip_code() {
        let bytes = rich_class();
        let reader = ClassReader::new(&bytes).unwrap();

        let mut recorder = Recorder::default();
        reader
            .accept(&mut recorder, ReadOptions { skip_code: true })
            .unwrap();
        assert!(recorder.methods.iter().all(|method| method.code.is_none()));
    }

    #[test]
    fn copy_is_byte_identical() {
        let bytes = rich_class();
        let reader = ClassReader::new(&bytes).unwrap();
        let mut writer = ClassWriter::from_reader(&reader);
        reader.accept(&mut writer, ReadOptions::default()).unwrap();

        assert_eq!(writer.into_bytes().unwrap(), bytes);
    }

    #[test]
    fn discard_consumes_everything() {
        let bytes = rich_class();
        let reader = ClassReader::new(&bytes).unwrap();
        reader.accept(&mut Discard, ReadOptions::default()).unwrap();
    }

    #[test]
    fn writer_without_class() {
        assert!(ClassWriter::new().into_bytes().is_none());
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(ClassReader::new(&[]), Err(Error::Empty)));
        assert!(matches!(
            ClassReader::new(&[0xCA, 0xFE]),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            ClassReader::new(b"PK\x03\x04\x00\x00\x00\x00"),
            Err(Error::NotSupported)
        ));

        let bytes = rich_class();
        for len in [10, bytes.len() / 2] {
            assert!(ClassReader::new(&bytes[..len])
                .and_then(|reader| reader.accept(&mut Discard, ReadOptions::default()))
                .is_err());
        }

        let mut trailing = bytes.clone();
        trailing.push(0);
        let reader = ClassReader::new(&trailing).unwrap();
        assert!(matches!(
            reader.accept(&mut Discard, ReadOptions::default()),
            Err(Error::Malformed { .. })
        ));
    }
}
