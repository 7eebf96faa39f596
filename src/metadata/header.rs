//! The seven-slot `@kotlin.Metadata` record.
//!
//! The annotation carries its payload in short fixed element names. This module routes the
//! element events of such an annotation into a [`MetadataHeader`] and emits a header back as
//! events. It is deliberately tolerant on read (unknown keys vanish) and sparse on write (empty
//! slots are omitted), matching what other tools reading the annotation expect.
//!
//! | Key  | Slot                                  | Type       |
//! |------|---------------------------------------|------------|
//! | `k`  | [`MetadataHeader::kind`]              | `int`      |
//! | `mv` | [`MetadataHeader::metadata_version`]  | `int[]`    |
//! | `d1` | [`MetadataHeader::data1`]             | `String[]` |
//! | `d2` | [`MetadataHeader::data2`]             | `String[]` |
//! | `xs` | [`MetadataHeader::extra_string`]      | `String`   |
//! | `pn` | [`MetadataHeader::package_name`]      | `String`   |
//! | `xi` | [`MetadataHeader::extra_int`]         | `int`      |
//!
//! # Examples
//!
//! ```rust,ignore
//! use classabi::metadata::MetadataHeader;
//!
//! let header = MetadataHeader::from_annotation(&annotation)?;
//! assert_eq!(header.to_annotation()?, annotation);
//! ```

use crate::{
    classfile::annotation::{Annotation, AnnotationBuilder, AnnotationVisitor, ElementValue},
    Error::MetadataType,
    Result,
};

/// Descriptor of the annotation carrying Kotlin metadata.
pub const METADATA_DESCRIPTOR: &str = "Lkotlin/Metadata;";

const KIND: &str = "k";
const METADATA_VERSION: &str = "mv";
const DATA1: &str = "d1";
const DATA2: &str = "d2";
const EXTRA_STRING: &str = "xs";
const PACKAGE_NAME: &str = "pn";
const EXTRA_INT: &str = "xi";

/// The raw content of a `@kotlin.Metadata` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataHeader {
    /// Kind of the annotated class file (`k`), see [`crate::metadata::MetadataKind`]
    pub kind: i32,
    /// Version of the metadata format (`mv`)
    pub metadata_version: Vec<i32>,
    /// Bit-encoded protobuf payload (`d1`)
    pub data1: Vec<String>,
    /// String table referenced by the payload (`d2`)
    pub data2: Vec<String>,
    /// Extra string (`xs`), e.g. the facade name of a multi-file part
    pub extra_string: String,
    /// Fully qualified package name when it differs from the JVM package (`pn`)
    pub package_name: String,
    /// Extra flags (`xi`)
    pub extra_int: i32,
}

impl Default for MetadataHeader {
    fn default() -> Self {
        // `k` defaults to 1 (class) in the annotation declaration
        MetadataHeader {
            kind: 1,
            metadata_version: Vec::new(),
            data1: Vec::new(),
            data2: Vec::new(),
            extra_string: String::new(),
            package_name: String::new(),
            extra_int: 0,
        }
    }
}

impl MetadataHeader {
    /// Decodes the elements of a `@kotlin.Metadata` annotation.
    ///
    /// # Errors
    /// Returns [`crate::Error::MetadataType`] if a known key carries a value of the wrong type.
    pub fn from_annotation(annotation: &Annotation) -> Result<MetadataHeader> {
        let mut reader = MetadataHeaderReader::default();
        annotation.accept(&mut reader)?;
        reader.finish()
    }

    /// Emits this header as annotation element events, terminated by `visit_end`.
    ///
    /// `mv` and `k` are always written, `xi` only when non-zero, the string arrays and strings
    /// only when non-empty. The order is the one used by the Kotlin compiler, so an unmodified
    /// header reproduces the original annotation.
    ///
    /// # Errors
    /// Propagates the first error returned by `visitor`.
    pub fn accept(&self, visitor: &mut impl AnnotationVisitor) -> Result<()> {
        let version: Vec<ElementValue> = self
            .metadata_version
            .iter()
            .map(|&part| ElementValue::Int(part))
            .collect();
        visitor.visit_array(METADATA_VERSION, &version)?;
        visitor.visit(Some(KIND), &ElementValue::Int(self.kind))?;
        if self.extra_int != 0 {
            visitor.visit(Some(EXTRA_INT), &ElementValue::Int(self.extra_int))?;
        }
        for (key, strings) in [(DATA1, &self.data1), (DATA2, &self.data2)] {
            if !strings.is_empty() {
                let values: Vec<ElementValue> = strings
                    .iter()
                    .map(|value| ElementValue::String(value.clone()))
                    .collect();
                visitor.visit_array(key, &values)?;
            }
        }
        for (key, value) in [
            (EXTRA_STRING, &self.extra_string),
            (PACKAGE_NAME, &self.package_name),
        ] {
            if !value.is_empty() {
                visitor.visit(Some(key), &ElementValue::String(value.clone()))?;
            }
        }
        visitor.visit_end()
    }

    /// Builds the `@kotlin.Metadata` annotation for this header.
    ///
    /// # Errors
    /// Never fails in practice; the error type is shared with [`MetadataHeader::accept`].
    pub fn to_annotation(&self) -> Result<Annotation> {
        let mut builder = AnnotationBuilder::new(METADATA_DESCRIPTOR);
        self.accept(&mut builder)?;
        builder.build()
    }
}

/// Routes annotation events into the slots of a [`MetadataHeader`].
#[derive(Debug, Default)]
pub struct MetadataHeaderReader {
    header: MetadataHeader,
    ended: bool,
}

impl MetadataHeaderReader {
    /// Returns the decoded header once `visit_end` has been observed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the annotation was not terminated.
    pub fn finish(self) -> Result<MetadataHeader> {
        if !self.ended {
            return Err(malformed_error!("Kotlin metadata annotation was not terminated"));
        }
        Ok(self.header)
    }
}

fn expect_int(key: &str, value: &ElementValue) -> Result<i32> {
    match value {
        ElementValue::Int(value) => Ok(*value),
        _ => Err(MetadataType {
            key: key.to_string(),
            expected: "int",
        }),
    }
}

fn expect_string(key: &str, value: &ElementValue) -> Result<String> {
    match value {
        ElementValue::String(value) => Ok(value.clone()),
        _ => Err(MetadataType {
            key: key.to_string(),
            expected: "String",
        }),
    }
}

impl AnnotationVisitor for MetadataHeaderReader {
    fn visit(&mut self, name: Option<&str>, value: &ElementValue) -> Result<()> {
        let Some(name) = name else {
            return Ok(());
        };

        match name {
            KIND => self.header.kind = expect_int(name, value)?,
            EXTRA_INT => self.header.extra_int = expect_int(name, value)?,
            EXTRA_STRING => self.header.extra_string = expect_string(name, value)?,
            PACKAGE_NAME => self.header.package_name = expect_string(name, value)?,
            METADATA_VERSION => {
                return Err(MetadataType {
                    key: name.to_string(),
                    expected: "int[]",
                })
            }
            DATA1 | DATA2 => {
                return Err(MetadataType {
                    key: name.to_string(),
                    expected: "String[]",
                })
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_array(&mut self, name: &str, values: &[ElementValue]) -> Result<()> {
        match name {
            METADATA_VERSION => {
                self.header.metadata_version = values
                    .iter()
                    .map(|value| {
                        expect_int(name, value).map_err(|_| MetadataType {
                            key: name.to_string(),
                            expected: "int[]",
                        })
                    })
                    .collect::<Result<_>>()?;
            }
            DATA1 | DATA2 => {
                let strings = values
                    .iter()
                    .map(|value| {
                        expect_string(name, value).map_err(|_| MetadataType {
                            key: name.to_string(),
                            expected: "String[]",
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                if name == DATA1 {
                    self.header.data1 = strings;
                } else {
                    self.header.data2 = strings;
                }
            }
            KIND | EXTRA_INT => {
                return Err(MetadataType {
                    key: name.to_string(),
                    expected: "int",
                })
            }
            EXTRA_STRING | PACKAGE_NAME => {
                return Err(MetadataType {
                    key: name.to_string(),
                    expected: "String",
                })
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> MetadataHeader {
        MetadataHeader {
            kind: 1,
            metadata_version: vec![1, 9, 0],
            data1: vec!["\0\u{1}".to_string()],
            data2: vec!["A".to_string(), "foo".to_string()],
            extra_string: String::new(),
            package_name: String::new(),
            extra_int: 48,
        }
    }

    #[test]
    fn encode_order_and_omission() {
        let annotation = sample().to_annotation().unwrap();
        let keys: Vec<&str> = annotation
            .elements
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, ["mv", "k", "xi", "d1", "d2"]);

        let minimal = MetadataHeader {
            kind: 3,
            metadata_version: vec![2, 0, 0],
            ..MetadataHeader::default()
        };
        let annotation = minimal.to_annotation().unwrap();
        let keys: Vec<&str> = annotation
            .elements
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, ["mv", "k"]);
    }

    #[test]
    fn decode_round_trip() {
        let mut header = sample();
        header.extra_string = "com/x/FacadeKt".to_string();
        header.package_name = "com.x".to_string();

        let annotation = header.to_annotation().unwrap();
        assert_eq!(annotation.descriptor, METADATA_DESCRIPTOR);
        assert_eq!(MetadataHeader::from_annotation(&annotation).unwrap(), header);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut annotation = sample().to_annotation().unwrap();
        annotation.elements.push((
            "bv".to_string(),
            ElementValue::Array(vec![ElementValue::Int(1)]),
        ));
        annotation
            .elements
            .push(("zz".to_string(), ElementValue::Boolean(true)));

        assert_eq!(MetadataHeader::from_annotation(&annotation).unwrap(), sample());
    }

    #[test]
    fn missing_keys_use_defaults() {
        let annotation = Annotation::new(METADATA_DESCRIPTOR);
        let header = MetadataHeader::from_annotation(&annotation).unwrap();
        assert_eq!(header, MetadataHeader::default());
        assert_eq!(header.kind, 1);
    }

    #[test]
    fn wrong_types_are_fatal() {
        let cases = vec![
            ("k", ElementValue::String("1".to_string())),
            ("xs", ElementValue::Int(1)),
            ("d1", ElementValue::String("x".to_string())),
            ("mv", ElementValue::Array(vec![ElementValue::String("1".to_string())])),
            ("d2", ElementValue::Array(vec![ElementValue::Int(1)])),
            ("xi", ElementValue::Array(vec![])),
        ];

        for (key, value) in cases {
            let mut annotation = Annotation::new(METADATA_DESCRIPTOR);
            annotation.elements.push((key.to_string(), value));
            let result = MetadataHeader::from_annotation(&annotation);
            assert!(
                matches!(result, Err(Error::MetadataType { key: ref found, .. }) if found == key),
                "{key}"
            );
        }
    }
}
