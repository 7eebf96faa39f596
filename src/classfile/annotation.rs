//! Annotations and their element values.
//!
//! Annotations are materialized from the `Runtime[In]VisibleAnnotations` attributes into plain
//! values so that filters can inspect, reorder and replace them. Element values that reference
//! the constant pool are resolved on read and interned again on write.
//!
//! The [`AnnotationVisitor`] trait is the event-level view of an annotation: one `visit` call per
//! scalar element, one `visit_array` call per array element and a closing `visit_end`.
//! [`Annotation::accept`] replays a materialized annotation as events, and
//! [`AnnotationBuilder`] assembles events back into an [`Annotation`].

use crate::{
    classfile::pool::{Constant, ConstantPool},
    file::{io::push_be, parser::Parser},
    Result,
};

/// The value of one annotation element.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ElementValue {
    Byte(i8),
    Char(u16),
    Short(i16),
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// An enum constant: descriptor of the enum type and the constant name
    Enum { descriptor: String, name: String },
    /// A class literal, given by its return descriptor (e.g. `Ljava/lang/String;` or `V`)
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn parse(parser: &mut Parser, pool: &ConstantPool, depth: usize) -> Result<ElementValue> {
        if depth > 64 {
            return Err(malformed_error!("Annotation nesting exceeds {} levels", 64));
        }

        let tag = parser.read_be::<u8>()?;
        let value = match tag {
            b'B' | b'C' | b'S' | b'Z' | b'I' => {
                let index = parser.read_be::<u16>()?;
                let Constant::Integer(value) = pool.get(index)? else {
                    return Err(malformed_error!(
                        "Element tag '{}' expects an Integer constant at {}",
                        char::from(tag),
                        index
                    ));
                };
                let value = *value;
                match tag {
                    b'B' => ElementValue::Byte(value as i8),
                    b'C' => ElementValue::Char(value as u16),
                    b'S' => ElementValue::Short(value as i16),
                    b'Z' => ElementValue::Boolean(value != 0),
                    _ => ElementValue::Int(value),
                }
            }
            b'J' => {
                let index = parser.read_be::<u16>()?;
                match pool.get(index)? {
                    Constant::Long(value) => ElementValue::Long(*value),
                    _ => return Err(malformed_error!("Expected Long constant at {}", index)),
                }
            }
            b'F' => {
                let index = parser.read_be::<u16>()?;
                match pool.get(index)? {
                    Constant::Float(bits) => ElementValue::Float(f32::from_bits(*bits)),
                    _ => return Err(malformed_error!("Expected Float constant at {}", index)),
                }
            }
            b'D' => {
                let index = parser.read_be::<u16>()?;
                match pool.get(index)? {
                    Constant::Double(bits) => ElementValue::Double(f64::from_bits(*bits)),
                    _ => return Err(malformed_error!("Expected Double constant at {}", index)),
                }
            }
            b's' => ElementValue::String(pool.utf8(parser.read_be::<u16>()?)?),
            b'e' => ElementValue::Enum {
                descriptor: pool.utf8(parser.read_be::<u16>()?)?,
                name: pool.utf8(parser.read_be::<u16>()?)?,
            },
            b'c' => ElementValue::Class(pool.utf8(parser.read_be::<u16>()?)?),
            b'@' => ElementValue::Annotation(Annotation::parse_nested(parser, pool, depth + 1)?),
            b'[' => {
                let count = parser.read_be::<u16>()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(ElementValue::parse(parser, pool, depth + 1)?);
                }
                ElementValue::Array(values)
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid element value tag 0x{:02X}",
                    tag
                ))
            }
        };

        Ok(value)
    }

    fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
        match self {
            ElementValue::Byte(value) => write_int(pool, out, b'B', i32::from(*value))?,
            ElementValue::Char(value) => write_int(pool, out, b'C', i32::from(*value))?,
            ElementValue::Short(value) => write_int(pool, out, b'S', i32::from(*value))?,
            ElementValue::Boolean(value) => write_int(pool, out, b'Z', i32::from(*value))?,
            ElementValue::Int(value) => write_int(pool, out, b'I', *value)?,
            ElementValue::Long(value) => {
                out.push(b'J');
                push_be(out, pool.intern_long(*value)?);
            }
            ElementValue::Float(value) => {
                out.push(b'F');
                push_be(out, pool.intern_float(*value)?);
            }
            ElementValue::Double(value) => {
                out.push(b'D');
                push_be(out, pool.intern_double(*value)?);
            }
            ElementValue::String(value) => {
                out.push(b's');
                push_be(out, pool.intern_utf8(value)?);
            }
            ElementValue::Enum { descriptor, name } => {
                out.push(b'e');
                push_be(out, pool.intern_utf8(descriptor)?);
                push_be(out, pool.intern_utf8(name)?);
            }
            ElementValue::Class(descriptor) => {
                out.push(b'c');
                push_be(out, pool.intern_utf8(descriptor)?);
            }
            ElementValue::Annotation(annotation) => {
                out.push(b'@');
                annotation.write(pool, out)?;
            }
            ElementValue::Array(values) => {
                out.push(b'[');
                push_be(out, checked_count(values.len())?);
                for value in values {
                    value.write(pool, out)?;
                }
            }
        }
        Ok(())
    }
}

fn write_int(pool: &mut ConstantPool, out: &mut Vec<u8>, tag: u8, value: i32) -> Result<()> {
    out.push(tag);
    push_be(out, pool.intern_int(value)?);
    Ok(())
}

pub(crate) fn checked_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| malformed_error!("Table of {} entries exceeds u16", len))
}

/// A materialized annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface, e.g. `Lkotlin/Metadata;`
    pub descriptor: String,
    /// Element name and value pairs in declaration order
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// Creates an annotation without elements.
    #[must_use]
    pub fn new(descriptor: impl Into<String>) -> Annotation {
        Annotation {
            descriptor: descriptor.into(),
            elements: Vec::new(),
        }
    }

    /// Returns the value of the element called `name`.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| value)
    }

    /// Parses one `annotation` structure.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for invalid input.
    pub fn parse(parser: &mut Parser, pool: &ConstantPool) -> Result<Annotation> {
        Annotation::parse_nested(parser, pool, 0)
    }

    fn parse_nested(parser: &mut Parser, pool: &ConstantPool, depth: usize) -> Result<Annotation> {
        let descriptor = pool.utf8(parser.read_be::<u16>()?)?;
        let count = parser.read_be::<u16>()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(parser.read_be::<u16>()?)?;
            elements.push((name, ElementValue::parse(parser, pool, depth)?));
        }

        Ok(Annotation {
            descriptor,
            elements,
        })
    }

    /// Parses the payload of a `Runtime[In]VisibleAnnotations` attribute.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for invalid input.
    pub fn parse_list(data: &[u8], pool: &ConstantPool) -> Result<Vec<Annotation>> {
        let mut parser = Parser::new(data);
        let count = parser.read_be::<u16>()?;
        let mut annotations = Vec::with_capacity(count as usize);
        for _ in 0..count {
            annotations.push(Annotation::parse(&mut parser, pool)?);
        }

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after annotations",
                parser.remaining().len()
            ));
        }
        Ok(annotations)
    }

    /// Encodes this annotation, interning every referenced constant in `pool`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the pool overflows or a table is too large.
    pub fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
        push_be(out, pool.intern_utf8(&self.descriptor)?);
        push_be(out, checked_count(self.elements.len())?);
        for (name, value) in &self.elements {
            push_be(out, pool.intern_utf8(name)?);
            value.write(pool, out)?;
        }
        Ok(())
    }

    /// Replays this annotation as visitor events.
    ///
    /// Array elements are reported through [`AnnotationVisitor::visit_array`], everything else
    /// through [`AnnotationVisitor::visit`].
    ///
    /// # Errors
    /// Propagates the first error returned by `visitor`.
    pub fn accept(&self, visitor: &mut impl AnnotationVisitor) -> Result<()> {
        for (name, value) in &self.elements {
            match value {
                ElementValue::Array(values) => visitor.visit_array(name, values)?,
                other => visitor.visit(Some(name), other)?,
            }
        }
        visitor.visit_end()
    }
}

/// Receives the elements of one annotation as a stream of events.
pub trait AnnotationVisitor {
    /// A scalar element. `name` is `None` for the unnamed values inside an array.
    ///
    /// # Errors
    /// Implementations reject values they cannot accept.
    fn visit(&mut self, name: Option<&str>, value: &ElementValue) -> Result<()>;

    /// An array element with all of its values.
    ///
    /// # Errors
    /// Implementations reject values they cannot accept.
    fn visit_array(&mut self, name: &str, values: &[ElementValue]) -> Result<()>;

    /// Marks the end of the annotation.
    ///
    /// # Errors
    /// Implementations may reject an incomplete annotation.
    fn visit_end(&mut self) -> Result<()>;
}

/// Collects [`AnnotationVisitor`] events into an [`Annotation`].
#[derive(Debug)]
pub struct AnnotationBuilder {
    annotation: Annotation,
    ended: bool,
}

impl AnnotationBuilder {
    /// Starts a new annotation of the type `descriptor`.
    #[must_use]
    pub fn new(descriptor: impl Into<String>) -> AnnotationBuilder {
        AnnotationBuilder {
            annotation: Annotation::new(descriptor),
            ended: false,
        }
    }

    /// Returns the finished annotation.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `visit_end` was never called.
    pub fn build(self) -> Result<Annotation> {
        if !self.ended {
            return Err(malformed_error!(
                "Annotation {} was not terminated",
                self.annotation.descriptor
            ));
        }
        Ok(self.annotation)
    }
}

impl AnnotationVisitor for AnnotationBuilder {
    fn visit(&mut self, name: Option<&str>, value: &ElementValue) -> Result<()> {
        let Some(name) = name else {
            return Err(malformed_error!("Unnamed element outside of an array"));
        };
        self.annotation
            .elements
            .push((name.to_string(), value.clone()));
        Ok(())
    }

    fn visit_array(&mut self, name: &str, values: &[ElementValue]) -> Result<()> {
        self.annotation
            .elements
            .push((name.to_string(), ElementValue::Array(values.to_vec())));
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}
