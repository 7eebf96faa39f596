//! The constant pool shared by a class reader and the writer derived from it.
//!
//! A [`ConstantPool`] keeps every entry exactly as it was read, including duplicates and the
//! unusable second slot of 8-byte constants, so that the indices stored inside opaque attribute
//! payloads (method bodies, stack maps, bootstrap methods) stay valid when the pool is written
//! back out. New entries are only ever appended, and [`ConstantPool::add`] returns the index of
//! an existing equal entry instead of appending a duplicate. Writing a class that was produced by
//! this crate therefore never grows its pool.
//!
//! # Examples
//!
//! ```rust,ignore
//! let mut pool = ConstantPool::new();
//! let object = pool.intern_class("java/lang/Object")?;
//! assert_eq!(pool.intern_class("java/lang/Object")?, object);
//! assert_eq!(pool.class_name(object)?, "java/lang/Object");
//! ```

use std::collections::HashMap;

use crate::{
    classfile::mutf8,
    file::{io::push_be, parser::Parser},
    Result,
};

/// Highest number of slots (`constant_pool_count - 1`) a class file can address.
const MAX_POOL_SLOTS: usize = u16::MAX as usize - 1;

/// One entry of the constant pool.
///
/// Floating point values are stored as their raw bits so entries can be compared and hashed
/// exactly; `-0.0` and every NaN payload remain distinct constants, as in the class file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Constant {
    /// Raw modified UTF-8 bytes
    Utf8(Vec<u8>),
    Integer(i32),
    /// IEEE 754 single precision bits
    Float(u32),
    Long(i64),
    /// IEEE 754 double precision bits
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType(u16),
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module(u16),
    Package(u16),
    /// Slot 0 and the slot following a `Long` or `Double`
    Unusable,
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn parse(parser: &mut Parser) -> Result<Constant> {
        let tag = parser.read_be::<u8>()?;
        Ok(match tag {
            1 => {
                let len = parser.read_be::<u16>()? as usize;
                Constant::Utf8(parser.read_bytes(len)?.to_vec())
            }
            3 => Constant::Integer(parser.read_be::<i32>()?),
            4 => Constant::Float(parser.read_be::<u32>()?),
            5 => Constant::Long(parser.read_be::<i64>()?),
            6 => Constant::Double(parser.read_be::<u64>()?),
            7 => Constant::Class(parser.read_be::<u16>()?),
            8 => Constant::String(parser.read_be::<u16>()?),
            9 => Constant::FieldRef {
                class: parser.read_be::<u16>()?,
                name_and_type: parser.read_be::<u16>()?,
            },
            10 => Constant::MethodRef {
                class: parser.read_be::<u16>()?,
                name_and_type: parser.read_be::<u16>()?,
            },
            11 => Constant::InterfaceMethodRef {
                class: parser.read_be::<u16>()?,
                name_and_type: parser.read_be::<u16>()?,
            },
            12 => Constant::NameAndType {
                name: parser.read_be::<u16>()?,
                descriptor: parser.read_be::<u16>()?,
            },
            15 => Constant::MethodHandle {
                kind: parser.read_be::<u8>()?,
                reference: parser.read_be::<u16>()?,
            },
            16 => Constant::MethodType(parser.read_be::<u16>()?),
            17 => Constant::Dynamic {
                bootstrap: parser.read_be::<u16>()?,
                name_and_type: parser.read_be::<u16>()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap: parser.read_be::<u16>()?,
                name_and_type: parser.read_be::<u16>()?,
            },
            19 => Constant::Module(parser.read_be::<u16>()?),
            20 => Constant::Package(parser.read_be::<u16>()?),
            _ => {
                return Err(malformed_error!(
                    "Invalid constant pool tag {} at offset {}",
                    tag,
                    parser.pos() - 1
                ))
            }
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Constant::Utf8(bytes) => {
                out.push(1);
                // Length is validated when the entry is created
                push_be(out, bytes.len() as u16);
                out.extend_from_slice(bytes);
            }
            Constant::Integer(value) => {
                out.push(3);
                push_be(out, *value);
            }
            Constant::Float(bits) => {
                out.push(4);
                push_be(out, *bits);
            }
            Constant::Long(value) => {
                out.push(5);
                push_be(out, *value);
            }
            Constant::Double(bits) => {
                out.push(6);
                push_be(out, *bits);
            }
            Constant::Class(name) => {
                out.push(7);
                push_be(out, *name);
            }
            Constant::String(value) => {
                out.push(8);
                push_be(out, *value);
            }
            Constant::FieldRef {
                class,
                name_and_type,
            } => write_pair(out, 9, *class, *name_and_type),
            Constant::MethodRef {
                class,
                name_and_type,
            } => write_pair(out, 10, *class, *name_and_type),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => write_pair(out, 11, *class, *name_and_type),
            Constant::NameAndType { name, descriptor } => write_pair(out, 12, *name, *descriptor),
            Constant::MethodHandle { kind, reference } => {
                out.push(15);
                out.push(*kind);
                push_be(out, *reference);
            }
            Constant::MethodType(descriptor) => {
                out.push(16);
                push_be(out, *descriptor);
            }
            Constant::Dynamic {
                bootstrap,
                name_and_type,
            } => write_pair(out, 17, *bootstrap, *name_and_type),
            Constant::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => write_pair(out, 18, *bootstrap, *name_and_type),
            Constant::Module(name) => {
                out.push(19);
                push_be(out, *name);
            }
            Constant::Package(name) => {
                out.push(20);
                push_be(out, *name);
            }
            Constant::Unusable => {}
        }
    }
}

fn write_pair(out: &mut Vec<u8>, tag: u8, first: u16, second: u16) {
    out.push(tag);
    push_be(out, first);
    push_be(out, second);
}

/// An append-only constant pool with lookup of existing entries.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Slot 0 is always [`Constant::Unusable`]
    entries: Vec<Constant>,
    /// First index of every distinct constant
    lookup: HashMap<Constant, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}

impl ConstantPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> ConstantPool {
        ConstantPool {
            entries: vec![Constant::Unusable],
            lookup: HashMap::new(),
        }
    }

    /// Parses `constant_pool_count` followed by the pool entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input and [`crate::Error::Malformed`]
    /// for unknown tags or an 8-byte constant in the last slot.
    pub fn parse(parser: &mut Parser) -> Result<ConstantPool> {
        let count = parser.read_be::<u16>()? as usize;
        if count == 0 {
            return Err(malformed_error!("constant_pool_count must be at least 1"));
        }

        let mut pool = ConstantPool::new();
        pool.entries.reserve(count);
        while pool.entries.len() < count {
            let constant = Constant::parse(parser)?;
            let wide = constant.is_wide();
            if wide && pool.entries.len() + 1 >= count {
                return Err(malformed_error!(
                    "8-byte constant at index {} overflows a pool of {}",
                    pool.entries.len(),
                    count
                ));
            }

            let index = pool.entries.len() as u16;
            pool.lookup.entry(constant.clone()).or_insert(index);
            pool.entries.push(constant);
            if wide {
                pool.entries.push(Constant::Unusable);
            }
        }

        Ok(pool)
    }

    /// Returns the value of `constant_pool_count`.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is out of range or names an unusable slot.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(malformed_error!(
                "Invalid constant pool index {} (pool has {} slots)",
                index,
                self.entries.len()
            )),
            Some(constant) => Ok(constant),
        }
    }

    /// Returns the raw bytes of the `CONSTANT_Utf8` entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is missing or not a `CONSTANT_Utf8`.
    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            Constant::Utf8(bytes) => Ok(bytes),
            other => Err(malformed_error!(
                "Expected Utf8 constant at {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Returns the decoded string of the `CONSTANT_Utf8` entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is missing, of the wrong kind or not
    /// valid modified UTF-8.
    pub fn utf8(&self, index: u16) -> Result<String> {
        mutf8::decode(self.utf8_bytes(index)?)
    }

    /// Returns the internal name referenced by the `CONSTANT_Class` entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is missing or not a `CONSTANT_Class`.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            other => Err(malformed_error!(
                "Expected Class constant at {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Like [`ConstantPool::class_name`], but index 0 yields `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a non-zero index that is not a `CONSTANT_Class`.
    pub fn optional_class_name(&self, index: u16) -> Result<Option<String>> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    /// Like [`ConstantPool::utf8`], but index 0 yields `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a non-zero index that is not a `CONSTANT_Utf8`.
    pub fn optional_utf8(&self, index: u16) -> Result<Option<String>> {
        if index == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(Some)
        }
    }

    /// Returns the index of `constant`, appending it if the pool does not contain it yet.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the pool is full or a `CONSTANT_Utf8` exceeds
    /// 65535 bytes.
    pub fn add(&mut self, constant: Constant) -> Result<u16> {
        if let Some(&index) = self.lookup.get(&constant) {
            return Ok(index);
        }

        if let Constant::Utf8(bytes) = &constant {
            if bytes.len() > u16::MAX as usize {
                return Err(malformed_error!(
                    "Utf8 constant of {} bytes exceeds the class file limit",
                    bytes.len()
                ));
            }
        }

        let needed = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() - 1 + needed > MAX_POOL_SLOTS {
            return Err(malformed_error!(
                "Constant pool overflow: more than {} entries",
                MAX_POOL_SLOTS
            ));
        }

        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.lookup.insert(constant.clone(), index);
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Interns a `CONSTANT_Utf8`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_utf8(&mut self, value: &str) -> Result<u16> {
        self.add(Constant::Utf8(mutf8::encode(value)))
    }

    /// Interns a `CONSTANT_Class` together with its name.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_class(&mut self, internal_name: &str) -> Result<u16> {
        let name = self.intern_utf8(internal_name)?;
        self.add(Constant::Class(name))
    }

    /// Interns a `CONSTANT_Integer`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_int(&mut self, value: i32) -> Result<u16> {
        self.add(Constant::Integer(value))
    }

    /// Interns a `CONSTANT_Long`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_long(&mut self, value: i64) -> Result<u16> {
        self.add(Constant::Long(value))
    }

    /// Interns a `CONSTANT_Float`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_float(&mut self, value: f32) -> Result<u16> {
        self.add(Constant::Float(value.to_bits()))
    }

    /// Interns a `CONSTANT_Double`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_double(&mut self, value: f64) -> Result<u16> {
        self.add(Constant::Double(value.to_bits()))
    }

    /// Interns a `CONSTANT_NameAndType`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.intern_utf8(name)?;
        let descriptor = self.intern_utf8(descriptor)?;
        self.add(Constant::NameAndType { name, descriptor })
    }

    /// Writes `constant_pool_count` followed by every entry.
    pub fn write(&self, out: &mut Vec<u8>) {
        push_be(out, self.entries.len() as u16);
        for constant in &self.entries[1..] {
            constant.write(out);
        }
    }
}
