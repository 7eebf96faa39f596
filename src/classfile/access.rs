//! Access flag sets for classes, fields and methods.
//!
//! The JVM stores access as a `u16` bitmask whose meaning depends on where it appears. Each
//! location gets its own flag type so a field flag can never be tested against a method
//! constant by accident. Unknown bits are retained (`from_bits_retain`) so that flags round
//! trip unchanged through the reader and writer.
//!
//! # Key Types
//! - [`ClassAccessFlags`]: `ClassFile.access_flags` and `InnerClasses` entries
//! - [`FieldAccessFlags`]: `field_info.access_flags`
//! - [`MethodAccessFlags`]: `method_info.access_flags`

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Access flags of a class declaration or of an `InnerClasses` entry
    pub struct ClassAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private (only meaningful in `InnerClasses` entries)
        const PRIVATE = 0x0002;
        /// Declared protected (only meaningful in `InnerClasses` entries)
        const PROTECTED = 0x0004;
        /// Declared static (only meaningful in `InnerClasses` entries)
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by invokespecial
        const SUPER = 0x0020;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
        /// Is a module, not a class or interface
        const MODULE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Access flags of a field
    pub struct FieldAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared volatile
        const VOLATILE = 0x0040;
        /// Declared transient
        const TRANSIENT = 0x0080;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Element of an enum class
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Access flags of a method
    pub struct MethodAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared with variable number of arguments
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Floating-point mode is FP-strict
        const STRICT = 0x0800;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

impl ClassAccessFlags {
    /// Returns `true` if the declaration is part of the public API (public or protected).
    #[must_use]
    pub fn is_api(self) -> bool {
        self.intersects(Self::PUBLIC | Self::PROTECTED)
    }
}

impl FieldAccessFlags {
    /// Returns `true` if the field is part of the public API (public or protected).
    #[must_use]
    pub fn is_api(self) -> bool {
        self.intersects(Self::PUBLIC | Self::PROTECTED)
    }
}

impl MethodAccessFlags {
    /// Returns `true` if the method is part of the public API (public or protected).
    #[must_use]
    pub fn is_api(self) -> bool {
        self.intersects(Self::PUBLIC | Self::PROTECTED)
    }

    /// Returns `true` if the method carries no `Code` attribute by definition.
    #[must_use]
    pub fn is_bodiless(self) -> bool {
        self.intersects(Self::ABSTRACT | Self::NATIVE)
    }
}
