//! Plain data carried by the class visitor events.

use crate::classfile::{
    access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
    annotation::Annotation,
};

/// The class declaration: version, access, names and supertypes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassHeader {
    /// `minor_version`
    pub minor_version: u16,
    /// `major_version`
    pub major_version: u16,
    /// Class access flags
    pub access: ClassAccessFlags,
    /// Internal name, e.g. `com/x/A`
    pub name: String,
    /// Internal name of the superclass; `None` only for `java/lang/Object` and modules
    pub super_name: Option<String>,
    /// Internal names of the direct superinterfaces
    pub interfaces: Vec<String>,
    /// Generic signature from the `Signature` attribute
    pub signature: Option<String>,
}

/// `SourceFile` and `SourceDebugExtension` of a class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Name of the source file
    pub file: Option<String>,
    /// Raw `SourceDebugExtension` payload (usually an SMAP)
    pub debug: Option<Vec<u8>>,
}

impl SourceInfo {
    /// Returns `true` if neither attribute is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.debug.is_none()
    }
}

/// The `EnclosingMethod` attribute of a local or anonymous class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterClass {
    /// Internal name of the enclosing class
    pub owner: String,
    /// Name of the enclosing method, if any
    pub method_name: Option<String>,
    /// Descriptor of the enclosing method, if any
    pub method_descriptor: Option<String>,
}

/// One entry of the `InnerClasses` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    /// Internal name of the inner class, e.g. `com/x/Outer$Inner`
    pub name: String,
    /// Internal name of the declaring class; `None` for local and anonymous classes
    pub outer_name: Option<String>,
    /// Simple name as declared in source; `None` for anonymous classes
    pub inner_name: Option<String>,
    /// Access flags as declared in source
    pub access: ClassAccessFlags,
}

/// An attribute the codec does not interpret.
///
/// The payload is kept byte for byte. Any constant pool indices inside it remain valid because
/// the writer starts from the reader's pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Attribute name, e.g. `BootstrapMethods`
    pub name: String,
    /// Attribute payload without the name and length header
    pub data: Vec<u8>,
}

/// An annotation together with its retention.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    /// The annotation
    pub annotation: Annotation,
    /// `true` for `RuntimeVisibleAnnotations`, `false` for `RuntimeInvisibleAnnotations`
    pub visible: bool,
}

/// A field declaration with all of its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Access flags
    pub access: FieldAccessFlags,
    /// Field name
    pub name: String,
    /// Field descriptor, e.g. `I` or `Ljava/lang/String;`
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Declaration annotations
    pub annotations: Vec<AnnotationEntry>,
    /// Every other attribute (`ConstantValue`, `Deprecated`, type annotations, ...)
    pub attributes: Vec<RawAttribute>,
}

/// A method declaration with all of its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Access flags
    pub access: MethodAccessFlags,
    /// Method name, e.g. `<init>` or `foo`
    pub name: String,
    /// Method descriptor, e.g. `(I)V`
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Internal names from the `Exceptions` attribute
    pub exceptions: Vec<String>,
    /// Raw `Code` attribute payload; `None` when absent or skipped while reading
    pub code: Option<Vec<u8>>,
    /// Declaration annotations
    pub annotations: Vec<AnnotationEntry>,
    /// Every other attribute (`MethodParameters`, `AnnotationDefault`, parameter annotations, ...)
    pub attributes: Vec<RawAttribute>,
}

impl MethodInfo {
    /// Returns `true` for instance initializers.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}
