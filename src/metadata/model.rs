//! The structured declaration model decoded from a [`MetadataHeader`].
//!
//! Only the parts of the Kotlin metadata schema that the ABI filter reasons about are decoded:
//! declaration names, flags and JVM signatures, nested class names and the companion object.
//! Each declaration keeps its complete protobuf message, so types, type parameters, contracts
//! and every extension survive unchanged when the model is written back.
//!
//! # Payload layout
//!
//! For classes, file facades and multi-file parts, `d1` decodes to a length-delimited
//! `StringTableTypes` message followed by a `Class` or `Package` message. Synthetic classes and
//! multi-file facades are kept opaque.

use std::collections::HashSet;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::{
    classfile::annotation::AnnotationVisitor,
    file::parser::Parser,
    metadata::{
        bitencoding::{decode_bytes, encode_bytes},
        header::MetadataHeader,
        names::NameResolver,
        proto::{pack_varints, Field, Message, WireValue},
    },
    Result,
};

/// `Class.flags`
pub(crate) const CLASS_FLAGS: u32 = 1;
/// `Class.fq_name`
pub(crate) const CLASS_FQ_NAME: u32 = 3;
/// `Class.companion_object_name`
pub(crate) const CLASS_COMPANION_OBJECT_NAME: u32 = 4;
/// `Class.nested_class_name` (packed)
pub(crate) const CLASS_NESTED_CLASS_NAME: u32 = 7;
/// `Class.enum_entry`
pub(crate) const CLASS_ENUM_ENTRY: u32 = 13;
/// `Class.constructor`
pub(crate) const CLASS_CONSTRUCTOR: u32 = 8;
/// `Class.function`
pub(crate) const CLASS_FUNCTION: u32 = 9;
/// `Class.property`
pub(crate) const CLASS_PROPERTY: u32 = 10;
/// `Class.type_alias`
pub(crate) const CLASS_TYPE_ALIAS: u32 = 11;
/// `Package.function`
pub(crate) const PACKAGE_FUNCTION: u32 = 3;
/// `Package.property`
pub(crate) const PACKAGE_PROPERTY: u32 = 4;
/// `Package.type_alias`
pub(crate) const PACKAGE_TYPE_ALIAS: u32 = 5;
/// JVM extension `class_local_variable` / `package_local_variable`
pub(crate) const LOCAL_DELEGATED_PROPERTY: u32 = 102;

/// `Function.flags` / `Property.old_flags` / `Constructor.flags` / `TypeAlias.flags`
pub(crate) const OLD_FLAGS: u32 = 1;
/// `Function.name` / `Property.name` / `TypeAlias.name`
pub(crate) const NAME: u32 = 2;
/// `Function.flags`
pub(crate) const FUNCTION_FLAGS: u32 = 9;
/// `Property.flags`
pub(crate) const PROPERTY_FLAGS: u32 = 11;
/// JVM extension `method_signature` / `property_signature`
pub(crate) const JVM_SIGNATURE: u32 = 100;

/// `JvmMethodSignature.name` / `JvmFieldSignature.name`
pub(crate) const SIGNATURE_NAME: u32 = 1;
/// `JvmMethodSignature.desc` / `JvmFieldSignature.desc`
pub(crate) const SIGNATURE_DESC: u32 = 2;
/// `JvmPropertySignature.field`
pub(crate) const PROPERTY_SIGNATURE_FIELD: u32 = 1;
/// `JvmPropertySignature.getter`
pub(crate) const PROPERTY_SIGNATURE_GETTER: u32 = 3;
/// `JvmPropertySignature.setter`
pub(crate) const PROPERTY_SIGNATURE_SETTER: u32 = 4;

/// Flags of a public final declaration
const DEFAULT_FLAGS: u64 = 6;
/// Flags of a public final property with a getter
const DEFAULT_PROPERTY_FLAGS: u64 = 518;
/// Pre-1.1 encoding of [`DEFAULT_PROPERTY_FLAGS`]
const DEFAULT_PROPERTY_OLD_FLAGS: u64 = 2054;

/// Field numbers of the declaration lists inside a container message.
#[derive(Debug)]
struct Layout {
    constructor: Option<u32>,
    function: u32,
    property: u32,
    type_alias: u32,
}

const CLASS_LAYOUT: Layout = Layout {
    constructor: Some(CLASS_CONSTRUCTOR),
    function: CLASS_FUNCTION,
    property: CLASS_PROPERTY,
    type_alias: CLASS_TYPE_ALIAS,
};

const PACKAGE_LAYOUT: Layout = Layout {
    constructor: None,
    function: PACKAGE_FUNCTION,
    property: PACKAGE_PROPERTY,
    type_alias: PACKAGE_TYPE_ALIAS,
};

/// What a class file annotated with `@kotlin.Metadata` contains (`k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MetadataKind {
    /// A class, interface, object or enum
    Class,
    /// Top-level declarations of a single file (`FooKt`)
    File,
    /// A lambda or other compiler-generated class
    SyntheticClass,
    /// The facade class of a `@JvmMultifileClass`
    MultiFileClassFacade,
    /// One part of a `@JvmMultifileClass`
    MultiFileClassPart,
    /// A kind this crate does not know
    Unknown(i32),
}

impl MetadataKind {
    /// Maps the `k` value of the annotation.
    #[must_use]
    pub fn from_id(id: i32) -> MetadataKind {
        match id {
            1 => MetadataKind::Class,
            2 => MetadataKind::File,
            3 => MetadataKind::SyntheticClass,
            4 => MetadataKind::MultiFileClassFacade,
            5 => MetadataKind::MultiFileClassPart,
            other => MetadataKind::Unknown(other),
        }
    }

    /// Returns `true` if `d1` holds a `Package` message.
    #[must_use]
    pub fn is_package(self) -> bool {
        matches!(self, MetadataKind::File | MetadataKind::MultiFileClassPart)
    }
}

/// Kotlin visibility of a declaration, bits 1..=3 of its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    /// `internal`: visible inside the module
    Internal,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `public`
    Public,
    /// `private` to the receiver instance (`private` members of type-parameterized classes)
    PrivateToThis,
    /// Declared inside a function body
    Local,
}

impl Visibility {
    /// Extracts the visibility from declaration flags.
    #[must_use]
    pub fn from_flags(flags: u64) -> Visibility {
        match (flags >> 1) & 7 {
            0 => Visibility::Internal,
            1 => Visibility::Private,
            2 => Visibility::Protected,
            4 => Visibility::PrivateToThis,
            5 => Visibility::Local,
            _ => Visibility::Public,
        }
    }

    /// Returns `true` if declarations with this visibility are not part of the ABI.
    ///
    /// `internal` only counts when `treat_internal_as_private` is set.
    #[must_use]
    pub fn is_private_tier(self, treat_internal_as_private: bool) -> bool {
        match self {
            Visibility::Private | Visibility::PrivateToThis | Visibility::Local => true,
            Visibility::Internal => treat_internal_as_private,
            Visibility::Public | Visibility::Protected => false,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Boolean flags of a function declaration
    pub struct FunctionFlags: u64 {
        /// Has annotations
        const HAS_ANNOTATIONS = 1 << 0;
        /// Declared `operator`
        const IS_OPERATOR = 1 << 8;
        /// Declared `infix`
        const IS_INFIX = 1 << 9;
        /// Declared `inline`
        const IS_INLINE = 1 << 10;
        /// Declared `tailrec`
        const IS_TAILREC = 1 << 11;
        /// Declared `external`
        const IS_EXTERNAL = 1 << 12;
        /// Declared `suspend`
        const IS_SUSPEND = 1 << 13;
        /// Declared `expect`
        const IS_EXPECT = 1 << 14;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Boolean flags of a property declaration
    pub struct PropertyFlags: u64 {
        /// Has annotations
        const HAS_ANNOTATIONS = 1 << 0;
        /// Declared `var`
        const IS_VAR = 1 << 8;
        /// Has a getter
        const HAS_GETTER = 1 << 9;
        /// Has a setter
        const HAS_SETTER = 1 << 10;
        /// Declared `const`
        const IS_CONST = 1 << 11;
        /// Declared `lateinit`
        const IS_LATEINIT = 1 << 12;
        /// The initializer is a compile-time constant
        const HAS_CONSTANT = 1 << 13;
        /// Declared `external`
        const IS_EXTERNAL = 1 << 14;
        /// Declared with `by`
        const IS_DELEGATED = 1 << 15;
        /// Declared `expect`
        const IS_EXPECT = 1 << 16;
    }
}

/// Member kind value of compiler-generated members such as `componentN` and `copy`
const MEMBER_KIND_SYNTHESIZED: u64 = 3;

/// Converts pre-1.1 function and property flags to the current layout.
fn load_old_flags(old_flags: u64) -> u64 {
    (old_flags & 0x3F) + ((old_flags >> 8) << 6)
}

/// A JVM name and descriptor recorded for a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvmSignature {
    /// Method or field name on the JVM
    pub name: String,
    /// JVM descriptor, when recorded
    pub descriptor: Option<String>,
}

impl JvmSignature {
    /// Name and descriptor concatenated, e.g. `foo(I)V`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}{}", self.name, self.descriptor.as_deref().unwrap_or(""))
    }

    fn parse(message: &Message, resolver: &NameResolver, default_name: &str) -> Result<JvmSignature> {
        let name = match message.varint(SIGNATURE_NAME) {
            Some(index) => resolver.string(index)?,
            None => default_name.to_string(),
        };
        let descriptor = message
            .varint(SIGNATURE_DESC)
            .map(|index| resolver.string(index))
            .transpose()?;
        Ok(JvmSignature { name, descriptor })
    }
}

fn resolve_name(message: &Message, resolver: &NameResolver) -> Result<String> {
    let index = message
        .varint(NAME)
        .ok_or_else(|| malformed_error!("Declaration without a name"))?;
    resolver.string(index)
}

/// A secondary or primary constructor.
#[derive(Debug, Clone)]
pub struct Constructor {
    message: Message,
    /// Raw flags
    pub flags: u64,
}

impl Constructor {
    fn parse(message: Message) -> Constructor {
        let flags = message.varint(OLD_FLAGS).unwrap_or(DEFAULT_FLAGS);
        Constructor { message, flags }
    }

    /// Kotlin visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct Function {
    message: Message,
    /// Kotlin name
    pub name: String,
    /// Flags in the current layout
    pub flags: u64,
    /// JVM method the function compiles to
    pub jvm: JvmSignature,
}

impl Function {
    fn parse(message: Message, resolver: &NameResolver) -> Result<Function> {
        let name = resolve_name(&message, resolver)?;
        let flags = match (message.varint(FUNCTION_FLAGS), message.varint(OLD_FLAGS)) {
            (Some(flags), _) => flags,
            (None, Some(old_flags)) => load_old_flags(old_flags),
            (None, None) => DEFAULT_FLAGS,
        };
        let jvm = match message.message(JVM_SIGNATURE)? {
            Some(signature) => JvmSignature::parse(&signature, resolver, &name)?,
            None => JvmSignature {
                name: name.clone(),
                descriptor: None,
            },
        };

        Ok(Function {
            message,
            name,
            flags,
            jvm,
        })
    }

    /// Kotlin visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }

    /// Declared `inline`.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        FunctionFlags::from_bits_retain(self.flags).contains(FunctionFlags::IS_INLINE)
    }

    /// Generated by the compiler for a data class (`componentN`, `copy`).
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        (self.flags >> 6) & 3 == MEMBER_KIND_SYNTHESIZED
    }

    /// The JVM signature used as secondary sort key.
    #[must_use]
    pub fn signature(&self) -> String {
        self.jvm.render()
    }
}

/// A property declaration.
#[derive(Debug, Clone)]
pub struct Property {
    message: Message,
    /// Kotlin name
    pub name: String,
    /// Flags in the current layout
    pub flags: u64,
    /// Backing field, if recorded
    pub field: Option<JvmSignature>,
    /// Getter method, if recorded
    pub getter: Option<JvmSignature>,
    /// Setter method, if recorded
    pub setter: Option<JvmSignature>,
}

impl Property {
    fn parse(message: Message, resolver: &NameResolver) -> Result<Property> {
        let name = resolve_name(&message, resolver)?;
        let flags = match (message.varint(PROPERTY_FLAGS), message.varint(OLD_FLAGS)) {
            (Some(flags), _) => flags,
            (None, Some(old_flags)) => load_old_flags(old_flags),
            (None, None) => DEFAULT_PROPERTY_FLAGS,
        };

        let (field, getter, setter) = match message.message(JVM_SIGNATURE)? {
            Some(signature) => {
                let part = |number: u32, default_name: &str| -> Result<Option<JvmSignature>> {
                    signature
                        .message(number)?
                        .map(|part| JvmSignature::parse(&part, resolver, default_name))
                        .transpose()
                };
                (
                    part(PROPERTY_SIGNATURE_FIELD, &name)?,
                    part(PROPERTY_SIGNATURE_GETTER, &default_getter_name(&name))?,
                    part(PROPERTY_SIGNATURE_SETTER, &default_setter_name(&name))?,
                )
            }
            None => {
                let property_flags = PropertyFlags::from_bits_retain(flags);
                let accessor = |present: bool, jvm_name: String| {
                    present.then(|| JvmSignature {
                        name: jvm_name,
                        descriptor: None,
                    })
                };
                (
                    Some(JvmSignature {
                        name: name.clone(),
                        descriptor: None,
                    }),
                    accessor(
                        property_flags.contains(PropertyFlags::HAS_GETTER),
                        default_getter_name(&name),
                    ),
                    accessor(
                        property_flags.contains(PropertyFlags::HAS_SETTER),
                        default_setter_name(&name),
                    ),
                )
            }
        };

        Ok(Property {
            message,
            name,
            flags,
            field,
            getter,
            setter,
        })
    }

    /// Kotlin visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }

    /// Boolean property flags.
    #[must_use]
    pub fn property_flags(&self) -> PropertyFlags {
        PropertyFlags::from_bits_retain(self.flags)
    }

    /// Declared `const`.
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.property_flags().contains(PropertyFlags::IS_CONST)
    }

    /// The initializer is recorded as a compile-time constant.
    #[must_use]
    pub fn has_constant(&self) -> bool {
        self.property_flags().contains(PropertyFlags::HAS_CONSTANT)
    }

    /// Clears [`PropertyFlags::HAS_CONSTANT`] in the model and in the encoded message.
    pub fn clear_has_constant(&mut self) {
        if !self.has_constant() {
            return;
        }
        self.flags &= !PropertyFlags::HAS_CONSTANT.bits();

        if self.message.varint(PROPERTY_FLAGS).is_some() {
            self.message.set_varint(PROPERTY_FLAGS, self.flags);
        } else {
            // Pre-1.1 layout stores bit 13 of the current layout at bit 15
            let old_flags = self
                .message
                .varint(OLD_FLAGS)
                .unwrap_or(DEFAULT_PROPERTY_OLD_FLAGS);
            self.message.set_varint(OLD_FLAGS, old_flags & !(1 << 15));
        }
    }

    /// JVM names of the backing field and accessors.
    pub fn jvm_names(&self) -> impl Iterator<Item = &str> {
        [&self.field, &self.getter, &self.setter]
            .into_iter()
            .flatten()
            .map(|signature| signature.name.as_str())
    }

    /// The getter signature (or field signature for fields without getter) used as sort key.
    #[must_use]
    pub fn signature(&self) -> String {
        self.getter
            .as_ref()
            .or(self.field.as_ref())
            .map_or_else(|| self.name.clone(), JvmSignature::render)
    }
}

/// Default JVM getter name of a property, following the `isFoo` convention.
fn default_getter_name(name: &str) -> String {
    if starts_with_is_prefix(name) {
        name.to_string()
    } else {
        format!("get{}", capitalize(name))
    }
}

/// Default JVM setter name of a property, following the `isFoo` convention.
fn default_setter_name(name: &str) -> String {
    if starts_with_is_prefix(name) {
        format!("set{}", &name[2..])
    } else {
        format!("set{}", capitalize(name))
    }
}

fn starts_with_is_prefix(name: &str) -> bool {
    name.strip_prefix("is")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_ascii_lowercase())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// A type alias declaration.
#[derive(Debug, Clone)]
pub struct TypeAlias {
    message: Message,
    /// Kotlin name
    pub name: String,
    /// Raw flags
    pub flags: u64,
}

impl TypeAlias {
    fn parse(message: Message, resolver: &NameResolver) -> Result<TypeAlias> {
        Ok(TypeAlias {
            name: resolve_name(&message, resolver)?,
            flags: message.varint(OLD_FLAGS).unwrap_or(DEFAULT_FLAGS),
            message,
        })
    }

    /// Kotlin visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }
}

/// A simple name referenced by index, e.g. a nested class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    /// Index into the string table
    pub index: u64,
    /// Resolved name
    pub name: String,
}

/// Class-only information.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Raw class flags
    pub flags: u64,
    /// Fully qualified class id, e.g. `com/x/Outer.Inner`
    pub fq_name: String,
    /// Simple name of the companion object
    pub companion_object: Option<NameRef>,
    /// Simple names of the nested classes
    pub nested_classes: Vec<NameRef>,
    /// Names of the enum entries
    pub enum_entries: usize,
}

impl ClassInfo {
    /// Kotlin visibility of the class.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }
}

/// The declarations of a class or package.
#[derive(Debug, Clone)]
pub struct Declarations {
    /// Container message; the declaration lists are written back from the fields below
    message: Message,
    layout: &'static Layout,
    /// Present for [`MetadataKind::Class`]
    pub class: Option<ClassInfo>,
    /// Constructors (classes only)
    pub constructors: Vec<Constructor>,
    /// Member or top-level functions
    pub functions: Vec<Function>,
    /// Member or top-level properties
    pub properties: Vec<Property>,
    /// Type aliases
    pub type_aliases: Vec<TypeAlias>,
    /// Delegated local variables recorded for reflection
    pub local_delegated_properties: Vec<Property>,
}

impl Declarations {
    fn parse(message: Message, kind: MetadataKind, resolver: &NameResolver) -> Result<Declarations> {
        let layout = if kind.is_package() {
            &PACKAGE_LAYOUT
        } else {
            &CLASS_LAYOUT
        };

        let class = if kind == MetadataKind::Class {
            let name_ref = |index: u64| -> Result<NameRef> {
                Ok(NameRef {
                    index,
                    name: resolver.string(index)?,
                })
            };
            Some(ClassInfo {
                flags: message.varint(CLASS_FLAGS).unwrap_or(DEFAULT_FLAGS),
                fq_name: message
                    .varint(CLASS_FQ_NAME)
                    .map(|index| resolver.string(index))
                    .transpose()?
                    .unwrap_or_default(),
                companion_object: message
                    .varint(CLASS_COMPANION_OBJECT_NAME)
                    .map(name_ref)
                    .transpose()?,
                nested_classes: message
                    .varints(CLASS_NESTED_CLASS_NAME)?
                    .into_iter()
                    .map(name_ref)
                    .collect::<Result<_>>()?,
                enum_entries: message.messages(CLASS_ENUM_ENTRY)?.len(),
            })
        } else {
            None
        };

        let constructors = match layout.constructor {
            Some(number) => message
                .messages(number)?
                .into_iter()
                .map(Constructor::parse)
                .collect(),
            None => Vec::new(),
        };
        let functions = message
            .messages(layout.function)?
            .into_iter()
            .map(|function| Function::parse(function, resolver))
            .collect::<Result<_>>()?;
        let properties = message
            .messages(layout.property)?
            .into_iter()
            .map(|property| Property::parse(property, resolver))
            .collect::<Result<_>>()?;
        let type_aliases = message
            .messages(layout.type_alias)?
            .into_iter()
            .map(|alias| TypeAlias::parse(alias, resolver))
            .collect::<Result<_>>()?;
        let local_delegated_properties = message
            .messages(LOCAL_DELEGATED_PROPERTY)?
            .into_iter()
            .map(|property| Property::parse(property, resolver))
            .collect::<Result<_>>()?;

        Ok(Declarations {
            message,
            layout,
            class,
            constructors,
            functions,
            properties,
            type_aliases,
            local_delegated_properties,
        })
    }

    /// Re-assembles the container message from the current declaration lists.
    fn to_message(&self) -> Message {
        fn encoded<'a>(number: u32, messages: impl Iterator<Item = &'a Message>) -> Vec<Field> {
            messages
                .map(|message| Field {
                    number,
                    value: WireValue::Bytes(message.to_bytes()),
                })
                .collect()
        }

        let mut message = self.message.clone();

        if let Some(class) = &self.class {
            match &class.companion_object {
                Some(companion) => {
                    if message.varint(CLASS_COMPANION_OBJECT_NAME) != Some(companion.index) {
                        message.set_varint(CLASS_COMPANION_OBJECT_NAME, companion.index);
                    }
                }
                None => message.remove(CLASS_COMPANION_OBJECT_NAME),
            }

            let nested: Vec<u64> = class.nested_classes.iter().map(|nested| nested.index).collect();
            let replacement = if nested.is_empty() {
                Vec::new()
            } else {
                vec![Field {
                    number: CLASS_NESTED_CLASS_NAME,
                    value: WireValue::Bytes(pack_varints(&nested)),
                }]
            };
            message.replace(CLASS_NESTED_CLASS_NAME, replacement);
        }

        if let Some(number) = self.layout.constructor {
            message.replace(
                number,
                encoded(number, self.constructors.iter().map(|c| &c.message)),
            );
        }
        message.replace(
            self.layout.function,
            encoded(self.layout.function, self.functions.iter().map(|f| &f.message)),
        );
        message.replace(
            self.layout.property,
            encoded(self.layout.property, self.properties.iter().map(|p| &p.message)),
        );
        message.replace(
            self.layout.type_alias,
            encoded(self.layout.type_alias, self.type_aliases.iter().map(|t| &t.message)),
        );
        message.replace(
            LOCAL_DELEGATED_PROPERTY,
            encoded(
                LOCAL_DELEGATED_PROPERTY,
                self.local_delegated_properties.iter().map(|p| &p.message),
            ),
        );

        message
    }
}

/// Decoded payload of a class, file facade or multi-file part.
#[derive(Debug, Clone)]
struct Body {
    /// Decoded `d1` bytes as read
    payload: Vec<u8>,
    /// Length of the delimited string table at the start of `payload`
    string_table_len: usize,
    resolver: NameResolver,
    declarations: Declarations,
}

/// `@kotlin.Metadata` of one class file, decoded into declarations.
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    header: MetadataHeader,
    kind: MetadataKind,
    body: Option<Body>,
}

impl ClassMetadata {
    /// Decodes the declarations described by `header`.
    ///
    /// Synthetic classes, multi-file facades, unknown kinds and headers without `d1` are kept
    /// opaque: [`ClassMetadata::declarations`] is `None` and the header is written back as is.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if `d1` is corrupt.
    pub fn parse(header: &MetadataHeader) -> Result<ClassMetadata> {
        let kind = MetadataKind::from_id(header.kind);
        let has_declarations = matches!(
            kind,
            MetadataKind::Class | MetadataKind::File | MetadataKind::MultiFileClassPart
        );
        if !has_declarations || header.data1.is_empty() {
            return Ok(ClassMetadata {
                header: header.clone(),
                kind,
                body: None,
            });
        }

        let payload = decode_bytes(&header.data1)?;
        let mut parser = Parser::new(&payload);
        let (table, _) = Message::parse_delimited(&mut parser)?;
        let string_table_len = parser.pos();
        let message = Message::parse(parser.remaining())?;

        let resolver = NameResolver::new(&table, header.data2.clone())?;
        let declarations = Declarations::parse(message, kind, &resolver)?;

        Ok(ClassMetadata {
            header: header.clone(),
            kind,
            body: Some(Body {
                payload,
                string_table_len,
                resolver,
                declarations,
            }),
        })
    }

    /// The kind from `k`.
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    /// The header this model was decoded from.
    #[must_use]
    pub fn header(&self) -> &MetadataHeader {
        &self.header
    }

    /// The declarations, when the kind carries any.
    #[must_use]
    pub fn declarations(&self) -> Option<&Declarations> {
        self.body.as_ref().map(|body| &body.declarations)
    }

    /// Mutable access to the declarations.
    pub fn declarations_mut(&mut self) -> Option<&mut Declarations> {
        self.body.as_mut().map(|body| &mut body.declarations)
    }

    /// Resolves a string index of the payload.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if there is no payload or the index is invalid.
    pub fn string(&self, index: u64) -> Result<String> {
        match &self.body {
            Some(body) => body.resolver.string(index),
            None => Err(malformed_error!("Metadata of kind {} has no string table", self.kind)),
        }
    }

    /// Kotlin visibility of the class itself; `None` unless the kind is
    /// [`MetadataKind::Class`].
    #[must_use]
    pub fn class_visibility(&self) -> Option<Visibility> {
        self.declarations()
            .and_then(|declarations| declarations.class.as_ref())
            .map(ClassInfo::visibility)
    }

    /// JVM names of every `internal` function and property (field, getter and setter).
    #[must_use]
    pub fn internal_member_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        if let Some(declarations) = self.declarations() {
            for function in &declarations.functions {
                if function.visibility() == Visibility::Internal {
                    names.insert(function.jvm.name.clone());
                }
            }
            for property in &declarations.properties {
                if property.visibility() == Visibility::Internal {
                    names.extend(property.jvm_names().map(str::to_string));
                }
            }
        }
        names
    }

    /// JVM names of every `inline` function.
    #[must_use]
    pub fn inline_function_names(&self) -> HashSet<String> {
        self.declarations()
            .map(|declarations| {
                declarations
                    .functions
                    .iter()
                    .filter(|function| function.is_inline())
                    .map(|function| function.jvm.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Encodes the current model back into a header.
    ///
    /// When the encoded payload equals the payload that was read, the original `d1` strings are
    /// reused unchanged, so an unmodified model reproduces its header exactly.
    #[must_use]
    pub fn to_header(&self) -> MetadataHeader {
        let Some(body) = &self.body else {
            return self.header.clone();
        };

        let mut payload = body.payload[..body.string_table_len].to_vec();
        body.declarations.to_message().write(&mut payload);

        let mut header = self.header.clone();
        if payload != body.payload {
            header.data1 = encode_bytes(&payload);
        }
        header
    }

    /// Emits [`ClassMetadata::to_header`] as annotation element events.
    ///
    /// # Errors
    /// Propagates the first error returned by `visitor`.
    pub fn write_to(&self, visitor: &mut impl AnnotationVisitor) -> Result<()> {
        self.to_header().accept(visitor)
    }
}
