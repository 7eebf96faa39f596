//! Factory methods for Kotlin metadata test data.
//!
//! Payloads are built with an empty string table, so every name index points straight into
//! `d2`.

use crate::metadata::{
    bitencoding::encode_bytes,
    model::{
        CLASS_COMPANION_OBJECT_NAME, CLASS_CONSTRUCTOR, CLASS_FLAGS, CLASS_FQ_NAME,
        CLASS_FUNCTION, CLASS_NESTED_CLASS_NAME, CLASS_PROPERTY, CLASS_TYPE_ALIAS,
        FUNCTION_FLAGS, JVM_SIGNATURE, LOCAL_DELEGATED_PROPERTY, NAME, OLD_FLAGS,
        PACKAGE_FUNCTION, PACKAGE_PROPERTY, PACKAGE_TYPE_ALIAS, PROPERTY_FLAGS,
        PROPERTY_SIGNATURE_FIELD, PROPERTY_SIGNATURE_GETTER, PROPERTY_SIGNATURE_SETTER,
        SIGNATURE_DESC, SIGNATURE_NAME,
    },
    proto::{pack_varints, Message, WireValue},
    MetadataHeader, Visibility,
};

/// `Flags.IS_INLINE` of a function
pub const INLINE: u64 = 1 << 10;
/// `Flags.HAS_GETTER` of a property
pub const HAS_GETTER: u64 = 1 << 9;
/// `Flags.HAS_SETTER` of a property
pub const HAS_SETTER: u64 = 1 << 10;
/// `Flags.IS_CONST` of a property
pub const IS_CONST: u64 = 1 << 11;
/// `Flags.HAS_CONSTANT` of a property
pub const HAS_CONSTANT: u64 = 1 << 13;

/// Visibility bits of declaration flags
pub fn visibility_flags(visibility: Visibility) -> u64 {
    let code = match visibility {
        Visibility::Internal => 0,
        Visibility::Private => 1,
        Visibility::Protected => 2,
        Visibility::Public => 3,
        Visibility::PrivateToThis => 4,
        Visibility::Local => 5,
    };
    code << 1
}

/// Builds `@kotlin.Metadata` headers for class files and file facades.
pub struct MetadataBuilder {
    kind: i32,
    strings: Vec<String>,
    message: Message,
    function_field: u32,
    property_field: u32,
    type_alias_field: u32,
    tail: Vec<(u32, Message)>,
}

impl MetadataBuilder {
    /// Metadata of a class (`k = 1`) with the given class id and flags
    pub fn class(fq_name: &str, visibility: Visibility) -> Self {
        let mut builder = MetadataBuilder {
            kind: 1,
            strings: Vec::new(),
            message: Message::new(),
            function_field: CLASS_FUNCTION,
            property_field: CLASS_PROPERTY,
            type_alias_field: CLASS_TYPE_ALIAS,
            tail: Vec::new(),
        };
        builder
            .message
            .push(CLASS_FLAGS, WireValue::Varint(visibility_flags(visibility)));
        let name = builder.string(fq_name);
        builder.message.push(CLASS_FQ_NAME, WireValue::Varint(name));
        builder
    }

    /// Metadata of a file facade (`k = 2`)
    pub fn file() -> Self {
        MetadataBuilder {
            kind: 2,
            strings: Vec::new(),
            message: Message::new(),
            function_field: PACKAGE_FUNCTION,
            property_field: PACKAGE_PROPERTY,
            type_alias_field: PACKAGE_TYPE_ALIAS,
            tail: Vec::new(),
        }
    }

    fn string(&mut self, value: &str) -> u64 {
        match self.strings.iter().position(|existing| existing == value) {
            Some(index) => index as u64,
            None => {
                self.strings.push(value.to_string());
                (self.strings.len() - 1) as u64
            }
        }
    }

    fn signature(&mut self, name: &str, descriptor: &str) -> Message {
        let mut signature = Message::new();
        let name = self.string(name);
        signature.push(SIGNATURE_NAME, WireValue::Varint(name));
        let descriptor = self.string(descriptor);
        signature.push(SIGNATURE_DESC, WireValue::Varint(descriptor));
        signature
    }

    pub fn companion(mut self, name: &str) -> Self {
        let index = self.string(name);
        self.message
            .push(CLASS_COMPANION_OBJECT_NAME, WireValue::Varint(index));
        self
    }

    /// Nested class names, written packed as the compiler does
    pub fn nested_classes(mut self, names: &[&str]) -> Self {
        let indices: Vec<u64> = names.iter().map(|name| self.string(name)).collect();
        self.message.push(
            CLASS_NESTED_CLASS_NAME,
            WireValue::Bytes(pack_varints(&indices)),
        );
        self
    }

    pub fn constructor(mut self, visibility: Visibility) -> Self {
        let mut constructor = Message::new();
        constructor.push(OLD_FLAGS, WireValue::Varint(visibility_flags(visibility)));
        self.message.push_message(CLASS_CONSTRUCTOR, &constructor);
        self
    }

    /// A function with explicit flags and JVM descriptor
    pub fn function_with_flags(mut self, name: &str, flags: u64, descriptor: &str) -> Self {
        let mut function = Message::new();
        let name_index = self.string(name);
        function.push(NAME, WireValue::Varint(name_index));
        function.push(FUNCTION_FLAGS, WireValue::Varint(flags));
        let signature = self.signature(name, descriptor);
        function.push_message(JVM_SIGNATURE, &signature);
        self.message.push_message(self.function_field, &function);
        self
    }

    pub fn function(self, name: &str, visibility: Visibility, descriptor: &str) -> Self {
        self.function_with_flags(name, visibility_flags(visibility), descriptor)
    }

    /// A function compiled under a different JVM name, e.g. a mangled `internal` function
    pub fn function_with_jvm_name(
        mut self,
        name: &str,
        visibility: Visibility,
        jvm_name: &str,
        descriptor: &str,
    ) -> Self {
        let mut function = Message::new();
        let name_index = self.string(name);
        function.push(NAME, WireValue::Varint(name_index));
        function.push(
            FUNCTION_FLAGS,
            WireValue::Varint(visibility_flags(visibility)),
        );
        let signature = self.signature(jvm_name, descriptor);
        function.push_message(JVM_SIGNATURE, &signature);
        self.message.push_message(self.function_field, &function);
        self
    }

    /// A property with a backing field of type `descriptor` and a getter
    pub fn property_with_flags(mut self, name: &str, flags: u64, descriptor: &str) -> Self {
        let property = self.property_message(name, flags, descriptor);
        self.message.push_message(self.property_field, &property);
        self
    }

    pub fn property(self, name: &str, visibility: Visibility, descriptor: &str) -> Self {
        self.property_with_flags(name, visibility_flags(visibility) | HAS_GETTER, descriptor)
    }

    /// A property in the pre-1.1 layout with only `old_flags` set
    pub fn property_with_old_flags(mut self, name: &str, old_flags: u64) -> Self {
        let mut property = Message::new();
        property.push(OLD_FLAGS, WireValue::Varint(old_flags));
        let name_index = self.string(name);
        property.push(NAME, WireValue::Varint(name_index));
        self.message.push_message(self.property_field, &property);
        self
    }

    fn property_message(&mut self, name: &str, flags: u64, descriptor: &str) -> Message {
        let mut property = Message::new();
        let name_index = self.string(name);
        property.push(NAME, WireValue::Varint(name_index));
        property.push(PROPERTY_FLAGS, WireValue::Varint(flags));

        let mut signature = Message::new();
        let field = self.signature(name, descriptor);
        signature.push_message(PROPERTY_SIGNATURE_FIELD, &field);
        if flags & HAS_GETTER != 0 {
            let getter_name = format!("get{}{}", name[..1].to_uppercase(), &name[1..]);
            let getter = self.signature(&getter_name, &format!("(){descriptor}"));
            signature.push_message(PROPERTY_SIGNATURE_GETTER, &getter);
        }
        if flags & HAS_SETTER != 0 {
            let setter_name = format!("set{}{}", name[..1].to_uppercase(), &name[1..]);
            let setter = self.signature(&setter_name, &format!("({descriptor})V"));
            signature.push_message(PROPERTY_SIGNATURE_SETTER, &setter);
        }
        property.push_message(JVM_SIGNATURE, &signature);
        property
    }

    pub fn type_alias(mut self, name: &str, visibility: Visibility) -> Self {
        let mut alias = Message::new();
        alias.push(OLD_FLAGS, WireValue::Varint(visibility_flags(visibility)));
        let name_index = self.string(name);
        alias.push(NAME, WireValue::Varint(name_index));
        self.message.push_message(self.type_alias_field, &alias);
        self
    }

    /// A delegated local variable, recorded in extension field 102
    pub fn local_delegated_property(mut self, name: &str) -> Self {
        let property = self.property_message(name, visibility_flags(Visibility::Local), "I");
        self.tail.push((LOCAL_DELEGATED_PROPERTY, property));
        self
    }

    /// Encodes the payload and returns the header
    pub fn build(mut self) -> MetadataHeader {
        for (number, message) in std::mem::take(&mut self.tail) {
            self.message.push_message(number, &message);
        }

        // Empty delimited string table
        let mut payload = vec![0u8];
        self.message.write(&mut payload);

        MetadataHeader {
            kind: self.kind,
            metadata_version: vec![1, 9, 0],
            data1: encode_bytes(&payload),
            data2: self.strings,
            extra_int: 48,
            ..MetadataHeader::default()
        }
    }
}
