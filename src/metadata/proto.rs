//! A schema-less protobuf wire format codec.
//!
//! Messages are kept as the ordered list of fields found on the wire. Fields this crate never
//! looks at (types, type parameters, contracts, version requirements, compiler extensions) are
//! carried through untouched, and a message that is not modified re-encodes to exactly the bytes
//! it was parsed from. Accessors follow protobuf semantics: for a scalar field the last
//! occurrence wins, repeated fields may be packed or not.

use crate::{file::parser::Parser, Result};

/// The payload of one field, by wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// Wire type 0
    Varint(u64),
    /// Wire type 1
    Fixed64(u64),
    /// Wire type 2: strings, bytes, nested messages and packed repeated fields
    Bytes(Vec<u8>),
    /// Wire type 5
    Fixed32(u32),
}

/// One field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field number
    pub number: u32,
    /// Field payload
    pub value: WireValue,
}

/// A protobuf message as an ordered list of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Message {
        Message::default()
    }

    /// Parses a message spanning all of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input and [`crate::Error::Malformed`]
    /// for invalid tags or the deprecated group wire types.
    pub fn parse(data: &[u8]) -> Result<Message> {
        let mut parser = Parser::new(data);
        let mut fields = Vec::new();
        while parser.has_more_data() {
            let tag = parser.read_varint()?;
            let number = u32::try_from(tag >> 3)
                .ok()
                .filter(|&number| number != 0)
                .ok_or_else(|| malformed_error!("Invalid protobuf field number in tag {}", tag))?;

            let value = match tag & 7 {
                0 => WireValue::Varint(parser.read_varint()?),
                1 => WireValue::Fixed64(u64::from_le_bytes(read_array(&mut parser)?)),
                2 => {
                    let len = usize::try_from(parser.read_varint()?)
                        .map_err(|_| malformed_error!("Length of field {} overflows", number))?;
                    WireValue::Bytes(parser.read_bytes(len)?.to_vec())
                }
                5 => WireValue::Fixed32(u32::from_le_bytes(read_array(&mut parser)?)),
                wire_type => {
                    return Err(malformed_error!(
                        "Unsupported wire type {} for field {}",
                        wire_type,
                        number
                    ))
                }
            };
            fields.push(Field { number, value });
        }

        Ok(Message { fields })
    }

    /// Parses a length-prefixed message and returns it with the raw bytes of its body.
    ///
    /// # Errors
    /// See [`Message::parse`].
    pub fn parse_delimited<'a>(parser: &mut Parser<'a>) -> Result<(Message, &'a [u8])> {
        let len = usize::try_from(parser.read_varint()?)
            .map_err(|_| malformed_error!("Delimited message length overflows"))?;
        let body = parser.read_bytes(len)?;
        Ok((Message::parse(body)?, body))
    }

    /// Appends the encoded message to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            match &field.value {
                WireValue::Varint(value) => {
                    write_varint(out, u64::from(field.number) << 3);
                    write_varint(out, *value);
                }
                WireValue::Fixed64(value) => {
                    write_varint(out, (u64::from(field.number) << 3) | 1);
                    out.extend_from_slice(&value.to_le_bytes());
                }
                WireValue::Bytes(bytes) => {
                    write_varint(out, (u64::from(field.number) << 3) | 2);
                    write_varint(out, bytes.len() as u64);
                    out.extend_from_slice(bytes);
                }
                WireValue::Fixed32(value) => {
                    write_varint(out, (u64::from(field.number) << 3) | 5);
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    /// Returns the encoded message.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// All fields in wire order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns `true` if at least one occurrence of `number` exists.
    #[must_use]
    pub fn has(&self, number: u32) -> bool {
        self.fields.iter().any(|field| field.number == number)
    }

    /// The last varint occurrence of `number`.
    #[must_use]
    pub fn varint(&self, number: u32) -> Option<u64> {
        self.fields
            .iter()
            .rev()
            .find_map(|field| match (&field.value, field.number == number) {
                (WireValue::Varint(value), true) => Some(*value),
                _ => None,
            })
    }

    /// The last length-delimited occurrence of `number`.
    #[must_use]
    pub fn bytes(&self, number: u32) -> Option<&[u8]> {
        self.fields
            .iter()
            .rev()
            .find_map(|field| match (&field.value, field.number == number) {
                (WireValue::Bytes(bytes), true) => Some(bytes.as_slice()),
                _ => None,
            })
    }

    /// The nested message in field `number`, if present.
    ///
    /// Protobuf merges repeated occurrences of a singular message field; the compiler never
    /// writes more than one, so the last occurrence is used.
    ///
    /// # Errors
    /// See [`Message::parse`].
    pub fn message(&self, number: u32) -> Result<Option<Message>> {
        self.bytes(number).map(Message::parse).transpose()
    }

    /// Every nested message in the repeated field `number`.
    ///
    /// # Errors
    /// See [`Message::parse`].
    pub fn messages(&self, number: u32) -> Result<Vec<Message>> {
        self.fields
            .iter()
            .filter(|field| field.number == number)
            .filter_map(|field| match &field.value {
                WireValue::Bytes(bytes) => Some(Message::parse(bytes)),
                _ => None,
            })
            .collect()
    }

    /// Every value of the repeated integer field `number`, packed or unpacked.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for a corrupt packed
    /// payload.
    pub fn varints(&self, number: u32) -> Result<Vec<u64>> {
        let mut values = Vec::new();
        for field in self.fields.iter().filter(|field| field.number == number) {
            match &field.value {
                WireValue::Varint(value) => values.push(*value),
                WireValue::Bytes(packed) => {
                    let mut parser = Parser::new(packed);
                    while parser.has_more_data() {
                        values.push(parser.read_varint()?);
                    }
                }
                _ => {}
            }
        }
        Ok(values)
    }

    /// Sets the varint field `number`: the last occurrence is updated, or a new field is
    /// inserted before the first field with a higher number.
    pub fn set_varint(&mut self, number: u32, value: u64) {
        let existing = self
            .fields
            .iter_mut()
            .rev()
            .find(|field| field.number == number && matches!(field.value, WireValue::Varint(_)));
        if let Some(field) = existing {
            field.value = WireValue::Varint(value);
            return;
        }

        let at = self
            .fields
            .iter()
            .position(|field| field.number > number)
            .unwrap_or(self.fields.len());
        self.fields.insert(
            at,
            Field {
                number,
                value: WireValue::Varint(value),
            },
        );
    }

    /// Removes every occurrence of `number`.
    pub fn remove(&mut self, number: u32) {
        self.fields.retain(|field| field.number != number);
    }

    /// Replaces all occurrences of `number` with `replacement`, keeping the position of the
    /// first occurrence. If the field was absent, the replacement goes before the first field
    /// with a higher number.
    pub fn replace(&mut self, number: u32, replacement: Vec<Field>) {
        let at = self
            .fields
            .iter()
            .position(|field| field.number == number)
            .or_else(|| self.fields.iter().position(|field| field.number > number))
            .unwrap_or(self.fields.len());

        let mut fields = Vec::with_capacity(self.fields.len() + replacement.len());
        let mut replacement = Some(replacement);
        for (index, field) in std::mem::take(&mut self.fields).into_iter().enumerate() {
            if index == at {
                if let Some(replacement) = replacement.take() {
                    fields.extend(replacement);
                }
            }
            if field.number != number {
                fields.push(field);
            }
        }
        if let Some(replacement) = replacement {
            fields.extend(replacement);
        }
        self.fields = fields;
    }

    /// Appends a field occurrence.
    pub fn push(&mut self, number: u32, value: WireValue) {
        self.fields.push(Field { number, value });
    }

    /// Appends a nested message.
    pub fn push_message(&mut self, number: u32, message: &Message) {
        self.push(number, WireValue::Bytes(message.to_bytes()));
    }
}

fn read_array<const N: usize>(parser: &mut Parser) -> Result<[u8; N]> {
    let bytes = parser.read_bytes(N)?;
    let mut array = [0u8; N];
    array.copy_from_slice(bytes);
    Ok(array)
}

/// Appends `value` as a base-128 varint.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Encodes `values` as a packed repeated varint payload.
#[must_use]
pub fn pack_varints(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        write_varint(&mut out, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_write_preserve_bytes() {
        // flags = 6, name = 3, nested { 1: 150 }, fixed32, fixed64, unknown field 1000
        let data = vec![
            0x08, 0x06, 0x10, 0x03, 0x1A, 0x03, 0x08, 0x96, 0x01, 0x25, 1, 2, 3, 4, 0x29, 1, 2, 3,
            4, 5, 6, 7, 8, 0xC0, 0x3E, 0x01,
        ];
        let message = Message::parse(&data).unwrap();
        assert_eq!(message.fields().len(), 6);
        assert_eq!(message.varint(1), Some(6));
        assert_eq!(message.varint(2), Some(3));
        assert_eq!(message.message(3).unwrap().unwrap().varint(1), Some(150));
        assert_eq!(message.varint(1000), Some(1));
        assert_eq!(message.to_bytes(), data);
    }

    #[test]
    fn packed_and_unpacked_repeated() {
        let mut message = Message::new();
        message.push(7, WireValue::Bytes(pack_varints(&[1, 300, 2])));
        message.push(7, WireValue::Varint(9));
        assert_eq!(message.varints(7).unwrap(), vec![1, 300, 2, 9]);
        assert!(message.varints(8).unwrap().is_empty());
    }

    #[test]
    fn set_varint_keeps_order() {
        let mut message = Message::new();
        message.push(2, WireValue::Varint(1));
        message.push(9, WireValue::Varint(1));

        message.set_varint(9, 5);
        assert_eq!(message.varint(9), Some(5));
        assert_eq!(message.fields().len(), 2);

        message.set_varint(4, 7);
        let numbers: Vec<u32> = message.fields().iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![2, 4, 9]);
    }

    #[test]
    fn replace_and_remove() {
        let mut message = Message::new();
        message.push(1, WireValue::Varint(6));
        message.push(9, WireValue::Bytes(vec![0x10, 0x01]));
        message.push(9, WireValue::Bytes(vec![0x10, 0x02]));
        message.push(10, WireValue::Bytes(vec![0x10, 0x03]));

        message.replace(
            9,
            vec![Field {
                number: 9,
                value: WireValue::Bytes(vec![0x10, 0x02]),
            }],
        );
        assert_eq!(message.messages(9).unwrap().len(), 1);
        let numbers: Vec<u32> = message.fields().iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 9, 10]);

        message.replace(8, vec![Field { number: 8, value: WireValue::Varint(0) }]);
        let numbers: Vec<u32> = message.fields().iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 8, 9, 10]);

        message.remove(9);
        assert!(!message.has(9));
    }

    #[test]
    fn delimited() {
        let data = [0x02, 0x08, 0x01, 0xFF];
        let mut parser = Parser::new(&data);
        let (message, body) = Message::parse_delimited(&mut parser).unwrap();
        assert_eq!(message.varint(1), Some(1));
        assert_eq!(body, &[0x08, 0x01]);
        assert_eq!(parser.remaining(), &[0xFF]);
    }

    #[test]
    fn rejects_groups_and_zero_field() {
        assert!(Message::parse(&[0x0B]).is_err());
        assert!(Message::parse(&[0x00, 0x01]).is_err());
        assert!(Message::parse(&[0x12, 0x05, 0x01]).is_err());
    }
}
