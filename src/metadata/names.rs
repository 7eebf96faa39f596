//! Resolution of string indices in the metadata payload.
//!
//! Declarations refer to names by index. The index is resolved through the `StringTableTypes`
//! message at the head of `d1`: each record describes a run of indices (`range`) and how to
//! derive the string for them, either a literal, one of a fixed list of predefined names, or the
//! `d2` entry at the same index, optionally narrowed to a substring, with one character replaced
//! and converted from an internal name or descriptor to a class id.

use crate::{metadata::proto::Message, Result};

/// `StringTableTypes.record`
const RECORD: u32 = 1;
/// `StringTableTypes.local_name`
const LOCAL_NAME: u32 = 5;

const RECORD_RANGE: u32 = 1;
const RECORD_PREDEFINED_INDEX: u32 = 2;
const RECORD_OPERATION: u32 = 3;
const RECORD_SUBSTRING_INDEX: u32 = 4;
const RECORD_REPLACE_CHAR: u32 = 5;
const RECORD_STRING: u32 = 6;

/// Names the compiler may reference without storing them in `d2`.
const PREDEFINED_STRINGS: [&str; 44] = [
    "kotlin/Any",
    "kotlin/Nothing",
    "kotlin/Unit",
    "kotlin/Throwable",
    "kotlin/Number",
    "kotlin/Byte",
    "kotlin/Double",
    "kotlin/Float",
    "kotlin/Int",
    "kotlin/Long",
    "kotlin/Short",
    "kotlin/Boolean",
    "kotlin/Char",
    "kotlin/CharSequence",
    "kotlin/String",
    "kotlin/Comparable",
    "kotlin/Enum",
    "kotlin/Array",
    "kotlin/ByteArray",
    "kotlin/DoubleArray",
    "kotlin/FloatArray",
    "kotlin/IntArray",
    "kotlin/LongArray",
    "kotlin/ShortArray",
    "kotlin/BooleanArray",
    "kotlin/CharArray",
    "kotlin/Cloneable",
    "kotlin/Annotation",
    "kotlin/collections/Iterable",
    "kotlin/collections/MutableIterable",
    "kotlin/collections/Collection",
    "kotlin/collections/MutableCollection",
    "kotlin/collections/List",
    "kotlin/collections/MutableList",
    "kotlin/collections/Set",
    "kotlin/collections/MutableSet",
    "kotlin/collections/Map",
    "kotlin/collections/MutableMap",
    "kotlin/collections/Map.Entry",
    "kotlin/collections/MutableMap.MutableEntry",
    "kotlin/collections/Iterator",
    "kotlin/collections/MutableIterator",
    "kotlin/collections/ListIterator",
    "kotlin/collections/MutableListIterator",
];

/// Post-processing applied to a resolved string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    None,
    /// `kotlin/Map$Entry` to `kotlin/Map.Entry`
    InternalToClassId,
    /// `Lkotlin/Map$Entry;` to `kotlin/Map.Entry`
    DescToClassId,
}

#[derive(Debug, Clone)]
struct Record {
    predefined_index: Option<usize>,
    string: Option<String>,
    operation: Operation,
    substring: Option<(usize, usize)>,
    replace_char: Option<(char, char)>,
}

/// Resolves string indices against the string table and `d2`.
#[derive(Debug, Clone)]
pub struct NameResolver {
    strings: Vec<String>,
    /// One record per index, `range` already expanded
    records: Vec<Record>,
    local_names: Vec<u64>,
}

impl NameResolver {
    /// Builds a resolver from a parsed `StringTableTypes` message and the `d2` strings.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the string table is corrupt.
    pub fn new(table: &Message, strings: Vec<String>) -> Result<NameResolver> {
        // Records past the last string are never resolved
        let limit = strings.len() as u64 + PREDEFINED_STRINGS.len() as u64 + 1;
        let mut records = Vec::new();
        for message in table.messages(RECORD)? {
            let range = message.varint(RECORD_RANGE).unwrap_or(1);
            let operation = match message.varint(RECORD_OPERATION).unwrap_or(0) {
                1 => Operation::InternalToClassId,
                2 => Operation::DescToClassId,
                _ => Operation::None,
            };

            let string = match message.bytes(RECORD_STRING) {
                Some(bytes) => Some(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|_| malformed_error!("String table literal is not UTF-8"))?,
                ),
                None => None,
            };

            let substring = match message.varints(RECORD_SUBSTRING_INDEX)?.as_slice() {
                [begin, end, ..] => Some((*begin as usize, *end as usize)),
                _ => None,
            };
            let replace_char = match message.varints(RECORD_REPLACE_CHAR)?.as_slice() {
                [from, to, ..] => Some((char_from(*from)?, char_from(*to)?)),
                _ => None,
            };

            let record = Record {
                predefined_index: message
                    .varint(RECORD_PREDEFINED_INDEX)
                    .map(|index| index as usize),
                string,
                operation,
                substring,
                replace_char,
            };

            if range > limit || records.len() as u64 + range > limit {
                return Err(malformed_error!("String table record range {} is too large", range));
            }
            records.extend(std::iter::repeat(record).take(range as usize));
        }

        Ok(NameResolver {
            strings,
            records,
            local_names: table.varints(LOCAL_NAME)?,
        })
    }

    /// Resolves the string at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` refers to no string.
    pub fn string(&self, index: u64) -> Result<String> {
        let slot = usize::try_from(index)
            .map_err(|_| malformed_error!("String index {} out of range", index))?;

        let Some(record) = self.records.get(slot) else {
            return self
                .strings
                .get(slot)
                .cloned()
                .ok_or_else(|| malformed_error!("String index {} out of range", index));
        };

        let mut value = if let Some(string) = &record.string {
            string.clone()
        } else if let Some(name) = record
            .predefined_index
            .and_then(|predefined| PREDEFINED_STRINGS.get(predefined))
        {
            (*name).to_string()
        } else {
            self.strings
                .get(slot)
                .cloned()
                .ok_or_else(|| malformed_error!("String index {} out of range", index))?
        };

        if let Some((begin, end)) = record.substring {
            let chars: Vec<char> = value.chars().collect();
            if begin <= end && end <= chars.len() {
                value = chars[begin..end].iter().collect();
            }
        }

        if let Some((from, to)) = record.replace_char {
            value = value.replace(from, &to.to_string());
        }

        match record.operation {
            Operation::None => {}
            Operation::InternalToClassId => value = value.replace('$', "."),
            Operation::DescToClassId => {
                let chars: Vec<char> = value.chars().collect();
                if chars.len() >= 2 {
                    value = chars[1..chars.len() - 1].iter().collect();
                }
                value = value.replace('$', ".");
            }
        }

        Ok(value)
    }

    /// Returns `true` if the class name at `index` denotes a local class.
    #[must_use]
    pub fn is_local_class_name(&self, index: u64) -> bool {
        self.local_names.contains(&index)
    }
}

fn char_from(value: u64) -> Result<char> {
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| malformed_error!("Invalid replacement character {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::proto::{pack_varints, WireValue};

    fn record(fields: &[(u32, WireValue)]) -> Message {
        let mut message = Message::new();
        for (number, value) in fields {
            message.push(*number, value.clone());
        }
        message
    }

    #[test]
    fn resolves_all_record_kinds() {
        let mut table = Message::new();
        // 0..=1: plain d2 strings
        table.push_message(RECORD, &record(&[(RECORD_RANGE, WireValue::Varint(2))]));
        // 2: predefined kotlin/String
        table.push_message(
            RECORD,
            &record(&[(RECORD_PREDEFINED_INDEX, WireValue::Varint(14))]),
        );
        // 3: literal
        table.push_message(
            RECORD,
            &record(&[(RECORD_STRING, WireValue::Bytes(b"literal".to_vec()))]),
        );
        // 4: descriptor to class id
        table.push_message(
            RECORD,
            &record(&[(RECORD_OPERATION, WireValue::Varint(2))]),
        );
        // 5: substring and char replacement
        table.push_message(
            RECORD,
            &record(&[
                (RECORD_SUBSTRING_INDEX, WireValue::Bytes(pack_varints(&[0, 5]))),
                (
                    RECORD_REPLACE_CHAR,
                    WireValue::Bytes(pack_varints(&['$' as u64, '.' as u64])),
                ),
            ]),
        );
        table.push(LOCAL_NAME, WireValue::Bytes(pack_varints(&[6])));

        let strings = vec![
            "foo".to_string(),
            "bar".to_string(),
            String::new(),
            String::new(),
            "Lcom/x/Outer$Inner;".to_string(),
            "a$b$cdef".to_string(),
            "Local".to_string(),
        ];
        let resolver = NameResolver::new(&table, strings).unwrap();

        assert_eq!(resolver.string(0).unwrap(), "foo");
        assert_eq!(resolver.string(1).unwrap(), "bar");
        assert_eq!(resolver.string(2).unwrap(), "kotlin/String");
        assert_eq!(resolver.string(3).unwrap(), "literal");
        assert_eq!(resolver.string(4).unwrap(), "com/x/Outer.Inner");
        assert_eq!(resolver.string(5).unwrap(), "a.b.c");
        assert_eq!(resolver.string(6).unwrap(), "Local");
        assert!(resolver.is_local_class_name(6));
        assert!(resolver.string(7).is_err());
    }

    #[test]
    fn total_record_range_is_bounded() {
        let strings = vec!["a".to_string(), "b".to_string()];
        let limit = (strings.len() + PREDEFINED_STRINGS.len() + 1) as u64;

        let mut table = Message::new();
        table.push_message(RECORD, &record(&[(RECORD_RANGE, WireValue::Varint(limit))]));
        assert!(NameResolver::new(&table, strings.clone()).is_ok());

        // Every record alone is in bounds, their sum is not
        let mut table = Message::new();
        for _ in 0..1000 {
            table.push_message(RECORD, &record(&[(RECORD_RANGE, WireValue::Varint(limit))]));
        }
        assert!(matches!(
            NameResolver::new(&table, strings),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn empty_table_reads_d2_directly() {
        let resolver = NameResolver::new(&Message::new(), vec!["x".to_string()]).unwrap();
        assert_eq!(resolver.string(0).unwrap(), "x");
    }
}
