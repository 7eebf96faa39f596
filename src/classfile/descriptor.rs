//! Method descriptor helpers and synthetic method bodies.
//!
//! A stripped method still needs a verifiable body if the class is ever loaded, so
//! [`synthetic_code`] produces the smallest `Code` attribute that returns a default value of the
//! declared return type: `return`, `iconst_0; ireturn`, `lconst_0; lreturn`, `fconst_0; freturn`,
//! `dconst_0; dreturn` or `aconst_null; areturn`.

use strum::{EnumCount, EnumIter};

use crate::{
    classfile::access::MethodAccessFlags,
    file::{io::push_be, parser::Parser},
    Result,
};

const ACONST_NULL: u8 = 0x01;
const ICONST_0: u8 = 0x03;
const LCONST_0: u8 = 0x09;
const FCONST_0: u8 = 0x0B;
const DCONST_0: u8 = 0x0E;
const IRETURN: u8 = 0xAC;
const LRETURN: u8 = 0xAD;
const FRETURN: u8 = 0xAE;
const DRETURN: u8 = 0xAF;
const ARETURN: u8 = 0xB0;
const RETURN: u8 = 0xB1;

/// The computational category of a method's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount)]
pub enum ReturnKind {
    /// `V`
    Void,
    /// `Z`, `B`, `C`, `S` and `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// Objects and arrays
    Reference,
}

impl ReturnKind {
    /// Operand stack slots needed to hold the return value.
    #[must_use]
    pub fn stack_slots(self) -> u16 {
        match self {
            ReturnKind::Void => 0,
            ReturnKind::Long | ReturnKind::Double => 2,
            _ => 1,
        }
    }

    /// Bytecode returning a default value of this kind.
    #[must_use]
    pub fn default_return(self) -> &'static [u8] {
        match self {
            ReturnKind::Void => &[RETURN],
            ReturnKind::Int => &[ICONST_0, IRETURN],
            ReturnKind::Long => &[LCONST_0, LRETURN],
            ReturnKind::Float => &[FCONST_0, FRETURN],
            ReturnKind::Double => &[DCONST_0, DRETURN],
            ReturnKind::Reference => &[ACONST_NULL, ARETURN],
        }
    }
}

/// The parameter slot count and return kind of a method descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodShape {
    /// Local variable slots taken by the parameters (`long` and `double` take two)
    pub argument_slots: u16,
    /// Category of the return type
    pub return_kind: ReturnKind,
}

impl MethodShape {
    /// Parses a method descriptor such as `(IJ[Ljava/lang/String;)Z`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `descriptor` is not a valid method descriptor.
    pub fn parse(descriptor: &str) -> Result<MethodShape> {
        let mut parser = Parser::new(descriptor.as_bytes());
        if parser.read_be::<u8>()? != b'(' {
            return Err(malformed_error!("Invalid method descriptor '{}'", descriptor));
        }

        let mut argument_slots = 0u16;
        loop {
            match peek(&parser, descriptor)? {
                b')' => {
                    parser.advance_by(1)?;
                    break;
                }
                _ => {
                    let slots = match skip_field_type(&mut parser, descriptor)? {
                        b'J' | b'D' => 2,
                        _ => 1,
                    };
                    argument_slots = argument_slots
                        .checked_add(slots)
                        .ok_or_else(|| malformed_error!("Too many parameters in '{}'", descriptor))?;
                }
            }
        }

        let return_kind = if peek(&parser, descriptor)? == b'V' {
            parser.advance_by(1)?;
            ReturnKind::Void
        } else {
            match skip_field_type(&mut parser, descriptor)? {
                b'Z' | b'B' | b'C' | b'S' | b'I' => ReturnKind::Int,
                b'J' => ReturnKind::Long,
                b'F' => ReturnKind::Float,
                b'D' => ReturnKind::Double,
                _ => ReturnKind::Reference,
            }
        };

        if parser.has_more_data() {
            return Err(malformed_error!("Trailing characters in '{}'", descriptor));
        }

        Ok(MethodShape {
            argument_slots,
            return_kind,
        })
    }
}

fn peek(parser: &Parser, descriptor: &str) -> Result<u8> {
    parser
        .remaining()
        .first()
        .copied()
        .ok_or_else(|| malformed_error!("Unterminated method descriptor '{}'", descriptor))
}

/// Skips one field type and returns its leading character (`[` for arrays, `L` for objects).
fn skip_field_type(parser: &mut Parser, descriptor: &str) -> Result<u8> {
    let first = parser.read_be::<u8>()?;
    match first {
        b'Z' | b'B' | b'C' | b'S' | b'I' | b'J' | b'F' | b'D' => Ok(first),
        b'L' => {
            let Some(end) = parser.remaining().iter().position(|&b| b == b';') else {
                return Err(malformed_error!("Unterminated class type in '{}'", descriptor));
            };
            parser.advance_by(end + 1)?;
            Ok(first)
        }
        b'[' => {
            skip_field_type(parser, descriptor)?;
            Ok(first)
        }
        _ => Err(malformed_error!(
            "Invalid type character '{}' in '{}'",
            char::from(first),
            descriptor
        )),
    }
}

/// Builds the payload of a `Code` attribute that only returns a default value.
///
/// The body has no exception table and no nested attributes. `max_locals` covers the parameters
/// plus the receiver of instance methods.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `descriptor` is not a valid method descriptor.
pub fn synthetic_code(access: MethodAccessFlags, descriptor: &str) -> Result<Vec<u8>> {
    let shape = MethodShape::parse(descriptor)?;
    let receiver = u16::from(!access.contains(MethodAccessFlags::STATIC));
    let max_locals = shape
        .argument_slots
        .checked_add(receiver)
        .ok_or_else(|| malformed_error!("Too many locals in '{}'", descriptor))?;
    let code = shape.return_kind.default_return();

    let mut out = Vec::with_capacity(12 + code.len());
    push_be(&mut out, shape.return_kind.stack_slots());
    push_be(&mut out, max_locals);
    push_be(&mut out, code.len() as u32);
    out.extend_from_slice(code);
    push_be(&mut out, 0u16);
    push_be(&mut out, 0u16);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn shapes() {
        let shape = MethodShape::parse("(IJ[Ljava/lang/String;D[[J)Z").unwrap();
        assert_eq!(shape.argument_slots, 1 + 2 + 1 + 2 + 1);
        assert_eq!(shape.return_kind, ReturnKind::Int);

        let shape = MethodShape::parse("()V").unwrap();
        assert_eq!(shape.argument_slots, 0);
        assert_eq!(shape.return_kind, ReturnKind::Void);

        assert_eq!(
            MethodShape::parse("()[I").unwrap().return_kind,
            ReturnKind::Reference
        );
        assert_eq!(
            MethodShape::parse("(Lkotlin/Unit;)D").unwrap().return_kind,
            ReturnKind::Double
        );
    }

    #[test]
    fn invalid_descriptors() {
        for descriptor in ["", "I", "(", "(I", "(Lfoo)V", "(Q)V", "()VV", "()"] {
            assert!(MethodShape::parse(descriptor).is_err(), "{descriptor}");
        }
    }

    #[test]
    fn every_kind_returns() {
        for kind in ReturnKind::iter() {
            let code = kind.default_return();
            assert!(matches!(
                code.last(),
                Some(&(IRETURN | LRETURN | FRETURN | DRETURN | ARETURN | RETURN))
            ));
        }
        assert_eq!(ReturnKind::COUNT, 6);
    }

    #[test]
    fn synthetic_instance_method() {
        let code = synthetic_code(MethodAccessFlags::PUBLIC, "(JI)J").unwrap();
        assert_eq!(
            code,
            [0, 2, 0, 4, 0, 0, 0, 2, LCONST_0, LRETURN, 0, 0, 0, 0]
        );
    }

    #[test]
    fn synthetic_static_void() {
        let code =
            synthetic_code(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC, "()V").unwrap();
        assert_eq!(code, [0, 0, 0, 0, 0, 0, 0, 1, RETURN, 0, 0, 0, 0]);
    }
}
