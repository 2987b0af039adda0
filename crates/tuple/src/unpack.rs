//! Decoding of the packed byte form.

use uuid::Uuid;

use crate::element::{BigInt, Element, Versionstamp};
use crate::error::TupleError;
use crate::pack::code;
use crate::Tuple;

pub(crate) fn unpack_tuple(bytes: &[u8]) -> Result<Tuple, TupleError> {
    let mut d = Decoder { buf: bytes, pos: 0 };
    let mut elements = Vec::new();
    while d.pos < d.buf.len() {
        elements.push(d.element()?);
    }
    Ok(Tuple::from_elements(elements))
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], TupleError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        let end = end.ok_or(TupleError::Truncated(self.buf.len()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn element(&mut self) -> Result<Element, TupleError> {
        let offset = self.pos;
        let type_code = self.take(1)?[0];
        match type_code {
            code::NIL => Ok(Element::Nil),
            code::BYTES => Ok(Element::Bytes(self.escaped()?)),
            code::STRING => {
                let raw = self.escaped()?;
                Ok(Element::String(String::from_utf8(raw)?))
            }
            code::NESTED => self.nested(),
            code::NEG_INT_BIG => {
                let len = !self.take(1)?[0] as usize;
                let magnitude: Vec<u8> = self.take(len)?.iter().map(|b| !b).collect();
                Ok(normalize_int(true, magnitude))
            }
            c if (0x0C..code::INT_ZERO).contains(&c) => {
                let len = (code::INT_ZERO - c) as usize;
                let magnitude: Vec<u8> = self.take(len)?.iter().map(|b| !b).collect();
                Ok(normalize_int(true, magnitude))
            }
            code::INT_ZERO => Ok(Element::Int(0)),
            c if (0x15..=0x1C).contains(&c) => {
                let len = (c - code::INT_ZERO) as usize;
                let magnitude = self.take(len)?.to_vec();
                Ok(normalize_int(false, magnitude))
            }
            code::POS_INT_BIG => {
                let len = self.take(1)?[0] as usize;
                let magnitude = self.take(len)?.to_vec();
                Ok(normalize_int(false, magnitude))
            }
            code::FLOAT => {
                let raw: [u8; 4] = self.take(4)?.try_into().expect("length checked");
                let bits = restore_bits_32(u32::from_be_bytes(raw));
                Ok(Element::Float(f32::from_bits(bits)))
            }
            code::DOUBLE => {
                let raw: [u8; 8] = self.take(8)?.try_into().expect("length checked");
                let bits = restore_bits_64(u64::from_be_bytes(raw));
                Ok(Element::Double(f64::from_bits(bits)))
            }
            code::FALSE => Ok(Element::Bool(false)),
            code::TRUE => Ok(Element::Bool(true)),
            code::UUID => {
                let raw: [u8; 16] = self.take(16)?.try_into().expect("length checked");
                Ok(Element::Uuid(Uuid::from_bytes(raw)))
            }
            code::VERSIONSTAMP => {
                let transaction_version: [u8; 10] =
                    self.take(10)?.try_into().expect("length checked");
                let user: [u8; 2] = self.take(2)?.try_into().expect("length checked");
                Ok(Element::Versionstamp(Versionstamp {
                    transaction_version,
                    user_version: u16::from_be_bytes(user),
                }))
            }
            _ => Err(TupleError::UnknownTypeCode {
                code: type_code,
                offset,
            }),
        }
    }

    /// Read content bytes up to an unescaped `00` terminator.
    fn escaped(&mut self) -> Result<Vec<u8>, TupleError> {
        let mut out = Vec::new();
        loop {
            let b = self.take(1)?[0];
            if b != 0x00 {
                out.push(b);
                continue;
            }
            if self.buf.get(self.pos) == Some(&0xFF) {
                self.pos += 1;
                out.push(0x00);
                continue;
            }
            return Ok(out);
        }
    }

    fn nested(&mut self) -> Result<Element, TupleError> {
        let mut elements = Vec::new();
        loop {
            match self.buf.get(self.pos) {
                None => return Err(TupleError::Truncated(self.pos)),
                Some(0x00) => {
                    if self.buf.get(self.pos + 1) == Some(&0xFF) {
                        self.pos += 2;
                        elements.push(Element::Nil);
                    } else {
                        self.pos += 1;
                        return Ok(Element::Tuple(Tuple::from_elements(elements)));
                    }
                }
                Some(_) => elements.push(self.element()?),
            }
        }
    }
}

fn restore_bits_32(bits: u32) -> u32 {
    if bits & 0x8000_0000 != 0 {
        bits ^ 0x8000_0000
    } else {
        !bits
    }
}

fn restore_bits_64(bits: u64) -> u64 {
    if bits & (1 << 63) != 0 {
        bits ^ (1 << 63)
    } else {
        !bits
    }
}

/// Pick the canonical arm for a decoded integer: `Int` when the value fits
/// `i64`, `Uint` for larger non-negatives, `BigInt` beyond 64 bits.
fn normalize_int(negative: bool, magnitude: Vec<u8>) -> Element {
    let big = BigInt::new(negative, magnitude);
    if big.is_zero() {
        return Element::Int(0);
    }
    if big.magnitude().len() > 8 {
        return Element::BigInt(big);
    }
    let mut value: u64 = 0;
    for &b in big.magnitude() {
        value = value << 8 | b as u64;
    }
    if big.is_negative() {
        if value <= i64::MAX as u64 {
            Element::Int(-(value as i64))
        } else if value == 1 << 63 {
            Element::Int(i64::MIN)
        } else {
            Element::BigInt(big)
        }
    } else if value <= i64::MAX as u64 {
        Element::Int(value as i64)
    } else {
        Element::Uint(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::{BigInt, Element, Tuple, TupleError, Versionstamp};
    use uuid::Uuid;

    fn round_trip(t: Tuple) {
        let packed = t.pack().expect("pack failed");
        let back = Tuple::unpack(&packed).expect("unpack failed");
        assert_eq!(back, t, "round trip changed {t}");
    }

    #[test]
    fn round_trips() {
        round_trip(Tuple::new());
        round_trip(Tuple::new().push("akey").push(42i64));
        round_trip(Tuple::new().push(vec![0u8, 0xFF, 0]).push(""));
        round_trip(Tuple::new().push(i64::MIN).push(i64::MAX).push(u64::MAX));
        round_trip(Tuple::new().push(BigInt::new(true, vec![9u8; 12])));
        round_trip(Tuple::new().push(1.5f32).push(-2.5f64).push(f64::NAN));
        round_trip(Tuple::new().push(true).push(false).push(Element::Nil));
        round_trip(Tuple::new().push(Uuid::from_bytes([7; 16])));
        round_trip(Tuple::new().push(Versionstamp::complete([3; 10], 12)));
        round_trip(Tuple::new().push(Tuple::new().push(Element::Nil).push("in")));
    }

    #[test]
    fn unpack_normalizes_integer_arms() {
        let packed = Tuple::new().push(Element::Uint(7)).pack().unwrap();
        let back = Tuple::unpack(&packed).unwrap();
        assert!(matches!(back.elements()[0], Element::Int(7)));

        let packed = Tuple::new().push(Element::Uint(u64::MAX)).pack().unwrap();
        let back = Tuple::unpack(&packed).unwrap();
        assert!(matches!(back.elements()[0], Element::Uint(_)));
    }

    #[test]
    fn truncated_input_fails() {
        let packed = Tuple::new().push(12345i64).pack().unwrap();
        assert!(matches!(
            Tuple::unpack(&packed[..packed.len() - 1]),
            Err(TupleError::Truncated(_))
        ));
        assert!(matches!(
            Tuple::unpack(&[0x02, b'a']),
            Err(TupleError::Truncated(_))
        ));
    }

    #[test]
    fn unknown_code_fails() {
        assert_eq!(
            Tuple::unpack(&[0xFF]),
            Err(TupleError::UnknownTypeCode {
                code: 0xFF,
                offset: 0
            })
        );
    }

    #[test]
    fn invalid_utf8_fails() {
        let err = Tuple::unpack(&[0x02, 0xC3, 0x28, 0x00]).unwrap_err();
        assert!(matches!(err, TupleError::InvalidUtf8(_)));
    }
}
