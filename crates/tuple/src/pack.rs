//! Encoding into the order-preserving byte form.

use crate::element::{f32_order_bits, f64_order_bits, Element};
use crate::error::TupleError;
use crate::Tuple;

/// Wire type codes. Shared with the decoder; the cross-class element
/// ranks in `element.rs` mirror these so structural and byte order agree.
pub(crate) mod code {
    pub const NIL: u8 = 0x00;
    pub const BYTES: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const NESTED: u8 = 0x05;
    pub const NEG_INT_BIG: u8 = 0x0B;
    pub const INT_ZERO: u8 = 0x14;
    pub const POS_INT_BIG: u8 = 0x1D;
    pub const FLOAT: u8 = 0x20;
    pub const DOUBLE: u8 = 0x21;
    pub const FALSE: u8 = 0x26;
    pub const TRUE: u8 = 0x27;
    pub const UUID: u8 = 0x30;
    pub const VERSIONSTAMP: u8 = 0x33;
}

pub(crate) fn pack_tuple(tuple: &Tuple) -> Result<Vec<u8>, TupleError> {
    let mut enc = Encoder::new(Vec::new());
    for element in tuple.elements() {
        enc.element(element, false)?;
    }
    if enc.incomplete.is_some() {
        return Err(TupleError::IncompleteVersionstamp);
    }
    Ok(enc.out)
}

pub(crate) fn pack_tuple_with_versionstamp(
    tuple: &Tuple,
    prefix: &[u8],
) -> Result<Vec<u8>, TupleError> {
    let mut enc = Encoder::new(prefix.to_vec());
    for element in tuple.elements() {
        enc.element(element, false)?;
    }
    let offset = enc.incomplete.ok_or(TupleError::MissingVersionstamp)?;
    let mut out = enc.out;
    out.extend_from_slice(&(offset as u32).to_le_bytes());
    Ok(out)
}

pub(crate) fn count_incomplete_versionstamps(elements: &[Element]) -> usize {
    elements
        .iter()
        .map(|e| match e {
            Element::Versionstamp(v) if !v.is_complete() => 1,
            Element::Tuple(t) => count_incomplete_versionstamps(t.elements()),
            _ => 0,
        })
        .sum()
}

struct Encoder {
    out: Vec<u8>,
    /// Byte offset of the single incomplete versionstamp's transaction
    /// version, if one has been written.
    incomplete: Option<usize>,
}

impl Encoder {
    fn new(out: Vec<u8>) -> Self {
        Encoder {
            out,
            incomplete: None,
        }
    }

    fn element(&mut self, element: &Element, nested: bool) -> Result<(), TupleError> {
        match element {
            Element::Nil => {
                // Inside a nested tuple the nil byte would read as the
                // terminator, so it carries an escape there.
                if nested {
                    self.out.extend_from_slice(&[code::NIL, 0xFF]);
                } else {
                    self.out.push(code::NIL);
                }
            }
            Element::Int(_) | Element::Uint(_) | Element::BigInt(_) => {
                let (sign, magnitude) = element.int_sign_magnitude();
                self.integer(sign < 0, &magnitude)?;
            }
            Element::Bytes(bytes) => {
                self.out.push(code::BYTES);
                self.escaped(bytes);
            }
            Element::String(s) => {
                self.out.push(code::STRING);
                self.escaped(s.as_bytes());
            }
            Element::Float(f) => {
                self.out.push(code::FLOAT);
                self.out.extend_from_slice(&f32_order_bits(*f).to_be_bytes());
            }
            Element::Double(f) => {
                self.out.push(code::DOUBLE);
                self.out.extend_from_slice(&f64_order_bits(*f).to_be_bytes());
            }
            Element::Bool(false) => self.out.push(code::FALSE),
            Element::Bool(true) => self.out.push(code::TRUE),
            Element::Uuid(uuid) => {
                self.out.push(code::UUID);
                self.out.extend_from_slice(uuid.as_bytes());
            }
            Element::Versionstamp(v) => {
                self.out.push(code::VERSIONSTAMP);
                if !v.is_complete() {
                    if self.incomplete.is_some() {
                        return Err(TupleError::MultipleIncompleteVersionstamps);
                    }
                    self.incomplete = Some(self.out.len());
                }
                self.out.extend_from_slice(&v.transaction_version);
                self.out.extend_from_slice(&v.user_version.to_be_bytes());
            }
            Element::Tuple(t) => {
                self.out.push(code::NESTED);
                for e in t.elements() {
                    self.element(e, true)?;
                }
                self.out.push(0x00);
            }
        }
        Ok(())
    }

    /// Content bytes with `00 -> 00 FF` escaping and a `00` terminator.
    fn escaped(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.out.push(b);
            if b == 0x00 {
                self.out.push(0xFF);
            }
        }
        self.out.push(0x00);
    }

    /// Variable-length integer encoding. Negative values store the bitwise
    /// complement of the magnitude, so deeper negatives order first.
    fn integer(&mut self, negative: bool, magnitude: &[u8]) -> Result<(), TupleError> {
        let n = magnitude.len();
        if n == 0 {
            self.out.push(code::INT_ZERO);
        } else if n <= 8 {
            if negative {
                self.out.push(code::INT_ZERO - n as u8);
                self.out.extend(magnitude.iter().map(|b| !b));
            } else {
                self.out.push(code::INT_ZERO + n as u8);
                self.out.extend_from_slice(magnitude);
            }
        } else if n <= 255 {
            if negative {
                self.out.push(code::NEG_INT_BIG);
                self.out.push(!(n as u8));
                self.out.extend(magnitude.iter().map(|b| !b));
            } else {
                self.out.push(code::POS_INT_BIG);
                self.out.push(n as u8);
                self.out.extend_from_slice(magnitude);
            }
        } else {
            return Err(TupleError::IntTooLarge(n));
        }
        Ok(())
    }
}
