//!
//! Contains a number of tools that are useful when working with EBML encoded data.
//!

use std::convert::TryInto;

use super::errors::tool::ToolError;

///
/// Encoded form of the reserved "unknown size" value.
///
pub const UNKNOWN_SIZE_VINT: [u8; 1] = [0xFF];

///
/// Trait to enable easy serialization to a vint.
///
/// This is only available for types that can be cast as `u64`.  A value whose data bits would all be set is reserved for "unknown size" and is therefore written with one more byte.
///
pub trait Vint: Into<u64> + Copy {
    ///
    /// Returns a representation of the current value as a vint array.
    ///
    /// # Errors
    ///
    /// This can return an error if the value is too large to be representable as a vint.
    ///
    fn as_vint(&self) -> Result<Vec<u8>, ToolError> {
        let val: u64 = (*self).into();
        check_size_u64(val, 8)?;
        let mut length = 1;
        while length < 8 {
            if val < (1 << (7 * length)) - 1 {
                break;
            }
            length += 1;
        }

        Ok(as_vint_no_check_u64(val, length))
    }

    ///
    /// Returns a representation of the current value as a vint array with a specified length.
    ///
    /// # Errors
    ///
    /// This can return an error if the value is too large to be representable as a vint.
    ///
    fn as_vint_with_length(&self, length: usize) -> Result<Vec<u8>, ToolError> {
        let val: u64 = (*self).into();
        if !(1..=8).contains(&length) {
            return Err(ToolError::WriteVintOverflow(val));
        }
        check_size_u64(val, length)?;
        Ok(as_vint_no_check_u64(val, length))
    }
}

impl Vint for u64 { }
impl Vint for u32 { }
impl Vint for u16 { }
impl Vint for u8 { }

#[inline]
fn check_size_u64(val: u64, max_length: usize) -> Result<(), ToolError> {
    if val >= (1 << (max_length * 7)) - 1 {
        Err(ToolError::WriteVintOverflow(val))
    } else {
        Ok(())
    }
}

#[inline]
fn as_vint_no_check_u64(val: u64, length: usize) -> Vec<u8> {
    let bytes: [u8; 8] = val.to_be_bytes();
    let mut result: Vec<u8> = Vec::from(&bytes[(8-length)..]);
    result[0] |= 1 << (8 - length);
    result
}

///
/// Returns the total length of a vint given its first byte, or `None` if the byte carries no length marker.
///
#[inline]
pub fn vint_width(first: u8) -> Option<usize> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as usize + 1)
    }
}

///
/// Returns whether a decoded vint value of `length` bytes is the reserved "unknown size" value (all data bits set).
///
#[inline]
pub fn is_unknown_size(value: u64, length: usize) -> bool {
    (1..=8).contains(&length) && value == (1 << (7 * length)) - 1
}

///
/// Reads a vint from the beginning of the input array slice.
///
/// This method returns an option with the `None` variant used to indicate there was not enough data in the buffer to completely read a vint.
///
/// The returned tuple contains the value of the vint (`u64`) and the length of the vint (`usize`).  The length will be less than or equal to the length of the input slice.  The value has the length marker removed; use [`is_unknown_size`] to detect the reserved "unknown" value.
///
/// # Errors
///
/// This method can return a `ToolError` if the input array cannot be read as a vint.
///
pub fn read_vint(buffer: &[u8]) -> Result<Option<(u64, usize)>, ToolError> {
    if buffer.is_empty() {
        return Ok(None);
    }

    let length = vint_width(buffer[0]).ok_or(ToolError::ReadVintOverflow)?;

    if length > buffer.len() {
        // Not enough data in the buffer to read out the vint value
        return Ok(None);
    }

    let mut value = buffer[0] as u64;
    value -= 1 << (8 - length);

    for item in buffer.iter().take(length).skip(1) {
        value <<= 8;
        value += *item as u64;
    }

    Ok(Some((value, length)))
}

///
/// Reads a `u64` value from any length array slice.
///
/// Rather than forcing the input to be a `[u8; 8]` like standard library methods, this can interpret a `u64` from a slice of any length <= 8.  Bytes are big endian - i.e. an array of `[4, 0]` would return a value of `1024`.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_decoder::tools::arr_to_u64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = arr_to_u64(&[16,0])?;
/// assert_eq!(result, 4096);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_u64(arr: &[u8]) -> Result<u64, ToolError> {
    if arr.len() > 8 {
        return Err(ToolError::ReadU64Overflow(Vec::from(arr)));
    }

    let mut val = 0u64;
    for byte in arr {
        val = (val << 8) | *byte as u64;
    }
    Ok(val)
}

///
/// Reads an `i64` value from any length array slice.
///
/// The slice is read as a big endian two's complement number of `arr.len()` bytes, so `[0xFF]` reads as `-1` while `[0x00, 0xFF]` reads as `255`.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_decoder::tools::arr_to_i64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert_eq!(arr_to_i64(&[4,0])?, 1024);
/// assert_eq!(arr_to_i64(&[0xff,0xfe])?, -2);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_i64(arr: &[u8]) -> Result<i64, ToolError> {
    if arr.len() > 8 {
        return Err(ToolError::ReadI64Overflow(Vec::from(arr)));
    }

    match arr.first() {
        None => Ok(0),
        Some(first) if *first > 127 => {
            let mut bytes = [0xFFu8; 8];
            bytes[(8 - arr.len())..].copy_from_slice(arr);
            Ok(i64::from_be_bytes(bytes))
        },
        Some(_) => {
            let mut bytes = [0u8; 8];
            bytes[(8 - arr.len())..].copy_from_slice(arr);
            Ok(i64::from_be_bytes(bytes))
        },
    }
}

///
/// Reads an `f64` value from an array slice of length 0, 4 or 8.
///
/// This method wraps `f32` and `f64` conversions from big endian byte arrays and casts the result as an `f64`.  An empty slice reads as `0.0`.
///
/// # Errors
///
/// This method will throw an error if the input slice length is not 0, 4 or 8.
///
pub fn arr_to_f64(arr: &[u8]) -> Result<f64, ToolError> {
    match arr.len() {
        0 => Ok(0.0),
        4 => Ok(f32::from_be_bytes(arr.try_into().map_err(|_| ToolError::ReadF64Mismatch(Vec::from(arr)))?) as f64),
        8 => Ok(f64::from_be_bytes(arr.try_into().map_err(|_| ToolError::ReadF64Mismatch(Vec::from(arr)))?)),
        _ => Err(ToolError::ReadF64Mismatch(Vec::from(arr))),
    }
}
