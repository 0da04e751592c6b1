//!
//! Value codecs for the EBML element types.
//!
//! Every non-master [`ElementType`] has one [`Codec`] that turns the raw bytes of an element body into a [`Value`] and back.  Codecs are stateless and looked up by type name with [`lookup`] or by type with [`for_type`].
//!

use bytes::Bytes;
use chrono::{DateTime, Utc};

use ebml_decoder_schema::ElementType;

use super::errors::codec::CodecError;
use super::tools;

///
/// Nanoseconds between the unix epoch and the EBML date epoch, 2001-01-01T00:00:00 UTC.
///
pub const EBML_EPOCH_UNIX_NANOS: i64 = 978_307_200_000_000_000;

///
/// A decoded element value.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    UnsignedInteger(u64),
    Integer(i64),
    Float(f64),
    Date(DateTime<Utc>),

    ///
    /// Raw element bytes.  Shares memory with the input chunk when the body arrived in a single chunk.
    ///
    Binary(Bytes),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::UnsignedInteger(_) => "uinteger",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Date(_) => "date",
            Value::Binary(_) => "binary",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_unsigned_int(&self) -> Option<u64> {
        match self {
            Value::UnsignedInteger(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_signed_int(&self) -> Option<i64> {
        match self {
            Value::Integer(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(val) => Some(val),
            _ => None,
        }
    }
}

///
/// Decoding and encoding of one element type.
///
pub trait Codec: Sync {
    ///
    /// The element type this codec handles.
    ///
    fn element_type(&self) -> ElementType;

    ///
    /// Decodes an element body.
    ///
    /// # Errors
    ///
    /// Fails if the data can't represent a value of this type (e.g. a 3 byte float).
    ///
    fn decode(&self, data: &Bytes) -> Result<Value, CodecError>;

    ///
    /// Encodes `value` as an element body.
    ///
    /// # Errors
    ///
    /// Fails if `value` is of a different kind than this codec handles.
    ///
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn encoding_length(&self, value: &Value) -> Result<usize, CodecError> {
        self.encode(value).map(|data| data.len())
    }
}

fn mismatch(codec: &dyn Codec, value: &Value) -> CodecError {
    CodecError::TypeMismatch { expected: codec.element_type().name(), found: value.kind() }
}

///
/// Printable ASCII.  The high bit of every byte is ignored when decoding.
///
struct StringCodec;

impl Codec for StringCodec {
    fn element_type(&self) -> ElementType {
        ElementType::String
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        Ok(Value::String(data.iter().map(|b| (b & 0x7F) as char).collect()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::String(val) => Ok(val.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect()),
            other => Err(mismatch(self, other)),
        }
    }

    fn encoding_length(&self, value: &Value) -> Result<usize, CodecError> {
        match value {
            Value::String(val) => Ok(val.chars().count()),
            other => Err(mismatch(self, other)),
        }
    }
}

struct Utf8Codec;

impl Codec for Utf8Codec {
    fn element_type(&self) -> ElementType {
        ElementType::Utf8
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        Ok(Value::String(String::from_utf8(data.to_vec())?))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::String(val) => Ok(val.as_bytes().to_vec()),
            other => Err(mismatch(self, other)),
        }
    }

    fn encoding_length(&self, value: &Value) -> Result<usize, CodecError> {
        match value {
            Value::String(val) => Ok(val.len()),
            other => Err(mismatch(self, other)),
        }
    }
}

struct UnsignedIntegerCodec;

impl Codec for UnsignedIntegerCodec {
    fn element_type(&self) -> ElementType {
        ElementType::UnsignedInteger
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        if data.len() > 8 {
            return Err(CodecError::IntegerLength(data.len()));
        }
        Ok(Value::UnsignedInteger(tools::arr_to_u64(data)?))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::UnsignedInteger(val) => {
                let bytes = val.to_be_bytes();
                let length = (8 - (val.leading_zeros() as usize / 8)).max(1);
                Ok(bytes[(8 - length)..].to_vec())
            },
            other => Err(mismatch(self, other)),
        }
    }
}

struct IntegerCodec;

impl Codec for IntegerCodec {
    fn element_type(&self) -> ElementType {
        ElementType::Integer
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        if data.len() > 8 {
            return Err(CodecError::IntegerLength(data.len()));
        }
        Ok(Value::Integer(tools::arr_to_i64(data)?))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::Integer(val) => Ok(signed_bytes(*val)),
            other => Err(mismatch(self, other)),
        }
    }
}

fn signed_bytes(val: i64) -> Vec<u8> {
    let bytes = val.to_be_bytes();
    let length = (1..=8)
        .find(|length| {
            let bound = 1i128 << (8 * length - 1);
            (val as i128) >= -bound && (val as i128) < bound
        })
        .unwrap_or(8);
    bytes[(8 - length)..].to_vec()
}

struct FloatCodec;

impl Codec for FloatCodec {
    fn element_type(&self) -> ElementType {
        ElementType::Float
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        match data.len() {
            0 | 4 | 8 => Ok(Value::Float(tools::arr_to_f64(data)?)),
            other => Err(CodecError::FloatLength(other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::Float(val) => {
                let single = *val as f32;
                if single as f64 == *val || val.is_nan() {
                    Ok(single.to_be_bytes().to_vec())
                } else {
                    Ok(val.to_be_bytes().to_vec())
                }
            },
            other => Err(mismatch(self, other)),
        }
    }
}

///
/// Signed nanoseconds since 2001-01-01T00:00:00 UTC.
///
/// An empty body decodes to the epoch itself, and the epoch encodes as an empty body.
///
struct DateCodec;

impl Codec for DateCodec {
    fn element_type(&self) -> ElementType {
        ElementType::Date
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        if data.len() > 8 {
            return Err(CodecError::IntegerLength(data.len()));
        }
        let offset = tools::arr_to_i64(data)?;
        let nanos = EBML_EPOCH_UNIX_NANOS.checked_add(offset).ok_or(CodecError::DateRange(offset))?;
        Ok(Value::Date(DateTime::<Utc>::from_timestamp_nanos(nanos)))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::Date(val) => {
                let nanos = val.timestamp_nanos_opt().ok_or(CodecError::DateRange(i64::MAX))?;
                match nanos.checked_sub(EBML_EPOCH_UNIX_NANOS).ok_or(CodecError::DateRange(nanos))? {
                    0 => Ok(Vec::new()),
                    offset => Ok(offset.to_be_bytes().to_vec()),
                }
            },
            other => Err(mismatch(self, other)),
        }
    }
}

struct BinaryCodec;

impl Codec for BinaryCodec {
    fn element_type(&self) -> ElementType {
        ElementType::Binary
    }

    fn decode(&self, data: &Bytes) -> Result<Value, CodecError> {
        Ok(Value::Binary(data.clone()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::Binary(val) => Ok(val.to_vec()),
            other => Err(mismatch(self, other)),
        }
    }

    fn encoding_length(&self, value: &Value) -> Result<usize, CodecError> {
        match value {
            Value::Binary(val) => Ok(val.len()),
            other => Err(mismatch(self, other)),
        }
    }
}

static STRING: StringCodec = StringCodec;
static UTF8: Utf8Codec = Utf8Codec;
static UNSIGNED_INTEGER: UnsignedIntegerCodec = UnsignedIntegerCodec;
static INTEGER: IntegerCodec = IntegerCodec;
static FLOAT: FloatCodec = FloatCodec;
static DATE: DateCodec = DateCodec;
static BINARY: BinaryCodec = BinaryCodec;

///
/// Resolves a schema type name (`"string"`, `"utf-8"`, `"uinteger"`, `"integer"`, `"float"`, `"date"`, `"binary"`) to its codec.
///
/// Returns `None` for `"master"` and for names that aren't EBML types.
///
pub fn lookup(name: &str) -> Option<&'static dyn Codec> {
    name.parse().ok().and_then(for_type)
}

///
/// Returns the codec for an element type, or `None` for [`ElementType::Master`].
///
pub fn for_type(element_type: ElementType) -> Option<&'static dyn Codec> {
    match element_type {
        ElementType::Master => None,
        ElementType::String => Some(&STRING),
        ElementType::Utf8 => Some(&UTF8),
        ElementType::UnsignedInteger => Some(&UNSIGNED_INTEGER),
        ElementType::Integer => Some(&INTEGER),
        ElementType::Float => Some(&FLOAT),
        ElementType::Date => Some(&DATE),
        ElementType::Binary => Some(&BINARY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(name: &str, data: &[u8]) -> Result<Value, CodecError> {
        lookup(name).expect("codec should exist").decode(&Bytes::copy_from_slice(data))
    }

    fn encode(name: &str, value: Value) -> Vec<u8> {
        lookup(name).expect("codec should exist").encode(&value).expect("encoding should succeed")
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(ElementType::Utf8, lookup("utf-8").unwrap().element_type());
        assert_eq!(ElementType::Binary, lookup("binary").unwrap().element_type());
        assert!(lookup("master").is_none());
        assert!(lookup("bool").is_none());
    }

    #[test]
    fn strings() {
        assert_eq!(Value::String(String::new()), decode("string", &[]).unwrap());
        assert_eq!(Value::String(String::from("hello")), decode("string", b"hello").unwrap());
        assert_eq!(Value::String(String::from("A")), decode("string", &[0xC1]).unwrap());
        assert_eq!(Value::String(String::from("héllo")), decode("utf-8", "héllo".as_bytes()).unwrap());
        assert!(matches!(decode("utf-8", &[0xff, 0xfe]), Err(CodecError::Utf8 { .. })));
        assert_eq!(b"hello".to_vec(), encode("string", Value::String(String::from("hello"))));
    }

    #[test]
    fn unsigned_integers() {
        assert_eq!(Value::UnsignedInteger(0), decode("uinteger", &[]).unwrap());
        assert_eq!(Value::UnsignedInteger(27759), decode("uinteger", &[0x6c, 0x6f]).unwrap());
        assert!(matches!(decode("uinteger", &[1; 9]), Err(CodecError::IntegerLength(9))));

        assert_eq!(vec![0], encode("uinteger", Value::UnsignedInteger(0)));
        assert_eq!(vec![0x01, 0x00], encode("uinteger", Value::UnsignedInteger(256)));
        assert_eq!(8, lookup("uinteger").unwrap().encoding_length(&Value::UnsignedInteger(u64::MAX)).unwrap());
    }

    #[test]
    fn signed_integers() {
        assert_eq!(Value::Integer(0), decode("integer", &[]).unwrap());
        assert_eq!(Value::Integer(-1), decode("integer", &[0xff]).unwrap());
        assert_eq!(Value::Integer(255), decode("integer", &[0x00, 0xff]).unwrap());

        assert_eq!(vec![0xff], encode("integer", Value::Integer(-1)));
        assert_eq!(vec![0x00, 0x80], encode("integer", Value::Integer(128)));
        assert_eq!(vec![0x80], encode("integer", Value::Integer(-128)));
    }

    #[test]
    fn floats() {
        assert_eq!(Value::Float(0.0), decode("float", &[]).unwrap());
        assert_eq!(Value::Float(1.5), decode("float", &1.5f32.to_be_bytes()).unwrap());
        assert_eq!(Value::Float(0.1), decode("float", &0.1f64.to_be_bytes()).unwrap());
        assert!(matches!(decode("float", &[0, 0, 1]), Err(CodecError::FloatLength(3))));

        assert_eq!(4, encode("float", Value::Float(1.5)).len());
        assert_eq!(8, encode("float", Value::Float(0.1)).len());
    }

    #[test]
    fn dates() {
        let epoch = DateTime::<Utc>::from_timestamp_nanos(EBML_EPOCH_UNIX_NANOS);
        assert_eq!(Value::Date(epoch), decode("date", &[]).unwrap());

        let one_second = decode("date", &1_000_000_000i64.to_be_bytes()).unwrap();
        assert_eq!("2001-01-01T00:00:01+00:00", one_second.as_date().unwrap().to_rfc3339());

        let before = decode("date", &(-1_000_000_000i64).to_be_bytes()).unwrap();
        assert_eq!("2000-12-31T23:59:59+00:00", before.as_date().unwrap().to_rfc3339());

        assert!(encode("date", Value::Date(epoch)).is_empty());
        assert_eq!(1_000_000_000i64.to_be_bytes().to_vec(), encode("date", one_second));

        // 1700-01-01 is representable in nanoseconds but not as an offset from 2001
        let early = Value::Date(DateTime::<Utc>::from_timestamp(-8_520_336_000, 0).unwrap());
        let date = lookup("date").unwrap();
        assert!(matches!(date.encode(&early), Err(CodecError::DateRange(_))));
        assert!(matches!(date.encoding_length(&early), Err(CodecError::DateRange(_))));
    }

    #[test]
    fn binary_shares_input() {
        let data = Bytes::from_static(&[1, 2, 3]);
        let value = lookup("binary").unwrap().decode(&data).unwrap();

        assert_eq!(Some(&[1u8, 2, 3][..]), value.as_binary());
        assert_eq!(data.as_ptr(), value.as_binary().unwrap().as_ptr());
    }

    #[test]
    fn encode_type_mismatch() {
        let result = lookup("float").unwrap().encode(&Value::String(String::from("1.0")));
        assert!(matches!(result, Err(CodecError::TypeMismatch { expected: "float", found: "string" })));
    }
}
