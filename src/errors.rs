pub mod tool {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ToolError {
        #[error("Unrepresentable Vint size encountered.")]
        ReadVintOverflow,

        #[error("Value too large to be written as a vint: {0}")]
        WriteVintOverflow(u64),

        #[error("Could not read unsigned int from array: {0:?}")]
        ReadU64Overflow(Vec<u8>),

        #[error("Could not read int from array: {0:?}")]
        ReadI64Overflow(Vec<u8>),

        #[error("Could not read float from array: {0:?}")]
        ReadF64Mismatch(Vec<u8>),
    }
}

pub mod codec {
    use std::string::FromUtf8Error;
    use thiserror::Error;

    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum CodecError {
        #[error("float length must be either 0, 4 or 8 bytes, found {0}")]
        FloatLength(usize),

        #[error("integer length must be at most 8 bytes, found {0}")]
        IntegerLength(usize),

        #[error("Error parsing data as Utf8.  See `source()` for details.")]
        Utf8 {
            #[from]
            source: FromUtf8Error,
        },

        #[error("date is {0} ns away from the EBML epoch, which can't be represented")]
        DateRange(i64),

        #[error("cannot encode a {found} value as {expected}")]
        TypeMismatch {
            expected: &'static str,
            found: &'static str,
        },

        #[error(transparent)]
        Tool(#[from] ToolError),
    }
}

pub mod decoder {
    use std::io;
    use thiserror::Error;

    use ebml_decoder_schema::ElementType;

    use super::codec::CodecError;

    #[derive(Debug, Error)]
    pub enum DecodeError {
        #[error("varint length greater than allowed max of {max} bytes at offset {position}")]
        WidthOverflow {
            position: u64,
            max: usize,
        },

        #[error("unknown element with id {id} at offset {position}")]
        UnknownElement {
            id: String,
            position: u64,
        },

        #[error("child elements exceeding parent length: {parent} at offset {position} overflowed by {excess} bytes")]
        SizeOverflow {
            parent: String,
            position: u64,
            excess: u64,
        },

        #[error("could not decode element {id} at offset {position} as {element_type}")]
        CodecFailure {
            id: String,
            position: u64,
            element_type: ElementType,
            #[source]
            source: CodecError,
        },

        #[error("Error reading from source.")]
        Read {
            #[from]
            source: io::Error,
        },
    }

    #[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
    pub enum WriteError {
        #[error("the previous chunk has not been drained yet")]
        ChunkPending,

        #[error("end of input was already signalled")]
        Ended,

        #[error("the decoder is closed")]
        Closed,
    }
}
