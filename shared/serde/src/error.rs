use thiserror::Error;

/// Errors that can occur while reading values out of a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The stream ended before the value was fully read
    #[error("Unexpected end of stream after {bits_read} bits")]
    UnexpectedEnd { bits_read: u32 },

    /// A string payload was not valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// A decoded value is outside the range the type allows
    #[error("Invalid {type_name} value read from stream")]
    InvalidValue { type_name: &'static str },

    /// A length prefix exceeds the remaining stream
    #[error("Length prefix {length} exceeds the remaining {remaining_bits} bits")]
    LengthOverflow { length: u64, remaining_bits: u32 },
}
