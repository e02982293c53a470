//! # pgtext
//!
//! PostgreSQL text-format literals: render typed values as SQL literal text
//! and parse the backend's array, composite record and bit-string output.
//!
//! ## Quick Example
//!
//! ```
//! use pgtext::prelude::*;
//!
//! // Scalar literals
//! let sql = encode_literal(SqlTypeKind::Text, &PgValue::from("a\nb"), false).unwrap();
//! assert_eq!(sql, "E'a\\nb'");
//!
//! // Array text from the backend
//! let arr = decode_array("{1,NULL,3}", 1, |s| {
//!     PgValue::from_text(SqlTypeKind::Integer, s)
//! })
//! .unwrap();
//! assert_eq!(arr.len(), 3);
//! ```
//!
//! ## Grammars
//!
//! | Form              | Example                    |
//! |-------------------|----------------------------|
//! | String constant   | `'it''s'`, `E'a\nb'`       |
//! | Array             | `{1,2}`, `[0:1]={1,2}`     |
//! | Record            | `(1,"a,b",)`               |
//! | Bit string        | `B'0101'`, `X'1F'`         |
//! | Bytea             | `'\x0aff'`                 |

pub mod array;
pub mod bits;
pub mod codec;
pub mod config;
pub mod error;
pub mod escape;
pub mod literal;
pub mod record;
pub mod scan;
pub mod temporal;
pub mod types;
pub mod value;

pub use array::{ArrayItem, ArrayShape, BoundsPolicy, PgArray};
pub use bits::BitString;
pub use codec::Codec;
pub use config::CodecConfig;
pub use error::{CodecError, CodecResult};
pub use literal::encode_literal;
pub use record::RecordType;
pub use types::{SqlType, SqlTypeKind};
pub use value::PgValue;

pub mod prelude {
    pub use crate::array::{
        decode_array, decode_array_with_shape, encode_array, encode_array_shaped, encode_slice,
        infer_length, infer_shape, ArrayItem, ArrayShape, BoundsPolicy, Dimension, PgArray,
    };
    pub use crate::bits::{decode_bits, encode_bits, BitString};
    pub use crate::codec::Codec;
    pub use crate::config::CodecConfig;
    pub use crate::error::*;
    pub use crate::escape::{quote_literal, unquote_literal};
    pub use crate::literal::{
        encode_array_literal, encode_array_literal_shaped, encode_literal, encode_literal_into,
        encode_record_literal, encode_typed_literal,
    };
    pub use crate::record::{decode_record, decode_record_with, encode_record, RecordType};
    pub use crate::types::{SqlType, SqlTypeKind};
    pub use crate::value::PgValue;
}

/// Quote `text` as a SQL string constant.
///
/// # Example
///
/// ```
/// assert_eq!(pgtext::quote("O'Reilly"), "'O''Reilly'");
/// assert_eq!(pgtext::quote("C:\\tmp"), "E'C:\\\\tmp'");
/// ```
pub fn quote(text: &str) -> String {
    escape::quoted(text)
}
