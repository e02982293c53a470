//! Config-driven entry point over the literal encoders and text decoders.

use crate::array::{decode_array_with_shape, infer_shape, ArrayShape, PgArray};
use crate::bits::{decode_bits, BitString};
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::literal::{
    encode_array_literal_shaped, encode_literal_into, encode_record_literal, encode_typed_literal,
};
use crate::record::{decode_record, RecordType};
use crate::types::{SqlType, SqlTypeKind};
use crate::value::PgValue;

/// Applies a [`CodecConfig`] to every encode call.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Render a scalar literal.
    pub fn encode(&self, kind: SqlTypeKind, value: &PgValue) -> CodecResult<String> {
        let mut buf = String::new();
        self.encode_into(&mut buf, kind, value)?;
        Ok(buf)
    }

    pub fn encode_into(
        &self,
        buf: &mut String,
        kind: SqlTypeKind,
        value: &PgValue,
    ) -> CodecResult<()> {
        encode_literal_into(buf, kind, value, self.config.type_cast)?;
        tracing::trace!(%kind, literal = %buf, "encoded literal");
        Ok(())
    }

    /// Render a scalar literal for a declared type, checking its bounds.
    pub fn encode_typed(&self, ty: &SqlType, value: &PgValue) -> CodecResult<String> {
        let mut buf = String::new();
        encode_typed_literal(&mut buf, ty, value, self.config.type_cast)?;
        Ok(buf)
    }

    /// Render an array literal, decorating it per the configured policy.
    pub fn encode_array(
        &self,
        elem_kind: SqlTypeKind,
        array: &PgArray<PgValue>,
        shape: Option<&ArrayShape>,
    ) -> CodecResult<String> {
        let mut buf = String::new();
        encode_array_literal_shaped(
            &mut buf,
            elem_kind,
            array,
            shape,
            self.config.array_bounds,
            self.config.type_cast,
        )?;
        tracing::debug!(%elem_kind, items = array.len(), "encoded array literal");
        Ok(buf)
    }

    pub fn encode_record(
        &self,
        record_type: &RecordType,
        columns: &[PgValue],
    ) -> CodecResult<String> {
        let mut buf = String::new();
        encode_record_literal(&mut buf, record_type, columns)?;
        Ok(buf)
    }

    /// Decode backend array text whose elements are `elem_kind`.
    pub fn decode_array(
        &self,
        text: &str,
        elem_kind: SqlTypeKind,
        dims: usize,
    ) -> CodecResult<(PgArray<PgValue>, ArrayShape)> {
        decode_array_with_shape(text, dims, |element| {
            PgValue::from_text(elem_kind, element)
        })
    }

    pub fn decode_record(&self, text: &str, record_type: &RecordType) -> CodecResult<Vec<PgValue>> {
        decode_record(text, record_type)
    }

    pub fn decode_bits(&self, text: &str) -> CodecResult<BitString> {
        decode_bits(text)
    }

    /// Decode backend text output for the type with `type_oid`.
    ///
    /// Array type OIDs yield [`PgValue::Array`], with the dimension count
    /// read from the text itself.
    pub fn decode_by_oid(&self, text: &str, type_oid: u32) -> CodecResult<PgValue> {
        if let Some(kind) = SqlTypeKind::from_oid(type_oid) {
            return PgValue::from_text(kind, text);
        }
        let elem_kind = SqlTypeKind::from_array_oid(type_oid)
            .ok_or_else(|| CodecError::invalid(format!("unsupported type oid {}", type_oid)))?;
        let dims = infer_shape(text)?.ndim();
        let (array, _) = self.decode_array(text, elem_kind, dims)?;
        tracing::trace!(type_oid, %elem_kind, dims, "decoded array by oid");
        Ok(PgValue::Array(array))
    }
}
