//! JSON <-> SSZ bridge for the beacon-API response shapes verifiers read
//! proofs from. Field matching is case-insensitive and tolerates both
//! `snake_case` (consensus-spec JSON) and `camelCase` (some client APIs).

use serde_json::Value;
use thiserror::Error;

use super::builder::SszBuilder;
use super::types::{Def, UintSize};
use crate::bytes::hex_decode;

#[derive(Debug, Error)]
pub enum SszJsonError {
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("field '{0}' has the wrong JSON type")]
    WrongType(String),
    #[error("invalid hex in field '{0}': {1}")]
    InvalidHex(String, String),
    #[error("invalid decimal integer in field '{0}': {1}")]
    InvalidInt(String, String),
    #[error("unsupported definition for JSON encoding")]
    Unsupported,
}

/// Look up a field by name, tolerating `snake_case`/`camelCase` and case.
fn find_field<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
    let map = obj.as_object()?;
    if let Some(v) = map.get(name) {
        return Some(v);
    }
    let normalized = name.replace('_', "").to_lowercase();
    map.iter()
        .find(|(k, _)| k.replace('_', "").to_lowercase() == normalized)
        .map(|(_, v)| v)
}

fn field<'a>(obj: &'a Value, name: &str) -> Result<&'a Value, SszJsonError> {
    find_field(obj, name).ok_or_else(|| SszJsonError::MissingField(name.to_string()))
}

/// Parse a JSON string that is either `0x`-prefixed hex or a plain decimal
/// integer into `width` little-endian bytes.
fn parse_uint_le(value: &Value, name: &str, width: usize) -> Result<Vec<u8>, SszJsonError> {
    let s = value
        .as_str()
        .ok_or_else(|| SszJsonError::WrongType(name.to_string()))?;
    let mut out = vec![0u8; width];
    if let Some(hex_part) = s.strip_prefix("0x") {
        let be = hex::decode(hex_part).map_err(|e| SszJsonError::InvalidHex(name.to_string(), e.to_string()))?;
        let start = width.saturating_sub(be.len());
        for (i, b) in be.iter().rev().enumerate() {
            if i >= width {
                break;
            }
            out[i] = *b;
        }
        let _ = start;
    } else {
        let n: u128 = s
            .parse()
            .map_err(|_| SszJsonError::InvalidInt(name.to_string(), s.to_string()))?;
        let le = n.to_le_bytes();
        out.copy_from_slice(&le[..width]);
    }
    Ok(out)
}

fn parse_bytes(value: &Value, name: &str) -> Result<Vec<u8>, SszJsonError> {
    let s = value
        .as_str()
        .ok_or_else(|| SszJsonError::WrongType(name.to_string()))?;
    hex_decode(s).map_err(|e| SszJsonError::InvalidHex(name.to_string(), e.to_string()))
}

/// Encode a single JSON value against `def`, recursing through containers,
/// vectors, and lists. `value` must already be the JSON node for this `def`
/// (callers descend field-by-field for containers via `find_field`).
pub fn json_to_ssz(def: &Def, value: &Value) -> Result<Vec<u8>, SszJsonError> {
    match def {
        Def::Uint(u) => parse_uint_le(value, "<uint>", u.bytes()),
        Def::Boolean => {
            let b = value.as_bool().ok_or(SszJsonError::WrongType("<bool>".into()))?;
            Ok(vec![b as u8])
        }
        Def::BitVector(bits) => {
            let bytes = parse_bytes(value, "<bitvector>")?;
            if bytes.len() != (bits + 7) / 8 {
                return Err(SszJsonError::WrongType("<bitvector>".into()));
            }
            Ok(bytes)
        }
        Def::BitList(_) => parse_bytes(value, "<bitlist>"),
        Def::Vector(inner, n) => encode_sequence(inner, value, Some(*n)),
        Def::List(inner, _) => encode_sequence(inner, value, None),
        Def::Container(fields) => encode_container(fields, value),
        Def::Union(_) => Err(SszJsonError::Unsupported),
    }
}

fn encode_sequence(inner: &Def, value: &Value, expect_len: Option<usize>) -> Result<Vec<u8>, SszJsonError> {
    // A byte-vector of uint8 is conventionally represented as one hex string
    // rather than a JSON array of numbers (matches beacon-API conventions).
    if matches!(inner, Def::Uint(UintSize::U8)) && value.is_string() {
        return parse_bytes(value, "<byte-vector>");
    }
    let arr = value.as_array().ok_or(SszJsonError::WrongType("<sequence>".into()))?;
    if let Some(n) = expect_len {
        if arr.len() != n {
            return Err(SszJsonError::WrongType("<sequence-length>".into()));
        }
    }
    let elements: Vec<Vec<u8>> = arr
        .iter()
        .map(|v| json_to_ssz(inner, v))
        .collect::<Result<_, _>>()?;
    if inner.is_variable_size() {
        Ok(SszBuilder::encode_variable_list(&elements))
    } else {
        Ok(SszBuilder::encode_fixed_list(&elements))
    }
}

fn encode_container(fields: &[(&'static str, Def)], value: &Value) -> Result<Vec<u8>, SszJsonError> {
    let mut builder = SszBuilder::new();
    for (name, field_def) in fields {
        let v = field(value, name)?;
        let encoded = json_to_ssz(field_def, v)?;
        if field_def.is_variable_size() {
            builder.push_dynamic(encoded);
        } else {
            builder.push_fixed(&encoded);
        }
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_hex_and_decimal_uints() {
        let def = Def::Uint(UintSize::U64);
        let from_hex = json_to_ssz(&def, &json!("0x2a")).unwrap();
        let from_dec = json_to_ssz(&def, &json!("42")).unwrap();
        assert_eq!(from_hex[0], 42);
        assert_eq!(from_dec[0], 42);
    }

    #[test]
    fn container_field_matching_is_case_insensitive() {
        let def = Def::Container(vec![("proposer_index", Def::Uint(UintSize::U64))]);
        let value = json!({"proposerIndex": "7"});
        let encoded = encode_container(
            match &def {
                Def::Container(f) => f,
                _ => unreachable!(),
            },
            &value,
        )
        .unwrap();
        assert_eq!(encoded[0], 7);
    }

    #[test]
    fn byte_vector_from_hex_string() {
        let def = Def::Vector(Box::new(Def::Uint(UintSize::U8)), 4);
        let encoded = json_to_ssz(&def, &json!("0xdeadbeef")).unwrap();
        assert_eq!(encoded, vec![0xde, 0xad, 0xbe, 0xef]);
    }
}
