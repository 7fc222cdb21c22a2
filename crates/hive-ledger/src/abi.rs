//! # Contract ABI Encoding
//!
//! Encodes constructor and function parameters in the Solidity ABI layout:
//! a head of 32-byte words (static values inline, dynamic values as offsets)
//! followed by a tail holding the dynamic data.
//!
//! ```text
//! call data = keccak256("name(type,...)")[0..4] ‖ head ‖ tail
//! ```
//!
//! Parameters are explicitly tagged [`ParamValue`]s. The order of a
//! [`ContractParams`] map is the caller's declaration order and must match
//! the contract signature; it is not checked against any ABI.

use hive_crypto::keccak256;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{AbiError, ParamError};

/// ABI word size
pub const WORD: usize = 32;

// ============================================================================
// Uint256
// ============================================================================

/// Unsigned 256-bit integer, big-endian
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uint256(pub [u8; WORD]);

impl Uint256 {
    /// Zero
    pub const ZERO: Uint256 = Uint256([0u8; WORD]);

    /// From a native integer
    pub fn from_u128(n: u128) -> Self {
        let mut bytes = [0u8; WORD];
        bytes[16..].copy_from_slice(&n.to_be_bytes());
        Uint256(bytes)
    }

    /// Parse a decimal string; `None` on non-digits or overflow
    pub fn from_dec_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let mut bytes = [0u8; WORD];
        for c in s.chars() {
            let digit = c.to_digit(10)?;
            // bytes = bytes * 10 + digit
            let mut carry = digit;
            for b in bytes.iter_mut().rev() {
                let v = (*b as u32) * 10 + carry;
                *b = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return None;
            }
        }
        Some(Uint256(bytes))
    }

    /// Decimal representation
    pub fn to_dec_string(&self) -> String {
        let mut work = self.0;
        if work.iter().all(|b| *b == 0) {
            return "0".to_string();
        }
        let mut digits = Vec::new();
        while work.iter().any(|b| *b != 0) {
            let mut rem = 0u32;
            for b in work.iter_mut() {
                let v = (rem << 8) | (*b as u32);
                *b = (v / 10) as u8;
                rem = v % 10;
            }
            digits.push(char::from(b'0' + rem as u8));
        }
        digits.iter().rev().collect()
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_dec_string())
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec_string())
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dec_string())
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Uint256::from_dec_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid uint256 '{}'", s)))
    }
}

// ============================================================================
// Parameter values
// ============================================================================

/// A typed contract parameter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    /// Dynamic UTF-8 string
    String(String),
    /// Unsigned 256-bit integer
    UInt256(Uint256),
    /// Boolean
    Bool(bool),
}

impl ParamValue {
    /// Solidity type name used in function signatures
    pub fn abi_type(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "string",
            ParamValue::UInt256(_) => "uint256",
            ParamValue::Bool(_) => "bool",
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(self, ParamValue::String(_))
    }

    /// Convert an untyped JSON value
    ///
    /// Strings, booleans and non-negative integers map to their variants.
    /// Floats, negatives, null, arrays and objects are rejected rather than
    /// coerced.
    pub fn from_json(name: &str, value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(ParamValue::UInt256(Uint256::from_u128(u as u128)))
                } else if n.is_i64() {
                    Err(ParamError::InvalidValue {
                        name: name.to_string(),
                        reason: format!("negative integer {} cannot be uint256", n),
                    })
                } else {
                    Err(ParamError::UnsupportedType {
                        name: name.to_string(),
                        found: "float".to_string(),
                    })
                }
            }
            Value::Null => Err(unsupported(name, "null")),
            Value::Array(_) => Err(unsupported(name, "array")),
            Value::Object(_) => Err(unsupported(name, "object")),
        }
    }

    /// Parse `type:value` text, e.g. `uint256:1000`, `bool:true`, `string:hi`
    pub fn parse_typed(name: &str, typed: &str) -> Result<Self, ParamError> {
        let (ty, raw) = typed.split_once(':').ok_or_else(|| ParamError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected 'type:value', got '{}'", typed),
        })?;
        match ty.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ParamValue::String(raw.to_string())),
            "uint256" | "uint" => Uint256::from_dec_str(raw)
                .map(ParamValue::UInt256)
                .ok_or_else(|| ParamError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("'{}' is not a uint256", raw),
                }),
            "bool" => match raw.trim() {
                "true" => Ok(ParamValue::Bool(true)),
                "false" => Ok(ParamValue::Bool(false)),
                other => Err(ParamError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("'{}' is not a bool", other),
                }),
            },
            other => Err(unsupported(name, other)),
        }
    }
}

fn unsupported(name: &str, found: &str) -> ParamError {
    ParamError::UnsupportedType {
        name: name.to_string(),
        found: found.to_string(),
    }
}

/// Named parameters in declaration order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractParams(IndexMap<String, ParamValue>);

impl ContractParams {
    /// Empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter (builder style)
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Append a parameter
    pub fn push(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    /// Convert a JSON object, keeping its textual key order
    pub fn from_json_str(json: &str) -> Result<Self, ParamError> {
        let raw: IndexMap<String, Value> =
            serde_json::from_str(json).map_err(|e| ParamError::InvalidValue {
                name: "<params>".to_string(),
                reason: e.to_string(),
            })?;
        let mut params = Self::new();
        for (name, value) in raw {
            let typed = ParamValue::from_json(&name, &value)?;
            params.push(name, typed);
        }
        Ok(params)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parameters in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Values in declaration order
    pub fn values(&self) -> Vec<&ParamValue> {
        self.0.values().collect()
    }

    /// ABI encoding of the values in declaration order
    pub fn encode(&self) -> Vec<u8> {
        encode_params(&self.values())
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let padded_len = bytes.len().div_ceil(WORD) * WORD;
    let mut out = bytes.to_vec();
    out.resize(padded_len, 0);
    out
}

fn usize_word(n: usize) -> [u8; WORD] {
    Uint256::from_u128(n as u128).0
}

/// Encode a parameter tuple with the head/tail layout
pub fn encode_params(values: &[&ParamValue]) -> Vec<u8> {
    let head_len = values.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        match value {
            ParamValue::UInt256(n) => head.extend_from_slice(&n.0),
            ParamValue::Bool(b) => {
                let mut word = [0u8; WORD];
                word[WORD - 1] = u8::from(*b);
                head.extend_from_slice(&word);
            }
            ParamValue::String(s) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                tail.extend_from_slice(&usize_word(s.len()));
                tail.extend_from_slice(&pad_right(s.as_bytes()));
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Canonical function signature, e.g. `registerContract(string,string)`
pub fn function_signature(name: &str, values: &[&ParamValue]) -> String {
    let types: Vec<&str> = values.iter().map(|v| v.abi_type()).collect();
    format!("{}({})", name, types.join(","))
}

/// First four bytes of the Keccak-256 of a signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Builds call data with a selector cache
pub struct FunctionEncoder {
    selectors: RwLock<HashMap<String, [u8; 4]>>,
}

impl FunctionEncoder {
    pub fn new() -> Self {
        Self {
            selectors: RwLock::new(HashMap::new()),
        }
    }

    /// Selector for a signature, computed once
    pub fn selector(&self, signature: &str) -> [u8; 4] {
        if let Some(sel) = self.selectors.read().get(signature) {
            return *sel;
        }
        let sel = selector(signature);
        self.selectors.write().insert(signature.to_string(), sel);
        sel
    }

    /// `selector ‖ abi(params)` for a named function
    pub fn encode_call(&self, name: &str, params: &ContractParams) -> Vec<u8> {
        let values = params.values();
        let signature = function_signature(name, &values);
        let mut data = self.selector(&signature).to_vec();
        data.extend_from_slice(&encode_params(&values));
        data
    }
}

impl Default for FunctionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset
        .checked_add(WORD)
        .ok_or_else(|| AbiError::OutOfRange(format!("offset {}", offset)))?;
    data.get(offset..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::OutOfRange("value exceeds 64 bits".to_string()));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail))
        .map_err(|_| AbiError::OutOfRange("value exceeds usize".to_string()))
}

/// String whose head word sits at `head`
fn read_string_at(data: &[u8], head: usize) -> Result<String, AbiError> {
    let offset = word_to_usize(read_word(data, head)?)?;
    let len = word_to_usize(read_word(data, offset)?)?;
    let end = offset
        .checked_add(WORD)
        .and_then(|start| start.checked_add(len))
        .ok_or_else(|| AbiError::OutOfRange(format!("length {}", len)))?;
    let bytes = data.get(end - len..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Decode a single `string` return value
pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    read_string_at(data, 0)
}

/// Decode `count` leading `string` arguments from call data (selector stripped)
pub fn decode_string_args(data: &[u8], count: usize) -> Result<Vec<String>, AbiError> {
    (0..count)
        .map(|i| {
            let head = i
                .checked_mul(WORD)
                .ok_or_else(|| AbiError::OutOfRange(format!("argument {}", i)))?;
            read_string_at(data, head)
        })
        .collect()
}
