//! Field-block envelope codec
//!
//! A message is a sequence of fields, each `[type: u8][len: u32 BE][payload]`,
//! terminated by an `END_OF_MESSAGE` header with zero length. Requests carry a
//! single ACTION field; responses carry METADATA (or METADATA_PATCH) followed
//! by image fields in agent order.

use serde::Serialize;
use serde_json::Value;
use thor_core::{Result, ThorError};

/// Largest accepted field payload (64 MiB)
pub const MAX_FIELD_LEN: usize = 64 * 1024 * 1024;

/// Type tag of the terminating header
pub const END_OF_MESSAGE: u8 = 255;

/// Size of a field header on the wire
pub const HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    Metadata = 1,
    Action = 2,
    ActionResult = 3,
    RgbImage = 4,
    DepthImage = 5,
    NormalsImage = 6,
    FlowsImage = 7,
    ClassesImage = 8,
    IdsImage = 9,
    ThirdPartyImage = 10,
    MetadataPatch = 11,
    ThirdPartyDepth = 12,
    ThirdPartyNormals = 13,
    ThirdPartyImageIds = 14,
    ThirdPartyClasses = 15,
    ThirdPartyFlow = 16,
}

impl TryFrom<u8> for FieldType {
    type Error = ThorError;

    fn try_from(tag: u8) -> Result<Self> {
        let kind = match tag {
            1 => FieldType::Metadata,
            2 => FieldType::Action,
            3 => FieldType::ActionResult,
            4 => FieldType::RgbImage,
            5 => FieldType::DepthImage,
            6 => FieldType::NormalsImage,
            7 => FieldType::FlowsImage,
            8 => FieldType::ClassesImage,
            9 => FieldType::IdsImage,
            10 => FieldType::ThirdPartyImage,
            11 => FieldType::MetadataPatch,
            12 => FieldType::ThirdPartyDepth,
            13 => FieldType::ThirdPartyNormals,
            14 => FieldType::ThirdPartyImageIds,
            15 => FieldType::ThirdPartyClasses,
            16 => FieldType::ThirdPartyFlow,
            other => {
                return Err(ThorError::Transport(format!("unknown field type {other}")));
            }
        };
        Ok(kind)
    }
}

/// One typed payload
#[derive(Clone, PartialEq, Eq)]
pub struct Field {
    pub kind: FieldType,
    pub payload: Vec<u8>,
}

impl Field {
    pub fn new(kind: FieldType, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// JSON-encode a value into a field
    pub fn json<T: Serialize>(kind: FieldType, value: &T) -> Result<Self> {
        Ok(Self::new(kind, serde_json::to_vec(value)?))
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field({:?}, {} bytes)", self.kind, self.payload.len())
    }
}

/// An ordered set of fields exchanged as one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub fields: Vec<Field>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request envelope carrying one action
    pub fn action(action: &Value) -> Result<Self> {
        Ok(Self {
            fields: vec![Field::json(FieldType::Action, action)?],
        })
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Builder-style push
    pub fn with(mut self, kind: FieldType, payload: Vec<u8>) -> Self {
        self.push(Field::new(kind, payload));
        self
    }

    /// First field of a type
    pub fn first(&self, kind: FieldType) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == kind)
    }

    /// Every field of a type, in wire order
    pub fn all(&self, kind: FieldType) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.kind == kind)
    }

    /// Parse the first field of a type as JSON
    pub fn json(&self, kind: FieldType) -> Result<Option<Value>> {
        self.first(kind)
            .map(|f| serde_json::from_slice(&f.payload).map_err(ThorError::from))
            .transpose()
    }

    /// Total encoded size
    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| HEADER_LEN + f.payload.len())
            .sum::<usize>()
            + HEADER_LEN
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for field in &self.fields {
            if field.payload.len() > MAX_FIELD_LEN {
                return Err(ThorError::Transport(format!(
                    "{:?} field too large: {} bytes",
                    field.kind,
                    field.payload.len()
                )));
            }
            out.push(field.kind as u8);
            out.extend_from_slice(&(field.payload.len() as u32).to_be_bytes());
            out.extend_from_slice(&field.payload);
        }
        out.push(END_OF_MESSAGE);
        out.extend_from_slice(&0u32.to_be_bytes());
        Ok(out)
    }

    /// Decode one complete message; trailing bytes are an error
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut envelope = Envelope::new();
        let mut rest = bytes;
        loop {
            let (tag, len) = parse_header(rest)?;
            rest = &rest[HEADER_LEN..];
            if tag == END_OF_MESSAGE {
                if !rest.is_empty() {
                    return Err(ThorError::Transport(format!(
                        "{} trailing bytes after end of message",
                        rest.len()
                    )));
                }
                return Ok(envelope);
            }
            if rest.len() < len {
                return Err(ThorError::Transport(format!(
                    "truncated field: need {len} bytes, have {}",
                    rest.len()
                )));
            }
            let kind = FieldType::try_from(tag)?;
            envelope.push(Field::new(kind, rest[..len].to_vec()));
            rest = &rest[len..];
        }
    }
}

/// Split a field header into its type tag and checked payload length
pub fn parse_header(bytes: &[u8]) -> Result<(u8, usize)> {
    let header: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| ThorError::Transport("truncated field header".into()))?;
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len > MAX_FIELD_LEN {
        return Err(ThorError::Transport(format!(
            "field too large: {len} bytes"
        )));
    }
    Ok((header[0], len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_layout() {
        let envelope = Envelope::new().with(FieldType::Metadata, b"{}".to_vec());
        let bytes = envelope.encode().unwrap();

        assert_eq!(bytes, vec![1, 0, 0, 0, 2, b'{', b'}', 255, 0, 0, 0, 0]);
        assert_eq!(bytes.len(), envelope.encoded_len());
        assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_images_keep_wire_order() {
        let envelope = Envelope::new()
            .with(FieldType::Metadata, b"{}".to_vec())
            .with(FieldType::RgbImage, vec![1; 12])
            .with(FieldType::DepthImage, vec![2; 16])
            .with(FieldType::RgbImage, vec![3; 12]);
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();

        let rgb: Vec<u8> = decoded
            .all(FieldType::RgbImage)
            .map(|f| f.payload[0])
            .collect();
        assert_eq!(rgb, vec![1, 3]);
    }

    #[test]
    fn test_action_envelope_json() {
        let envelope = Envelope::action(&json!({"action": "Pass", "sequenceId": 1})).unwrap();
        let action = envelope.json(FieldType::Action).unwrap().unwrap();
        assert_eq!(action["action"], "Pass");
        assert!(envelope.json(FieldType::Metadata).unwrap().is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(Envelope::decode(&[1, 0, 0]).is_err());
        assert!(Envelope::decode(&[1, 0, 0, 0, 9, 1, 2]).is_err());
        assert!(Envelope::decode(&[42, 0, 0, 0, 0, 255, 0, 0, 0, 0]).is_err());
        assert!(Envelope::decode(&[255, 0, 0, 0, 0, 7]).is_err());

        let oversized = [1, 0x10, 0, 0, 0];
        let err = parse_header(&oversized).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
