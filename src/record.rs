use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// What a record holds. Stored so a chunk file can never be mistaken for an
/// index snapshot and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Chunk = 0x01,
    IndexSnapshot = 0x02,
}

impl RecordKind {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(RecordKind::Chunk),
            0x02 => Ok(RecordKind::IndexSnapshot),
            _ => Err(Error::Deserialization(format!("invalid record kind: {byte}"))),
        }
    }
}

/// A single self-contained record: one per chunk file, one per index snapshot.
///
/// On-disk format:
/// ```text
/// ┌──────────┬──────────┬──────────┬───────────────────┐
/// │ CRC (4B) │ Kind (1B)│ Len (4B) │ JSON payload (var)│
/// └──────────┴──────────┴──────────┴───────────────────┘
/// ```
///
/// CRC covers everything after the CRC field itself. The payload is JSON so
/// the record stays self-describing; the frame only adds integrity and a
/// kind tag.
#[derive(Debug, Clone)]
pub struct Record {
    pub kind: RecordKind,
    pub payload: Vec<u8>,
}

const CRC_SIZE: usize = 4;
const KIND_SIZE: usize = 1;
const LEN_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + KIND_SIZE + LEN_SIZE;

impl Record {
    /// Serialize `value` as the payload of a new record.
    pub fn from_value<T: Serialize>(kind: RecordKind, value: &T) -> Result<Self> {
        Ok(Record {
            kind,
            payload: serde_json::to_vec(value)?,
        })
    }

    /// Deserialize the payload, checking the record is of the `expected` kind.
    pub fn into_value<T: DeserializeOwned>(self, expected: RecordKind) -> Result<T> {
        if self.kind != expected {
            return Err(Error::Deserialization(format!(
                "expected {expected:?} record, found {:?}",
                self.kind
            )));
        }
        serde_json::from_slice(&self.payload)
            .map_err(|e| Error::Deserialization(format!("bad payload: {e}")))
    }

    /// Serialize this record to bytes (including CRC header).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload_len = frame_len(self.payload.len())?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());

        // Reserve space for CRC, filled in last
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.push(self.kind as u8);
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Deserialize a record. The buffer must hold exactly one record.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Deserialization("record too short".into()));
        }

        let stored_crc = read_u32(&data[0..CRC_SIZE]);
        let payload_len = read_u32(&data[CRC_SIZE + KIND_SIZE..HEADER_SIZE]) as usize;

        let total_len = HEADER_SIZE + payload_len;
        if data.len() < total_len {
            return Err(Error::Deserialization("record truncated".into()));
        }
        if data.len() > total_len {
            return Err(Error::Deserialization(format!(
                "{} trailing bytes after record",
                data.len() - total_len
            )));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..]);
        if stored_crc != computed_crc {
            return Err(Error::Deserialization("CRC mismatch".into()));
        }

        let kind = RecordKind::from_u8(data[CRC_SIZE])?;

        Ok(Record {
            kind,
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }

    /// Size of this record when serialized.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Payload length as stored in the frame header. Oversized payloads are an
/// encoding failure, not an I/O one.
fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::Serialization(serde::ser::Error::custom(format!(
            "record payload of {len} bytes exceeds the 4 GiB frame limit"
        )))
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}
