//! Snapshot encoding for persisted collections
//!
//! Each collection is written to its own slot as a versioned envelope:
//!
//! ```json
//! {"version": 1, "checksum": "<sha256 hex>", "records": [...]}
//! ```
//!
//! The checksum covers the canonical (key-sorted) JSON of `records`. Slots
//! written before envelopes existed hold the bare value (usually an array);
//! they decode as version 0 and are migrated on load.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Storage slot for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Cases,
    Projects,
    Tasks,
    Goals,
    Sessions,
    Contacts,
    ContactInteractions,
    Onboarding,
}

impl Slot {
    pub const ALL: [Slot; 8] = [
        Slot::Cases,
        Slot::Projects,
        Slot::Tasks,
        Slot::Goals,
        Slot::Sessions,
        Slot::Contacts,
        Slot::ContactInteractions,
        Slot::Onboarding,
    ];

    /// Key under which the slot is stored
    pub fn key(&self) -> &'static str {
        match self {
            Slot::Cases => "cases",
            Slot::Projects => "projects",
            Slot::Tasks => "tasks",
            Slot::Goals => "goals",
            Slot::Sessions => "sessions",
            Slot::Contacts => "contacts",
            Slot::ContactInteractions => "contact-interactions",
            Slot::Onboarding => "onboarding",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A decoded slot value.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    /// Format version found on disk, before migration
    pub version: u32,
}

impl<T> Decoded<T> {
    /// True if the slot should be rewritten in the current format
    pub fn needs_rewrite(&self) -> bool {
        self.version < SNAPSHOT_VERSION
    }
}

/// Encode a collection into envelope bytes.
pub fn encode<T: Serialize + ?Sized>(records: &T) -> Result<Vec<u8>> {
    let records = serde_json::to_value(records)?;
    let checksum = checksum(&records)?;
    let envelope = serde_json::json!({
        "version": SNAPSHOT_VERSION,
        "checksum": checksum,
        "records": records,
    });
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode slot bytes, validating the envelope and migrating old formats.
pub fn decode<T: DeserializeOwned>(slot: Slot, bytes: &[u8]) -> Result<Decoded<T>> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| corrupt(slot, format!("not JSON: {e}")))?;

    let (version, records) = split_envelope(slot, value)?;
    let records = migrate(version, records);

    let value = serde_json::from_value(records)
        .map_err(|e| corrupt(slot, format!("records do not match the expected shape: {e}")))?;

    Ok(Decoded { value, version })
}

fn split_envelope(slot: Slot, value: Value) -> Result<(u32, Value)> {
    let mut map = match value {
        Value::Object(map) if map.contains_key("version") => map,
        legacy => return Ok((0, legacy)),
    };

    let version = map
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| corrupt(slot, "version is not an unsigned integer"))?;

    if version > SNAPSHOT_VERSION {
        return Err(Error::UnsupportedVersion {
            slot: slot.key().to_string(),
            found: version,
            supported: SNAPSHOT_VERSION,
        });
    }

    let records = map
        .remove("records")
        .ok_or_else(|| corrupt(slot, "envelope has no records"))?;
    let expected = map
        .get("checksum")
        .and_then(Value::as_str)
        .ok_or_else(|| corrupt(slot, "envelope has no checksum"))?;

    let actual = checksum(&records)?;
    if actual != expected {
        return Err(corrupt(
            slot,
            format!("checksum mismatch (expected {expected}, computed {actual})"),
        ));
    }

    Ok((version, records))
}

/// Bring records from `version` up to [`SNAPSHOT_VERSION`].
fn migrate(version: u32, records: Value) -> Value {
    if version == 0 {
        // Version 0 stored the bare value; the record shape is unchanged.
        tracing::debug!("Migrating version 0 snapshot");
    }
    records
}

fn checksum(records: &Value) -> Result<String> {
    let canonical = serde_json::to_vec(records)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn corrupt(slot: Slot, reason: impl Into<String>) -> Error {
    Error::CorruptState {
        slot: slot.key().to_string(),
        reason: reason.into(),
    }
}
