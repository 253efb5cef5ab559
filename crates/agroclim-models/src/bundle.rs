//! Versioned bundle persistence shared by every predictor.
//!
//! A bundle is a bincode envelope `{format_version, kind, state}` where the
//! state payload is pre-serialized, so the version and kind checks run
//! before the predictor-specific state is decoded.

use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::ModelError;

/// Current bundle format version.
const FORMAT_VERSION: u32 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct BundleEnvelope {
    format_version: u32,
    kind: String,
    state: Vec<u8>,
}

/// Serialize `state` into a kind-tagged envelope and write it to `sink`.
pub(crate) fn save<S: Serialize>(
    kind: &str,
    state: &S,
    sink: &mut impl Write,
) -> Result<(), ModelError> {
    let state = bincode::serialize(state).map_err(|e| ModelError::SerializeBundle { source: e })?;
    let envelope = BundleEnvelope {
        format_version: FORMAT_VERSION,
        kind: kind.to_string(),
        state,
    };
    let bytes =
        bincode::serialize(&envelope).map_err(|e| ModelError::SerializeBundle { source: e })?;
    sink.write_all(&bytes).map_err(|e| ModelError::WriteBundle {
        path: "<sink>".into(),
        source: e,
    })?;
    debug!(kind, size_bytes = bytes.len(), "bundle serialized");
    Ok(())
}

/// Read an envelope from `source`, verify version and kind, and decode
/// the state.
pub(crate) fn load<S: DeserializeOwned>(kind: &str, source: &mut impl Read) -> Result<S, ModelError> {
    let mut bytes = Vec::new();
    source
        .read_to_end(&mut bytes)
        .map_err(|e| ModelError::ReadBundle {
            path: "<source>".into(),
            source: e,
        })?;
    let envelope: BundleEnvelope =
        bincode::deserialize(&bytes).map_err(|e| ModelError::DeserializeBundle { source: e })?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(ModelError::IncompatibleBundleVersion {
            expected: FORMAT_VERSION,
            found: envelope.format_version,
        });
    }
    if envelope.kind != kind {
        return Err(ModelError::BundleKindMismatch {
            expected: kind.to_string(),
            found: envelope.kind,
        });
    }

    let state = bincode::deserialize(&envelope.state)
        .map_err(|e| ModelError::DeserializeBundle { source: e })?;
    debug!(kind, "bundle deserialized");
    Ok(state)
}

/// Write a bundle to a file.
#[instrument(skip(state), fields(path = %path.as_ref().display()))]
pub(crate) fn save_path<S: Serialize>(
    kind: &str,
    state: &S,
    path: impl AsRef<Path>,
) -> Result<(), ModelError> {
    let path = path.as_ref();
    let mut buf = Vec::new();
    save(kind, state, &mut buf)?;
    std::fs::write(path, &buf).map_err(|e| ModelError::WriteBundle {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(kind, size_bytes = buf.len(), "bundle saved");
    Ok(())
}

/// Read a bundle from a file.
#[instrument(fields(path = %path.as_ref().display()))]
pub(crate) fn load_path<S: DeserializeOwned>(
    kind: &str,
    path: impl AsRef<Path>,
) -> Result<S, ModelError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ModelError::ReadBundle {
        path: path.to_path_buf(),
        source: e,
    })?;
    let state = load(kind, &mut bytes.as_slice())?;
    info!(kind, "bundle loaded");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct DummyState {
        names: Vec<String>,
        values: Vec<f64>,
    }

    fn dummy() -> DummyState {
        DummyState {
            names: vec!["a".to_string()],
            values: vec![1.5, -2.25],
        }
    }

    #[test]
    fn round_trip_through_memory() {
        let mut buf = Vec::new();
        save("dummy", &dummy(), &mut buf).unwrap();
        let back: DummyState = load("dummy", &mut buf.as_slice()).unwrap();
        assert_eq!(back, dummy());
    }

    #[test]
    fn kind_mismatch_detected_before_state_decode() {
        let mut buf = Vec::new();
        save("rainfall", &dummy(), &mut buf).unwrap();
        // A completely different state type still fails with the kind error.
        let err = load::<Vec<u32>>("drought", &mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ModelError::BundleKindMismatch { .. }));
    }

    #[test]
    fn corrupt_bytes_rejected() {
        let err = load::<DummyState>("dummy", &mut &b"garbage"[..]).unwrap_err();
        assert!(matches!(err, ModelError::DeserializeBundle { .. }));
    }

    #[test]
    fn missing_file_reported_with_path() {
        let err = load_path::<DummyState>("dummy", "/tmp/agroclim_missing_bundle.bin").unwrap_err();
        assert!(matches!(err, ModelError::ReadBundle { .. }));
    }
}
