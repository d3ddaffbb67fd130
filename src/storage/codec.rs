use serde::de::DeserializeOwned;
use serde::Serialize;

use super::StorageError;
use crate::raft::PersistentState;

/// Byte encoding of persisted node state.
pub trait StateCodec: Send + Sync + 'static {
    fn encode<T: Serialize>(state: &PersistentState<T>) -> Result<Vec<u8>, StorageError>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<PersistentState<T>, StorageError>;
}

/// Self-describing JSON; handles dynamic values such as `serde_json::Value`.
pub struct JsonCodec;

impl StateCodec for JsonCodec {
    fn encode<T: Serialize>(state: &PersistentState<T>) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(state).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<PersistentState<T>, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
    }
}

/// Compact bincode encoding for concrete value types. Not usable with types
/// that need `deserialize_any`.
pub struct BincodeCodec;

impl StateCodec for BincodeCodec {
    fn encode<T: Serialize>(state: &PersistentState<T>) -> Result<Vec<u8>, StorageError> {
        bincode::serde::encode_to_vec(state, bincode::config::standard())
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<PersistentState<T>, StorageError> {
        let (state, _): (PersistentState<T>, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raft::NodeId;

    #[test]
    fn json_keeps_dynamic_values() {
        let state = PersistentState {
            term: 3,
            voted_for: Some(NodeId::from("n2")),
            data: serde_json::json!({"counter": 7, "tags": ["a", "b"]}),
        };
        let bytes = JsonCodec::encode(&state).expect("encode");
        let decoded: PersistentState<serde_json::Value> = JsonCodec::decode(&bytes).expect("decode");
        assert_eq!(decoded, state);
    }

    #[test]
    fn bincode_is_smaller_than_json_for_fixed_types() {
        let state = PersistentState {
            term: 42,
            voted_for: None,
            data: vec![1u32, 2, 3],
        };
        let compact = BincodeCodec::encode(&state).expect("encode");
        let verbose = JsonCodec::encode(&state).expect("encode");
        assert!(compact.len() < verbose.len());

        let decoded: PersistentState<Vec<u32>> = BincodeCodec::decode(&compact).expect("decode");
        assert_eq!(decoded, state);
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let err = JsonCodec::decode::<u64>(b"not json").unwrap_err();
        assert!(matches!(err, StorageError::SerializationError(_)));
    }
}
