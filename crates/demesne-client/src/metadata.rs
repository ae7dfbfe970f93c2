use serde::Deserialize;

use crate::error::DomainError;

/// Parsed `domain_metadata` payload.
///
/// The wire format is camelCase JSON. Every field is optional; a domain
/// without a canonical refinement simply has no refined assets to load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetadata {
    #[serde(default)]
    pub canonical_refinement: Option<String>,
    #[serde(default)]
    pub canonical_refinement_alignment_matrix: Option<[f32; 16]>,
}

impl DomainMetadata {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes)
            .map_err(|err| DomainError::Parse(format!("domain metadata: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_metadata_parses() {
        let body = br#"{
            "canonicalRefinement": "r3",
            "canonicalRefinementAlignmentMatrix": [
                1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                0.5, 0.0, -2.0, 1.0
            ]
        }"#;
        let meta = DomainMetadata::parse(body).unwrap();
        assert_eq!(meta.canonical_refinement.as_deref(), Some("r3"));
        let matrix = meta.canonical_refinement_alignment_matrix.unwrap();
        assert_eq!(matrix[12], 0.5);
        assert_eq!(matrix[14], -2.0);
    }

    #[test]
    fn test_empty_object_is_valid() {
        let meta = DomainMetadata::parse(b"{}").unwrap();
        assert!(meta.canonical_refinement.is_none());
        assert!(meta.canonical_refinement_alignment_matrix.is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let meta = DomainMetadata::parse(br#"{"canonicalRefinement": "r1", "extra": 7}"#).unwrap();
        assert_eq!(meta.canonical_refinement.as_deref(), Some("r1"));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = DomainMetadata::parse(b"not json").unwrap_err();
        assert!(matches!(err, DomainError::Parse(_)));
    }

    #[test]
    fn test_wrong_matrix_arity_is_a_parse_error() {
        let err =
            DomainMetadata::parse(br#"{"canonicalRefinementAlignmentMatrix": [1.0, 2.0]}"#)
                .unwrap_err();
        assert!(matches!(err, DomainError::Parse(_)));
    }
}
