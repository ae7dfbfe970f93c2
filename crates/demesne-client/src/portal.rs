use serde::{Deserialize, Serialize};

/// One physical marker pose, exactly as the server reported it.
///
/// Poses are consumed by presentation code outside this crate, so no schema
/// is imposed beyond valid JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Portal(pub serde_json::Value);

/// Wire shape of the lighthouses listing.
#[derive(Debug, Deserialize)]
pub(crate) struct PortalListing {
    pub poses: Vec<Portal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_keeps_pose_payloads_untouched() {
        let listing: PortalListing = serde_json::from_str(
            r#"{
                "poses": [
                    {"id": "p1", "position": [0.0, 1.5, -2.0], "rotation": [0, 0, 0, 1]},
                    {"id": "p2", "anything": {"nested": true}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(listing.poses.len(), 2);
        assert_eq!(listing.poses[0].0["id"], "p1");
        assert_eq!(listing.poses[1].0["anything"]["nested"], true);
    }

    #[test]
    fn test_pose_serializes_transparently() {
        let portal = Portal(serde_json::json!({"id": "p1"}));
        assert_eq!(serde_json::to_string(&portal).unwrap(), r#"{"id":"p1"}"#);
    }

    #[test]
    fn test_empty_listing_is_valid() {
        let listing: PortalListing = serde_json::from_str(r#"{"poses": []}"#).unwrap();
        assert!(listing.poses.is_empty());
    }
}
