use desk_blob::BlobError;
use desk_core::DeskError;
use serde_json::json;

/// Client-facing form of a storage failure. `data.reason` names the
/// taxonomy entry so clients need not parse messages.
pub fn blob_error(err: BlobError) -> anyhow::Error {
    let (desk, reason) = match &err {
        BlobError::EmptyPayload => (DeskError::bad_request(err.to_string()), "EmptyPayload"),
        BlobError::NotFound { .. } => (DeskError::not_found(err.to_string()), "NotFound"),
        BlobError::TooLarge { .. } => (DeskError::payload_too_large(err.to_string()), "TooLarge"),
        BlobError::StoreRead { .. } => (DeskError::general_error(err.to_string()), "StoreRead"),
        BlobError::StoreWrite { .. } => (DeskError::general_error(err.to_string()), "StoreWrite"),
        BlobError::Metadata { .. } => (DeskError::general_error(err.to_string()), "Metadata"),
    };
    desk.with_data(json!({ "reason": reason })).into_anyhow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::ErrorKind;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        let cases = [
            (BlobError::EmptyPayload, ErrorKind::BadRequest, "EmptyPayload"),
            (BlobError::not_found("x.png"), ErrorKind::NotFound, "NotFound"),
            (
                BlobError::store_read(std::io::Error::other("denied")),
                ErrorKind::GeneralError,
                "StoreRead",
            ),
            (
                BlobError::TooLarge { size: 10, limit: 5 },
                ErrorKind::PayloadTooLarge,
                "TooLarge",
            ),
        ];

        for (err, kind, reason) in cases {
            let desk = DeskError::normalize(blob_error(err));
            assert_eq!(desk.kind, kind);
            assert_eq!(desk.to_json()["data"]["reason"], reason);
        }
    }

    #[test]
    fn store_read_message_is_kept() {
        let desk = DeskError::normalize(blob_error(BlobError::store_read(std::io::Error::other(
            "denied",
        ))));
        assert!(desk.message.starts_with("Unable to scan uploads directory"));
    }
}
