use tickoff::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let category = Error::UnknownCategory("errands".to_string());
    assert_eq!(category.exit_code(), exit_codes::USER_ERROR);

    let storage = Error::StorageUnavailable("offline".to_string());
    assert_eq!(storage.exit_code(), exit_codes::OPERATION_FAILED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::TaskNotFound("01abc".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.error.contains("Task not found"));
    assert!(json.details.is_none());

    let err = Error::AmbiguousTaskId {
        input: "01ab".to_string(),
        candidates: "01abc, 01abd".to_string(),
    };
    let json = JsonError::from(&err);
    let details = json.details.expect("details");
    assert_eq!(details["candidates"][1], "01abd");
}
