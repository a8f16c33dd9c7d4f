use serde::Deserialize;

/// Success envelope wrapping every API response body.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Failure body carried on non-2xx responses.
///
/// Both fields are optional; servers emit `detail`, `message`, either, or
/// neither depending on the failing layer.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Envelope, ErrorBody};

    #[test]
    fn envelope_tolerates_missing_code_and_message() {
        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"data": [1, 2, 3]})).expect("envelope must decode");
        assert_eq!(envelope.code, None);
        assert_eq!(envelope.data, vec![1, 2, 3]);
        assert_eq!(envelope.message, None);
    }

    #[test]
    fn error_body_decodes_partial_shapes() {
        let body: ErrorBody =
            serde_json::from_value(json!({"detail": "D"})).expect("error body must decode");
        assert_eq!(body.detail.as_deref(), Some("D"));
        assert_eq!(body.message, None);
    }
}
