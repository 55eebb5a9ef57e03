//! Response envelope shared by the API surface and the communication cache.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of a request.
///
/// Serialized as its integer code so existing web clients keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Error,
    Success,
    ActionRequired,
}

impl ResultType {
    pub fn code(&self) -> u8 {
        match self {
            ResultType::Error => 0,
            ResultType::Success => 1,
            ResultType::ActionRequired => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ResultType::Error),
            1 => Some(ResultType::Success),
            2 => Some(ResultType::ActionRequired),
            _ => None,
        }
    }
}

impl Serialize for ResultType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ResultType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        ResultType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown result type {code}")))
    }
}

/// Error details attached to a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResultError {
    pub result_message: String,
    pub error_code: String,
}

/// Result envelope with an optional payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct RequestResult<T> {
    #[serde(default)]
    pub resource_payload: Option<T>,

    pub result_status: ResultType,

    #[serde(default)]
    pub result_error: Option<RequestResultError>,

    #[serde(default)]
    pub total_result_count: Option<i32>,

    #[serde(default)]
    pub page_index: Option<i32>,

    #[serde(default)]
    pub page_size: Option<i32>,
}

impl<T> RequestResult<T> {
    /// Successful result carrying `payload` (which may be absent).
    pub fn success(payload: Option<T>, total_result_count: i32) -> Self {
        Self {
            resource_payload: payload,
            result_status: ResultType::Success,
            result_error: None,
            total_result_count: Some(total_result_count),
            page_index: None,
            page_size: None,
        }
    }

    /// Successful result with nothing in it.
    pub fn empty() -> Self {
        Self::success(None, 0)
    }

    /// Failed result with a translated error code.
    pub fn error(message: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self {
            resource_payload: None,
            result_status: ResultType::Error,
            result_error: Some(RequestResultError {
                result_message: message.into(),
                error_code: error_code.into(),
            }),
            total_result_count: None,
            page_index: None,
            page_size: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_status == ResultType::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_serializes_as_integer() {
        let result: RequestResult<String> = RequestResult::success(Some("x".into()), 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["resultStatus"], 1);
        assert_eq!(json["resourcePayload"], "x");
        assert_eq!(json["totalResultCount"], 1);

        let err: RequestResult<String> = RequestResult::error("boom", "GatewayApiServer-CI-DB");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["resultStatus"], 0);
        assert_eq!(json["resultError"]["errorCode"], "GatewayApiServer-CI-DB");
        assert_eq!(json["resultError"]["resultMessage"], "boom");
    }

    #[test]
    fn test_result_type_rejects_unknown_code() {
        let parsed = serde_json::from_str::<ResultType>("7");
        assert!(parsed.is_err());
        assert_eq!(serde_json::from_str::<ResultType>("2").unwrap(), ResultType::ActionRequired);
    }

    #[test]
    fn test_empty_result() {
        let result: RequestResult<u32> = RequestResult::empty();
        assert!(result.is_success());
        assert_eq!(result.resource_payload, None);
        assert_eq!(result.total_result_count, Some(0));
    }
}
