use iso8601_timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// Bearer credential issued by the auth service
///
/// Opaque to us apart from its expiry instant.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct AccessToken {
    pub access_token: String,
    #[cfg_attr(feature = "utoipa", schema(value_type = String, format = DateTime))]
    pub access_token_expires_at: Timestamp,
}

impl AccessToken {
    /// Whether this token may no longer be presented upstream
    pub fn is_expired(&self) -> bool {
        self.access_token_expires_at <= Timestamp::now_utc()
    }
}

#[cfg(test)]
mod tests {
    use iso8601_timestamp::{Duration, Timestamp};

    use super::AccessToken;

    #[test]
    fn expiry_check() {
        let valid = AccessToken {
            access_token: "secret".to_string(),
            access_token_expires_at: Timestamp::now_utc() + Duration::hours(1),
        };
        assert!(!valid.is_expired());

        let expired = AccessToken {
            access_token: "secret".to_string(),
            access_token_expires_at: Timestamp::UNIX_EPOCH,
        };
        assert!(expired.is_expired());
    }

    #[test]
    fn deserializes_provider_response() {
        let token: AccessToken = serde_json::from_str(
            r#"{"accessToken":"abc","accessTokenExpiresAt":"2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(!token.is_expired());
    }
}
