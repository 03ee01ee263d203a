use serde::{Deserialize, Serialize};

/// Guild the identity belongs to and where the bot is also present
///
/// Immutable once fetched, a successful refresh supersedes the
/// whole set rather than merging into it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Guild {
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Icon hash, if one is set
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Guild;

    #[test]
    fn deserializes_with_unknown_fields() {
        // Upstream sends more fields than we care about
        let guild: Guild = serde_json::from_str(
            r#"{"id":"1","name":"lounge","icon":null,"owner":true,"permissions":"2147483647"}"#,
        )
        .unwrap();

        assert_eq!(guild.id, "1");
        assert_eq!(guild.name, "lounge");
        assert_eq!(guild.icon, None);
    }
}
