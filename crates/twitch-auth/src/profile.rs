//! The signed-in user's profile and its JSON decoder.
//!
//! The Kraken `/user` endpoint returns a flat object of string fields. Not
//! every account populates every field (`bio` and `email` in particular),
//! so each field defaults to an empty string and a partially populated
//! object is a valid profile.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, TwitchAuthError};

/// The signed-in Twitch user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Opaque user identifier.
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    pub id: String,

    /// Avatar URL.
    #[serde(deserialize_with = "lenient_string")]
    pub logo: String,

    /// Display name, with the user's chosen capitalisation.
    #[serde(deserialize_with = "lenient_string")]
    pub display_name: String,

    /// Login name.
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,

    /// Biography, empty when the user has none.
    #[serde(deserialize_with = "lenient_string")]
    pub bio: String,

    /// Email address, empty unless the token carries the `user_read` scope.
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
}

impl UserProfile {
    /// Returns `true` if no field has been populated.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Decode a `/user` response body into a [`UserProfile`].
///
/// Keys missing from the object leave the matching field empty; unknown keys
/// are ignored.
///
/// # Errors
///
/// Returns [`crate::TwitchAuthError::Decode`] if `json` is not valid JSON or
/// is not an object.
pub fn decode_user_profile(json: &str) -> Result<UserProfile> {
    let value: Value = serde_json::from_str(json)?;
    // A derived struct would also accept a positional array.
    if !value.is_object() {
        return Err(TwitchAuthError::Decode(serde::de::Error::custom(
            "expected a JSON object",
        )));
    }
    let profile: UserProfile = serde_json::from_value(value)?;
    Ok(profile)
}

/// Render a scalar as text. Arrays, objects and `null` become empty.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_field() {
        let profile = decode_user_profile(r#"{"display_name":"foo"}"#).unwrap();
        assert_eq!(profile.display_name, "foo");
        assert!(profile.id.is_empty());
        assert!(profile.logo.is_empty());
        assert!(profile.name.is_empty());
        assert!(profile.bio.is_empty());
        assert!(profile.email.is_empty());
    }

    #[test]
    fn decode_empty_object() {
        let profile = decode_user_profile("{}").unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn decode_full_kraken_payload() {
        let json = r#"{
            "_id": "44322889",
            "bio": "Just a gamer playing games and chatting.",
            "created_at": "2013-06-03T19:12:02.580593Z",
            "display_name": "dallas",
            "email": "email-address@provider.com",
            "email_verified": true,
            "logo": "https://static-cdn.jtvnw.net/jtv_user_pictures/dallas.png",
            "name": "dallas",
            "partnered": false,
            "type": "staff"
        }"#;

        let profile = decode_user_profile(json).unwrap();
        assert_eq!(profile.id, "44322889");
        assert_eq!(profile.display_name, "dallas");
        assert_eq!(profile.name, "dallas");
        assert_eq!(profile.email, "email-address@provider.com");
        assert_eq!(
            profile.logo,
            "https://static-cdn.jtvnw.net/jtv_user_pictures/dallas.png"
        );
        assert_eq!(profile.bio, "Just a gamer playing games and chatting.");
    }

    #[test]
    fn decode_null_bio_is_empty() {
        let profile = decode_user_profile(r#"{"name":"bob","bio":null}"#).unwrap();
        assert_eq!(profile.name, "bob");
        assert_eq!(profile.bio, "");
    }

    #[test]
    fn decode_numeric_id() {
        let profile = decode_user_profile(r#"{"_id":12345}"#).unwrap();
        assert_eq!(profile.id, "12345");
    }

    #[test]
    fn decode_boolean_as_text() {
        let profile = decode_user_profile(r#"{"name":"bob","bio":true,"email":false}"#).unwrap();
        assert_eq!(profile.name, "bob");
        assert_eq!(profile.bio, "true");
        assert_eq!(profile.email, "false");
    }

    #[test]
    fn decode_nested_values_as_empty() {
        let profile =
            decode_user_profile(r#"{"name":"bob","logo":{"url":"x"},"bio":["a","b"]}"#).unwrap();
        assert_eq!(profile.name, "bob");
        assert_eq!(profile.logo, "");
        assert_eq!(profile.bio, "");
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode_user_profile("not json at all").unwrap_err();
        assert!(matches!(err, TwitchAuthError::Decode(_)));
    }

    #[test]
    fn decode_rejects_non_object() {
        assert!(decode_user_profile(r#"["_id","1"]"#).is_err());
        assert!(decode_user_profile("42").is_err());
    }

    #[test]
    fn serializes_id_as_underscore_id() {
        let profile = UserProfile {
            id: "1".to_string(),
            ..UserProfile::default()
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["_id"], "1");
        assert!(value.get("id").is_none());
    }
}
