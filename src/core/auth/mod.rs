use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const DEFAULT_USERNAME: &str = "Player";

/// Account fields substituted into the launch arguments.
///
/// Only offline play is supported; the token fields carry the placeholder
/// values the game accepts without a session server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchAccountProfile {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    /// Legacy session id, unused since Yggdrasil.
    pub session: String,
    pub user_type: String,
    /// JSON object of user properties.
    pub user_properties: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME)
    }
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: "0".into(),
            session: "-".into(),
            user_type: "legacy".into(),
            user_properties: "{}".into(),
        }
    }

    /// Fill blank fields with offline defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::offline(DEFAULT_USERNAME);
        let fill = |value: &mut String, default: String| {
            if value.trim().is_empty() {
                *value = default;
            }
        };
        fill(&mut self.username, defaults.username);
        fill(&mut self.uuid, defaults.uuid);
        fill(&mut self.access_token, defaults.access_token);
        fill(&mut self.session, defaults.session);
        fill(&mut self.user_type, defaults.user_type);
        fill(&mut self.user_properties, defaults.user_properties);
        self
    }
}
