//! Room keys
//!
//! A room is a named interest group; the key is a pure identifier, not an
//! owned resource. Rooms come into existence on first join and disappear when
//! their last member leaves.

/// Tagged identifier for an interest group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// A single user's personal room (joined by default)
    User(String),
    /// Subscribers of one device
    Device(String),
    /// Everyone holding a role (joined by default)
    Role(String),
    /// Members of an organization
    Organization(String),
    /// Ad hoc room (chat, support)
    Custom(String),
}

impl RoomKey {
    /// Parse the wire form (`user:<id>`, `device:<id>`, `role:<name>`,
    /// `org:<id>`); anything else is a custom room name.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some(("user", id)) => RoomKey::User(id.to_string()),
            Some(("device", id)) => RoomKey::Device(id.to_string()),
            Some(("role", name)) => RoomKey::Role(name.to_string()),
            Some(("org", id)) => RoomKey::Organization(id.to_string()),
            _ => RoomKey::Custom(s.to_string()),
        }
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomKey::User(id) => write!(f, "user:{id}"),
            RoomKey::Device(id) => write!(f, "device:{id}"),
            RoomKey::Role(name) => write!(f, "role:{name}"),
            RoomKey::Organization(id) => write!(f, "org:{id}"),
            RoomKey::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for key in [
            RoomKey::User("u1".to_string()),
            RoomKey::Device("d1".to_string()),
            RoomKey::Role("admin".to_string()),
            RoomKey::Organization("o1".to_string()),
            RoomKey::Custom("support-42".to_string()),
        ] {
            assert_eq!(RoomKey::parse(&key.to_string()), key);
        }
    }

    #[test]
    fn test_unknown_prefix_is_custom() {
        assert_eq!(
            RoomKey::parse("fleet:west"),
            RoomKey::Custom("fleet:west".to_string())
        );
    }
}
