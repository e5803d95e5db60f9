//! Identifiers for stored rows and session tokens.
//!
//! Row keys are 26-character lowercase ULIDs, which fit the `varchar(32)` key
//! columns and sort by creation time. Session tokens are random and carry no
//! timestamp, so nothing about a session can be read from its token.

use ulid::Ulid;
use uuid::Uuid;

/// Issues row IDs and bearer tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// A new row key for users, novels, chapters, comments and votes.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_ascii_lowercase()
    }

    /// A new bearer token: 32 hex characters from a v4 UUID.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_ids_are_lowercase_and_ordered() {
        let ids = IdGenerator::new();
        let first = ids.generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ids.generate();

        assert_eq!(first.len(), 26);
        assert!(first.chars().all(|c| !c.is_ascii_uppercase()));
        assert!(first < second);
    }

    #[test]
    fn test_tokens_are_hex_and_unique() {
        let ids = IdGenerator::new();
        let token = ids.generate_token();

        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, ids.generate_token());
    }
}
