//! Token based identities and permission checks for requests

use crate::content::TokenGrant;
use shared::{RequestError, UserId};
use std::collections::{HashMap, HashSet};

pub const CHARACTER_JOIN: &str = "character.join";
pub const CHARACTER_MOVE: &str = "character.move";
pub const CHARACTER_ATTACK: &str = "character.attack";
pub const CHARACTER_RESPAWN: &str = "character.respawn";
pub const CHARACTER_KILL: &str = "character.kill";
pub const NPC_SPAWN_RANDOM: &str = "npc.spawnRandom";

pub const PLAYER_ROLES: &[&str] = &[
    CHARACTER_JOIN,
    CHARACTER_MOVE,
    CHARACTER_ATTACK,
    CHARACTER_RESPAWN,
];

pub const ADMIN_ROLES: &[&str] = &[
    CHARACTER_JOIN,
    CHARACTER_MOVE,
    CHARACTER_ATTACK,
    CHARACTER_RESPAWN,
    CHARACTER_KILL,
    NPC_SPAWN_RANDOM,
];

const GUEST_PREFIX: &str = "guest:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: String,
    pub roles: HashSet<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Maps bearer tokens to identities
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    grants: HashMap<String, UserIdentity>,
    allow_guests: bool,
}

impl TokenResolver {
    pub fn new(grants: &[TokenGrant], allow_guests: bool) -> Self {
        let grants = grants
            .iter()
            .map(|grant| {
                let identity = UserIdentity {
                    id: grant.user_id.clone(),
                    name: grant.name.clone(),
                    roles: grant.roles.iter().cloned().collect(),
                };
                (grant.token.clone(), identity)
            })
            .collect();
        Self {
            grants,
            allow_guests,
        }
    }

    /// Configured grants win over guest tokens
    pub fn resolve(&self, token: &str) -> Option<UserIdentity> {
        if let Some(identity) = self.grants.get(token) {
            return Some(identity.clone());
        }

        let name = token.strip_prefix(GUEST_PREFIX)?.trim();
        if !self.allow_guests || name.is_empty() {
            return None;
        }
        Some(UserIdentity::new(token, name, PLAYER_ROLES))
    }
}

/// Rejects callers without an identity or without `permission`
pub fn require<'a>(
    identity: Option<&'a UserIdentity>,
    permission: &str,
) -> Result<&'a UserIdentity, RequestError> {
    let identity = identity.ok_or(RequestError::Unauthenticated)?;
    if !identity.has_role(permission) {
        return Err(RequestError::MissingPermission(permission.to_string()));
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(allow_guests: bool) -> TokenResolver {
        TokenResolver::new(
            &[TokenGrant {
                token: "secret".to_string(),
                user_id: "root".to_string(),
                name: "Root".to_string(),
                roles: vec![CHARACTER_KILL.to_string()],
            }],
            allow_guests,
        )
    }

    #[test]
    fn test_configured_token() {
        let identity = resolver(false).resolve("secret").unwrap();
        assert_eq!(identity.id, "root");
        assert!(identity.has_role(CHARACTER_KILL));
        assert!(!identity.has_role(CHARACTER_MOVE));
    }

    #[test]
    fn test_guest_tokens() {
        let identity = resolver(true).resolve("guest:alice").unwrap();
        assert_eq!(identity.name, "alice");
        assert_eq!(identity.id, "guest:alice");
        assert!(identity.has_role(CHARACTER_MOVE));
        assert!(!identity.has_role(NPC_SPAWN_RANDOM));

        assert!(resolver(false).resolve("guest:alice").is_none());
        assert!(resolver(true).resolve("guest:").is_none());
        assert!(resolver(true).resolve("nonsense").is_none());
    }

    #[test]
    fn test_require() {
        let identity = UserIdentity::new("u", "U", PLAYER_ROLES);
        assert!(require(Some(&identity), CHARACTER_JOIN).is_ok());
        assert_eq!(
            require(Some(&identity), CHARACTER_KILL).unwrap_err(),
            RequestError::MissingPermission(CHARACTER_KILL.to_string())
        );
        assert_eq!(
            require(None, CHARACTER_JOIN).unwrap_err(),
            RequestError::Unauthenticated
        );
    }
}
