//! Moderation rights of a guild member.
//!
//! A user may run admin commands when they own the guild or one of their
//! roles (including `@everyone`, whose id equals the guild id) grants
//! ADMINISTRATOR or BAN_MEMBERS. Direct messages carry no rights.

use super::{Guild, Message, fetch_guild};
use std::collections::HashMap;

pub const BAN_MEMBERS: u64 = 1 << 2;
pub const ADMINISTRATOR: u64 = 1 << 3;

pub fn can_moderate(guild: &Guild, user_id: &str, member_roles: &[String]) -> bool {
    if guild.owner_id == user_id {
        return true;
    }

    let granted = guild
        .roles
        .iter()
        .filter(|role| role.id == guild.id || member_roles.contains(&role.id))
        .map(|role| role.permissions.parse::<u64>().unwrap_or(0))
        .fold(0, |acc, bits| acc | bits);

    granted & (ADMINISTRATOR | BAN_MEMBERS) != 0
}

/// Guild owner and roles, fetched on first use and kept until a role or
/// guild update arrives over the gateway.
#[derive(Default)]
pub struct PermissionCache {
    guilds: HashMap<String, Guild>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_privileged(&mut self, client: &reqwest::Client, token: &str, msg: &Message) -> bool {
        let Some(guild_id) = msg.guild_id.as_deref() else {
            return false;
        };

        if !self.guilds.contains_key(guild_id) {
            match fetch_guild(client, token, guild_id).await {
                Ok(guild) => {
                    self.guilds.insert(guild_id.to_string(), guild);
                }
                Err(e) => {
                    tracing::error!(guild_id, error = ?e, "Failed to fetch guild roles");
                    return false;
                }
            }
        }

        let roles = msg.member.as_ref().map(|m| m.roles.as_slice()).unwrap_or_default();
        self.guilds
            .get(guild_id)
            .is_some_and(|guild| can_moderate(guild, &msg.author.id, roles))
    }

    pub fn invalidate(&mut self, guild_id: &str) {
        if self.guilds.remove(guild_id).is_some() {
            tracing::debug!(guild_id, "Dropped cached guild roles");
        }
    }

    #[cfg(test)]
    pub(crate) fn seed(&mut self, guild: Guild) {
        self.guilds.insert(guild.id.clone(), guild);
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, guild_id: &str) -> bool {
        self.guilds.contains_key(guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::{Member, Role, User};

    fn role(id: &str, bits: u64) -> Role {
        Role { id: id.into(), permissions: bits.to_string() }
    }

    fn guild(roles: Vec<Role>) -> Guild {
        Guild { id: "g".into(), owner_id: "owner".into(), roles }
    }

    fn message_from(user_id: &str, guild_id: Option<&str>) -> Message {
        Message {
            id: "1".into(),
            channel_id: "2".into(),
            guild_id: guild_id.map(str::to_string),
            author: User { id: user_id.into(), username: "someone".into(), bot: false },
            member: guild_id.map(|_| Member { roles: vec![] }),
            content: "!quippy reload".into(),
        }
    }

    #[tokio::test]
    async fn direct_messages_are_never_privileged() {
        let mut cache = PermissionCache::new();
        cache.seed(guild(vec![role("g", ADMINISTRATOR)]));
        let client = reqwest::Client::new();

        assert!(!cache.is_privileged(&client, "token", &message_from("owner", None)).await);
    }

    #[tokio::test]
    async fn cached_guild_answers_without_a_fetch() {
        let mut cache = PermissionCache::new();
        cache.seed(guild(vec![role("g", 0)]));
        let client = reqwest::Client::new();

        assert!(cache.is_privileged(&client, "token", &message_from("owner", Some("g"))).await);
        assert!(!cache.is_privileged(&client, "token", &message_from("u", Some("g"))).await);
    }

    #[test]
    fn invalidate_drops_only_that_guild() {
        let mut cache = PermissionCache::new();
        cache.seed(guild(vec![]));
        cache.seed(Guild { id: "other".into(), owner_id: "x".into(), roles: vec![] });

        cache.invalidate("g");

        assert!(!cache.is_cached("g"));
        assert!(cache.is_cached("other"));
    }

    #[test]
    fn owner_is_always_privileged() {
        assert!(can_moderate(&guild(vec![]), "owner", &[]));
    }

    #[test]
    fn ban_members_or_administrator_role_grants_rights() {
        let g = guild(vec![role("g", 0), role("mods", BAN_MEMBERS), role("admins", ADMINISTRATOR)]);

        assert!(can_moderate(&g, "u", &["mods".into()]));
        assert!(can_moderate(&g, "u", &["admins".into()]));
        assert!(!can_moderate(&g, "u", &[]));
    }

    #[test]
    fn everyone_role_applies_to_all_members() {
        let g = guild(vec![role("g", BAN_MEMBERS)]);
        assert!(can_moderate(&g, "u", &[]));
    }

    #[test]
    fn unrelated_bits_and_garbage_do_not_count() {
        let g = guild(vec![
            role("g", 0),
            role("chatty", 1 << 11),
            Role { id: "broken".into(), permissions: "lots".into() },
        ]);

        assert!(!can_moderate(&g, "u", &["chatty".into(), "broken".into()]));
    }
}
