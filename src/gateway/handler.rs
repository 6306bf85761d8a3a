use crate::command::{CommandRouter, Inbound};
use crate::discord::permissions::PermissionCache;
use crate::discord::{self, Message, Ready};
use crate::keyword_store::KeywordStore;
use crate::state::Session;
use anyhow::{Context, Result};
use serde_json::Value;

/// Owns the bot state for the lifetime of the process and handles gateway
/// dispatch events one at a time.
pub struct Dispatcher {
    client: reqwest::Client,
    token: String,
    router: CommandRouter,
    store: KeywordStore,
    session: Session,
    permissions: PermissionCache,
    bot_user_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        client: reqwest::Client,
        token: impl Into<String>,
        router: CommandRouter,
        store: KeywordStore,
        session: Session,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            router,
            store,
            session,
            permissions: PermissionCache::new(),
            bot_user_id: None,
        }
    }

    pub(super) async fn handle_dispatch(&mut self, event: &str, data: Value) -> Result<()> {
        match event {
            "READY" => {
                let ready: Ready =
                    serde_json::from_value(data).context("Failed to parse READY payload")?;
                tracing::info!(
                    "Quippy logged in as {} with user ID {}",
                    ready.user.username,
                    ready.user.id
                );
                self.bot_user_id = Some(ready.user.id);
            }
            "MESSAGE_CREATE" => {
                let msg: Message =
                    serde_json::from_value(data).context("Failed to parse MESSAGE_CREATE payload")?;
                self.handle_message(msg).await?;
            }
            "GUILD_ROLE_CREATE" | "GUILD_ROLE_UPDATE" | "GUILD_ROLE_DELETE" => {
                if let Some(guild_id) = data.get("guild_id").and_then(Value::as_str) {
                    self.permissions.invalidate(guild_id);
                }
            }
            "GUILD_UPDATE" => {
                if let Some(guild_id) = data.get("id").and_then(Value::as_str) {
                    self.permissions.invalidate(guild_id);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_message(&mut self, msg: Message) -> Result<()> {
        // no replies to ourselves or to other bots
        if msg.author.bot || self.bot_user_id.as_deref() == Some(msg.author.id.as_str()) {
            return Ok(());
        }

        tracing::info!(
            user = %msg.author.username,
            user_id = %msg.author.id,
            channel_id = %msg.channel_id,
            message_id = %msg.id,
            "{}",
            msg.content
        );

        let privileged = if self.router.wants_admin(&msg.content) {
            self.permissions.is_privileged(&self.client, &self.token, &msg).await
        } else {
            false
        };

        let inbound = Inbound { user_id: &msg.author.id, text: &msg.content, privileged };
        let Some(reply) = self.router.route(&mut self.store, &mut self.session, &inbound).await
        else {
            return Ok(());
        };

        discord::post_message(&self.client, &self.token, &msg.channel_id, &reply.render())
            .await
            .with_context(|| format!("Failed to reply in channel {}", msg.channel_id))
    }
}
