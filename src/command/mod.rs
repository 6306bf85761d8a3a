//! Routes inbound text to a keyword response or an admin command.
//!
//! Keyword triggers always win: a message is only treated as an admin command
//! when no keyword matched it.

mod parse;
mod reply;

pub use reply::Reply;

use crate::keyword_store::{AddOutcome, KeywordStore, Persisted, RemoveOutcome, StoreError};
use crate::state::Session;
use parse::{AdminCommand, parse_admin, strip_admin_prefix};
use rand::Rng;

/// One inbound chat message, as seen by the router.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    /// Whether the platform grants the author moderation rights.
    pub privileged: bool,
}

pub struct CommandRouter {
    admin_keyword: String,
}

impl CommandRouter {
    pub fn new(admin_keyword: impl Into<String>) -> Self {
        Self { admin_keyword: admin_keyword.into() }
    }

    /// True when `text` could reach the admin path, i.e. privilege matters.
    pub fn wants_admin(&self, text: &str) -> bool {
        text.trim().starts_with(&self.admin_keyword)
    }

    pub async fn route<R: Rng>(
        &self,
        store: &mut KeywordStore,
        session: &mut Session<R>,
        msg: &Inbound<'_>,
    ) -> Option<Reply> {
        let text = msg.text.trim();

        if let Some((keyword, responses)) = store.find_trigger(text) {
            let picked = session.serve(msg.user_id, responses)?;
            tracing::debug!(keyword, user_id = msg.user_id, "Serving canned response");
            return Some(Reply::Channel(picked.to_string()));
        }

        if !text.starts_with(&self.admin_keyword) {
            return None;
        }

        let answer = match strip_admin_prefix(text, &self.admin_keyword) {
            Some(rest) => self.run_admin(store, msg, parse_admin(rest)).await,
            None => reply::usage(&self.admin_keyword, msg.privileged),
        };
        Some(Reply::to_user(msg.user_id, answer))
    }

    async fn run_admin(
        &self,
        store: &mut KeywordStore,
        msg: &Inbound<'_>,
        cmd: AdminCommand<'_>,
    ) -> String {
        if cmd.requires_privilege() && !msg.privileged {
            tracing::warn!(user_id = msg.user_id, ?cmd, "Rejected admin command from unprivileged user");
            return "no permission to run this command.".into();
        }

        match cmd {
            AdminCommand::List { keyword: None } => {
                format!("available keywords: {}", keyword_summary(store))
            }
            AdminCommand::List { keyword: Some(keyword) } => match store.list_responses(keyword) {
                Ok(responses) => reply::response_list(responses),
                Err(_) => format!("keyword {} does not exist.", reply::quoted(keyword)),
            },
            AdminCommand::Add { keyword: None, .. } => "please specify a keyword.".into(),
            AdminCommand::Add { item: None, .. } => "please specify an item to add.".into(),
            AdminCommand::Add { keyword: Some(keyword), item: Some(item) } => {
                add_item(store, keyword, &item).await
            }
            AdminCommand::Remove { keyword: None, .. } => "please specify a keyword.".into(),
            AdminCommand::Remove { id: None, .. } => {
                "please specify the ID of the item to remove.".into()
            }
            AdminCommand::Remove { keyword: Some(keyword), id: Some(id) } => {
                remove_item(store, keyword, id).await
            }
            AdminCommand::Reload => match store.reload().await {
                Ok(()) => format!("loaded keywords: {}", keyword_summary(store)),
                Err(e) => {
                    tracing::error!(error = %e, "Reload failed");
                    format!("reload failed: {e}.")
                }
            },
            AdminCommand::Usage => reply::usage(&self.admin_keyword, msg.privileged),
        }
    }
}

fn keyword_summary(store: &KeywordStore) -> String {
    let keywords = store.list_keywords();
    if keywords.is_empty() {
        return "(none)".into();
    }
    reply::keyword_list(&keywords)
}

async fn add_item(store: &mut KeywordStore, keyword: &str, item: &str) -> String {
    match store.add(keyword, item).await {
        Ok(Persisted { outcome, write_error }) => {
            let text = match outcome {
                AddOutcome::Created => {
                    format!("created new keyword {} and added item.", reply::quoted(keyword))
                }
                AddOutcome::Appended => "added item.".into(),
            };
            with_write_warning(text, write_error)
        }
        Err(StoreError::Duplicate) => "already in the list.".into(),
        Err(e @ (StoreError::InvalidKeyword(_) | StoreError::InvalidItem)) => format!("{e}."),
        Err(e) => {
            tracing::error!(error = %e, keyword, "Failed to add item");
            format!("could not add item: {e}.")
        }
    }
}

async fn remove_item(store: &mut KeywordStore, keyword: &str, id: &str) -> String {
    let Ok(id) = id.parse::<usize>() else {
        return "please specify a valid ID.".into();
    };

    match store.remove(keyword, id).await {
        Ok(Persisted { outcome, write_error }) => {
            let text = match outcome {
                RemoveOutcome::RemovedKeyword => {
                    format!("removed last item and keyword {}.", reply::quoted(keyword))
                }
                RemoveOutcome::RemovedItem => format!("removed item {id}."),
            };
            with_write_warning(text, write_error)
        }
        Err(StoreError::InvalidId(_)) => "please specify a valid ID.".into(),
        Err(StoreError::UnknownKeyword(_)) => {
            format!("keyword {} does not exist.", reply::quoted(keyword))
        }
        Err(e) => {
            tracing::error!(error = %e, keyword, "Failed to remove item");
            format!("could not remove item: {e}.")
        }
    }
}

fn with_write_warning(text: String, write_error: Option<StoreError>) -> String {
    match write_error {
        None => text,
        Some(_) => format!("{text} (warning: could not save to disk, the change is lost on reload.)"),
    }
}
