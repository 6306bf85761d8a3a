//! Outgoing reply texts.

const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Sent as-is to the channel the trigger came from.
    Channel(String),
    /// Sent to the channel, addressed to the invoking user.
    User { user_id: String, text: String },
}

impl Reply {
    pub fn to_user(user_id: &str, text: impl Into<String>) -> Self {
        Self::User { user_id: user_id.to_string(), text: text.into() }
    }

    pub fn render(&self) -> String {
        match self {
            Reply::Channel(text) => text.clone(),
            Reply::User { user_id, text } => format!("<@{user_id}> {text}"),
        }
    }
}

pub fn quoted(keyword: &str) -> String {
    format!("`{keyword}`")
}

pub fn keyword_list(keywords: &[&str]) -> String {
    keywords.iter().map(|k| quoted(k)).collect::<Vec<_>>().join(", ")
}

pub fn response_list(responses: &[String]) -> String {
    let mut out = String::from("```");
    for (i, response) in responses.iter().enumerate() {
        out.push_str(&format!("[{i}] {response}\n"));
    }
    out.push_str("```");
    out
}

pub fn usage(prefix: &str, privileged: bool) -> String {
    let mut out = String::from("\n```");
    out.push_str(&format!("Quippy v{BOT_VERSION}\n"));
    out.push_str("~-~-~-~-~-~-~-~\n");
    out.push_str("Programmable bot that serves canned responses!\n");
    out.push_str(
        "Once you have added a response for a keyword, you can invoke it by putting the \
         keyword in your message preceded by an exclamation mark. For example, if your \
         keyword is \"blah\", you can put \"!blah\" in your message. Note that the keyword \
         is case-sensitive.\n\n",
    );
    out.push_str(&format!("{prefix} list \u{2022} shows list of keywords\n"));
    out.push_str(&format!(
        "{prefix} list <keyword> \u{2022} shows list of responses for the keyword\n"
    ));

    if privileged {
        out.push_str("\nAdmin commands:\n");
        out.push_str(&format!(
            "{prefix} add <keyword> <item> \u{2022} adds a response for the keyword\n"
        ));
        out.push_str(&format!(
            "{prefix} remove <keyword> <id> \u{2022} removes a response associated with the keyword\n"
        ));
        out.push_str(&format!("{prefix} reload \u{2022} reloads keywords from the file system\n"));
    }
    out.push_str("```");
    out
}
