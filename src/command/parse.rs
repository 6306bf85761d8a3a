/// An admin command, parsed from the text after `<prefix> `.
///
/// Missing arguments are kept as `None` so the router can answer with the
/// matching "please specify" message.
#[derive(Debug, PartialEq, Eq)]
pub enum AdminCommand<'a> {
    List { keyword: Option<&'a str> },
    Add { keyword: Option<&'a str>, item: Option<String> },
    Remove { keyword: Option<&'a str>, id: Option<&'a str> },
    Reload,
    Usage,
}

impl AdminCommand<'_> {
    pub fn requires_privilege(&self) -> bool {
        matches!(self, Self::Add { .. } | Self::Remove { .. } | Self::Reload)
    }
}

/// Extracts the command text from a message that starts with `prefix`.
///
/// Returns `None` when nothing but blanks follows `prefix + " "`, or when the
/// prefix is not followed by a space at all.
pub fn strip_admin_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(prefix)?.strip_prefix(' ')?;
    (!rest.trim().is_empty()).then_some(rest)
}

pub fn parse_admin(rest: &str) -> AdminCommand<'_> {
    let mut parts = rest.split_whitespace();

    match parts.next() {
        Some("list") => AdminCommand::List { keyword: parts.next() },
        Some("add") => {
            let keyword = parts.next();
            let item = parts.collect::<Vec<_>>().join(" ");
            AdminCommand::Add { keyword, item: (!item.is_empty()).then_some(item) }
        }
        Some("remove") => AdminCommand::Remove { keyword: parts.next(), id: parts.next() },
        Some("reload") => AdminCommand::Reload,
        _ => AdminCommand::Usage,
    }
}
