//! Minimal IRC line protocol: parsing inbound lines and formatting commands.

/// Longest text payload put in a single PRIVMSG/NOTICE, leaving room for the
/// command, target and the prefix the server prepends when relaying.
pub const MAX_TEXT_BYTES: usize = titlebot_core::domain::MAX_REPLY_BYTES;

const CTCP_DELIM: char = '\u{1}';

/// One parsed protocol line: `[@tags] [:prefix] COMMAND params... [:trailing]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Line {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags are not used.
        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1.trim_start_matches(' ');
        }

        let prefix = match rest.strip_prefix(':') {
            Some(p) => {
                let (prefix, tail) = p.split_once(' ')?;
                rest = tail.trim_start_matches(' ');
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            tail = tail.trim_start_matches(' ');
            if tail.is_empty() {
                break;
            }
            if let Some(trailing) = tail.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match tail.split_once(' ') {
                Some((param, next)) => {
                    params.push(param.to_string());
                    tail = next;
                }
                None => {
                    params.push(tail.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        prefix.split(['!', '@']).next()
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }
}

/// What the session cares about in an inbound line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Ping(String),
    Welcome,
    NickInUse,
    NickChange { from: String, to: String },
    Join { nick: String, channel: String },
    Part { nick: String, channel: String },
    Kick { channel: String, target: String, by: String, reason: String },
    Privmsg { from: String, target: String, text: String },
    Error(String),
    Other,
}

pub fn classify(line: &Line) -> Inbound {
    let nick = || line.nick().unwrap_or_default().to_string();
    let param = |idx: usize| line.param(idx).unwrap_or_default().to_string();

    match line.command.as_str() {
        "PING" => Inbound::Ping(param(0)),
        "001" => Inbound::Welcome,
        "433" => Inbound::NickInUse,
        "NICK" => Inbound::NickChange {
            from: nick(),
            to: param(0),
        },
        "JOIN" => Inbound::Join {
            nick: nick(),
            channel: param(0),
        },
        "PART" => Inbound::Part {
            nick: nick(),
            channel: param(0),
        },
        "KICK" => Inbound::Kick {
            channel: param(0),
            target: param(1),
            by: nick(),
            reason: param(2),
        },
        "PRIVMSG" if line.params.len() >= 2 => Inbound::Privmsg {
            from: nick(),
            target: param(0),
            text: param(1),
        },
        "ERROR" => Inbound::Error(param(0)),
        _ => Inbound::Other,
    }
}

/// Body of a CTCP request (`\x01VERSION\x01` -> `VERSION`), if `text` is one.
pub fn ctcp_body(text: &str) -> Option<&str> {
    let inner = text.strip_prefix(CTCP_DELIM)?;
    Some(inner.strip_suffix(CTCP_DELIM).unwrap_or(inner))
}

pub fn pass(password: &str) -> String {
    format!("PASS {password}")
}

pub fn nick(nick: &str) -> String {
    format!("NICK {nick}")
}

pub fn user(ident: &str, real_name: &str) -> String {
    format!("USER {ident} 12 * :{real_name}")
}

pub fn join(channel: &str) -> String {
    format!("JOIN {channel}")
}

pub fn pong(token: &str) -> String {
    format!("PONG :{token}")
}

pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {target} :{}", clean_text(text))
}

pub fn ctcp_reply(target: &str, command: &str, body: &str) -> String {
    let body = clean_text(&format!("{command} {body}"));
    format!("NOTICE {target} :{CTCP_DELIM}{body}{CTCP_DELIM}")
}

pub fn quit(message: &str) -> String {
    if message.is_empty() {
        "QUIT".to_string()
    } else {
        format!("QUIT :{}", clean_text(message))
    }
}

/// Keep user-controlled text on one line and within [`MAX_TEXT_BYTES`].
fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_TEXT_BYTES));
    for c in text.chars() {
        let c = if matches!(c, '\r' | '\n' | '\0') { ' ' } else { c };
        if out.len() + c.len_utf8() > MAX_TEXT_BYTES {
            break;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_params_and_trailing() {
        let line = Line::parse(":alice!a@host PRIVMSG #rust :hello there\r\n").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#rust", "hello there"]);
        assert_eq!(line.nick(), Some("alice"));
    }

    #[test]
    fn parses_without_prefix_and_with_tags() {
        let line = Line::parse("PING :irc.example.net").unwrap();
        assert_eq!(line.prefix, None);
        assert_eq!(line.params, vec!["irc.example.net"]);

        let line = Line::parse("@time=2024-01-01T00:00:00Z :srv 001 bot :Welcome").unwrap();
        assert_eq!(line.command, "001");
        assert_eq!(line.params, vec!["bot", "Welcome"]);
    }

    #[test]
    fn rejects_empty_lines() {
        assert_eq!(Line::parse(""), None);
        assert_eq!(Line::parse("\r\n"), None);
        assert_eq!(Line::parse(":prefixonly"), None);
    }

    #[test]
    fn classifies_lifecycle_lines() {
        let c = |raw: &str| classify(&Line::parse(raw).unwrap());
        assert_eq!(c("PING :abc"), Inbound::Ping("abc".into()));
        assert_eq!(c(":srv 001 bot :Welcome"), Inbound::Welcome);
        assert_eq!(c(":srv 433 * bot :Nickname is already in use"), Inbound::NickInUse);
        assert_eq!(
            c(":bot!b@h JOIN :#rust"),
            Inbound::Join {
                nick: "bot".into(),
                channel: "#rust".into()
            }
        );
        assert_eq!(
            c(":op!o@h KICK #rust bot :spam"),
            Inbound::Kick {
                channel: "#rust".into(),
                target: "bot".into(),
                by: "op".into(),
                reason: "spam".into()
            }
        );
        assert_eq!(c(":srv PRIVMSG"), Inbound::Other);
    }

    #[test]
    fn ctcp_detection() {
        assert_eq!(ctcp_body("\u{1}VERSION\u{1}"), Some("VERSION"));
        assert_eq!(ctcp_body("\u{1}ACTION waves"), Some("ACTION waves"));
        assert_eq!(ctcp_body("plain text"), None);
    }

    #[test]
    fn outgoing_text_stays_on_one_line() {
        assert_eq!(
            privmsg("#c", "Title\r\nQUIT :pwned | example.com"),
            "PRIVMSG #c :Title  QUIT :pwned | example.com"
        );
        let long = "é".repeat(MAX_TEXT_BYTES);
        let line = privmsg("#c", &long);
        assert!(line.len() <= "PRIVMSG #c :".len() + MAX_TEXT_BYTES);
    }

    #[test]
    fn long_title_reply_keeps_hostname() {
        use titlebot_core::domain::{ChannelName, ReplyLine};

        let url = url::Url::parse("https://example.com/article").unwrap();
        let reply = ReplyLine::for_title(
            ChannelName::parse("#c").unwrap(),
            &"T".repeat(420),
            &url,
        );
        let line = privmsg(reply.channel.as_str(), &reply.text);
        assert!(line.starts_with("PRIVMSG #c :TTT"));
        assert!(line.ends_with(" | example.com"), "{line}");
    }

    #[test]
    fn formats_commands() {
        assert_eq!(user("titlebot", "TitleBot"), "USER titlebot 12 * :TitleBot");
        assert_eq!(quit(""), "QUIT");
        assert_eq!(quit("bye"), "QUIT :bye");
        assert_eq!(
            ctcp_reply("alice", "VERSION", "TitleBot/1"),
            "NOTICE alice :\u{1}VERSION TitleBot/1\u{1}"
        );
    }
}
