use std::fmt;

use url::{Host, Url};

use crate::{errors::Error, Result};

/// IRC channel name. Always begins with `#`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.len() < 2 || !name.starts_with('#') {
            return Err(Error::Config(format!("invalid channel name: {name:?}")));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A chat line received in a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: ChannelName,
    pub sender_nick: String,
    pub text: String,
}

/// Longest reply text sent in one line. Long titles are shortened to fit so
/// the hostname suffix always survives.
pub const MAX_REPLY_BYTES: usize = 400;

/// A line to post back to a channel: `<title> | <hostname>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyLine {
    pub channel: ChannelName,
    pub text: String,
}

impl ReplyLine {
    pub fn for_title(channel: ChannelName, title: &str, url: &Url) -> Self {
        let suffix = format!(" | {}", bare_host(url));
        let title = truncate_to(title, MAX_REPLY_BYTES.saturating_sub(suffix.len()));
        Self {
            channel,
            text: format!("{title}{suffix}"),
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Host of `url` without IPv6 brackets (empty if the URL has no host).
pub fn bare_host(url: &Url) -> String {
    match url.host() {
        Some(Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}
