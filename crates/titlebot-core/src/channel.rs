//! Channel name normalisation for the connection target path.

use crate::{domain::ChannelName, errors::Error, Result};

/// Turn a connection-target path into a channel name.
///
/// Strips one leading `/` and prefixes `#` unless one is already present.
/// An empty remainder yields an empty string, meaning "no channel".
pub fn normalize(path: &str) -> String {
    let name = path.strip_prefix('/').unwrap_or(path);
    if name.is_empty() {
        return String::new();
    }
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}

/// [`normalize`], treating an empty result as a configuration error.
pub fn channel_from_path(path: &str) -> Result<ChannelName> {
    let name = normalize(path);
    if name.is_empty() {
        return Err(Error::Config("missing channel in IRC URL".to_string()));
    }
    ChannelName::parse(&name)
}
