use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    config::Config,
    dispatcher::MessageDispatcher,
    domain::{ChannelName, InboundMessage},
    ports::{SessionEvents, SessionPort},
    title::TitleSource,
};

/// Event handler registered with the session adapter.
///
/// Joins the configured channel once connected and hands every channel
/// message to the [`MessageDispatcher`]. Other lifecycle events are only logged.
pub struct TitleBot {
    channel: ChannelName,
    session: Arc<dyn SessionPort>,
    dispatcher: MessageDispatcher,
}

impl TitleBot {
    pub fn new(cfg: &Config, session: Arc<dyn SessionPort>, titles: Arc<dyn TitleSource>) -> Self {
        Self {
            channel: cfg.channel.clone(),
            dispatcher: MessageDispatcher::new(titles, session.clone(), cfg.message_budget),
            session,
        }
    }
}

#[async_trait]
impl SessionEvents for TitleBot {
    async fn on_connected(&self) {
        info!("Connected; joining {}", self.channel);
        if let Err(e) = self.session.join(&self.channel).await {
            warn!("failed to join {}: {e}", self.channel);
        }
    }

    async fn on_disconnected(&self) {
        info!("Disconnected");
    }

    async fn on_joined(&self, channel: &str) {
        info!("Joined {channel}");
    }

    async fn on_parted(&self, channel: &str) {
        info!("Parted {channel}");
    }

    async fn on_kicked(&self, channel: &str, by: &str, reason: &str) {
        info!("Kicked from {channel} by {by}: {reason}");
    }

    async fn on_message(&self, msg: InboundMessage) {
        self.dispatcher.on_message(&msg).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ConnectionTarget,
        dispatcher::tests::{FakeSession, FakeTitles},
    };

    fn config() -> Config {
        Config::new(
            ConnectionTarget::parse("irc://bot@irc.example.net/chat").unwrap(),
            false,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn joins_configured_channel_on_connect() {
        let session = Arc::new(FakeSession::default());
        let bot = TitleBot::new(&config(), session.clone(), Arc::new(FakeTitles::default()));

        bot.on_connected().await;

        assert_eq!(*session.joins.lock().unwrap(), vec!["#chat".to_string()]);
    }

    #[tokio::test]
    async fn replies_to_channel_the_message_came_from() {
        let session = Arc::new(FakeSession::default());
        let titles = Arc::new(FakeTitles::with(&[(
            "https://example.com/page",
            Ok("Example Page".to_string()),
        )]));
        let bot = TitleBot::new(&config(), session.clone(), titles);

        bot.on_message(InboundMessage {
            channel: ChannelName::parse("#other").unwrap(),
            sender_nick: "alice".to_string(),
            text: "look at https://example.com/page".to_string(),
        })
        .await;

        assert_eq!(
            session.sent(),
            vec![("#other".to_string(), "Example Page | example.com".to_string())]
        );
    }
}
