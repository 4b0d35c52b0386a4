use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};
use url::Url;

use crate::{
    deadline::Deadline,
    domain::{InboundMessage, ReplyLine},
    links,
    ports::SessionPort,
    title::TitleSource,
};

/// Turns one inbound message into zero or more title replies.
///
/// Links are resolved sequentially under a single deadline taken when the
/// message arrives. Each reply is sent as soon as its title resolves.
pub struct MessageDispatcher {
    titles: Arc<dyn TitleSource>,
    session: Arc<dyn SessionPort>,
    budget: Duration,
}

impl MessageDispatcher {
    pub fn new(
        titles: Arc<dyn TitleSource>,
        session: Arc<dyn SessionPort>,
        budget: Duration,
    ) -> Self {
        Self {
            titles,
            session,
            budget,
        }
    }

    /// Returns the number of replies sent.
    pub async fn on_message(&self, msg: &InboundMessage) -> usize {
        let deadline = Deadline::after(self.budget);
        let urls: Vec<Url> = links::extract(&msg.text).collect();
        if urls.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for url in urls {
            debug!(url = %url, remaining = ?deadline.remaining(), "resolving title");
            let title = match self.titles.resolve(&url, deadline).await {
                Ok(title) => title,
                Err(e) if e.is_routine() => {
                    debug!(url = %url, "no title: {e}");
                    continue;
                }
                Err(e) => {
                    warn!(url = %url, from = %msg.sender_nick, "title lookup failed: {e}");
                    continue;
                }
            };

            let reply = ReplyLine::for_title(msg.channel.clone(), &title, &url);
            match self.session.send(&reply.channel, &reply.text).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(channel = %reply.channel, "failed to send reply: {e}"),
            }
        }
        sent
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::ChannelName,
        title::{TitleError, TitleResult},
        Result,
    };

    #[derive(Default)]
    pub(crate) struct FakeTitles {
        pub(crate) answers: HashMap<String, TitleResult>,
        pub(crate) calls: Mutex<Vec<(String, Deadline)>>,
    }

    impl FakeTitles {
        pub(crate) fn with(answers: &[(&str, TitleResult)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(u, r)| (u.to_string(), r.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Deadline)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TitleSource for FakeTitles {
        async fn resolve(&self, url: &Url, deadline: Deadline) -> TitleResult {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), deadline));
            self.answers
                .get(url.as_str())
                .cloned()
                .unwrap_or(Err(TitleError::NoTitle))
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeSession {
        pub(crate) joins: Mutex<Vec<String>>,
        pub(crate) sends: Mutex<Vec<(String, String)>>,
    }

    impl FakeSession {
        pub(crate) fn sent(&self) -> Vec<(String, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionPort for FakeSession {
        async fn join(&self, channel: &ChannelName) -> Result<()> {
            self.joins.lock().unwrap().push(channel.to_string());
            Ok(())
        }

        async fn send(&self, channel: &ChannelName, text: &str) -> Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn disconnect(&self, _reason: &str) -> Result<()> {
            Ok(())
        }
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            channel: ChannelName::parse("#chat").unwrap(),
            sender_nick: "alice".to_string(),
            text: text.to_string(),
        }
    }

    fn dispatcher(titles: Arc<FakeTitles>, session: Arc<FakeSession>) -> MessageDispatcher {
        MessageDispatcher::new(titles, session, Duration::from_secs(15))
    }

    #[tokio::test]
    async fn single_link_produces_one_reply() {
        let titles = Arc::new(FakeTitles::with(&[(
            "https://example.com/page",
            Ok("Example Page".to_string()),
        )]));
        let session = Arc::new(FakeSession::default());

        let sent = dispatcher(titles, session.clone())
            .on_message(&msg("look at https://example.com/page"))
            .await;

        assert_eq!(sent, 1);
        assert_eq!(
            session.sent(),
            vec![("#chat".to_string(), "Example Page | example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn no_links_no_lookups() {
        let titles = Arc::new(FakeTitles::default());
        let session = Arc::new(FakeSession::default());

        let sent = dispatcher(titles.clone(), session.clone())
            .on_message(&msg("no links here"))
            .await;

        assert_eq!(sent, 0);
        assert!(titles.calls().is_empty());
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn failures_are_skipped_and_order_is_kept() {
        let titles = Arc::new(FakeTitles::with(&[
            ("https://a.example/", Ok("A".to_string())),
            ("https://b.example/", Err(TitleError::UnsupportedContentType)),
            ("https://c.example/", Err(TitleError::BadStatus(500))),
            ("https://d.example/", Err(TitleError::Network("reset".into()))),
            ("https://e.example/", Ok("E".to_string())),
        ]));
        let session = Arc::new(FakeSession::default());

        let text = "https://a.example/ https://b.example/ https://c.example/ \
                    https://d.example/ https://e.example/ https://a.example/";
        let sent = dispatcher(titles.clone(), session.clone())
            .on_message(&msg(text))
            .await;

        assert_eq!(sent, 3);
        let texts: Vec<String> = session.sent().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["A | a.example", "E | e.example", "A | a.example"]);
        assert_eq!(titles.calls().len(), 6);
    }

    #[tokio::test]
    async fn all_links_share_one_deadline() {
        let titles = Arc::new(FakeTitles::default());
        let session = Arc::new(FakeSession::default());

        dispatcher(titles.clone(), session)
            .on_message(&msg("http://one.example/ http://two.example/ http://three.example/"))
            .await;

        let calls = titles.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, d)| *d == calls[0].1));
    }
}
