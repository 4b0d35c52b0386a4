use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use titlebot_core::{
    config::{Config, ConnectionTarget, IrcIdentity},
    domain::{ChannelName, InboundMessage},
    errors::Error,
    ports::{SessionEvents, SessionPort},
    Result,
};

use crate::{
    proto::{self, Inbound, Line},
    transport,
};

/// What the adapter needs from the bot configuration.
#[derive(Clone, Debug)]
pub struct IrcSettings {
    pub target: ConnectionTarget,
    pub identity: IrcIdentity,
    pub insecure_skip_verify: bool,
}

impl From<&Config> for IrcSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            target: cfg.target.clone(),
            identity: cfg.identity.clone(),
            insecure_skip_verify: cfg.insecure_skip_verify,
        }
    }
}

/// One IRC connection.
///
/// Outgoing lines are queued and written by a dedicated task, so `SessionPort`
/// calls never block on the socket. Channel messages are delivered to the
/// handler by a single worker, one at a time and in arrival order, while the
/// reader keeps answering PINGs.
pub struct IrcSession {
    settings: IrcSettings,
    outbound: UnboundedSender<String>,
    outbound_rx: Mutex<Option<UnboundedReceiver<String>>>,
    connected: AtomicBool,
    me: Mutex<String>,
}

impl IrcSession {
    pub fn new(settings: IrcSettings) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let me = settings.identity.nick.clone();
        Self {
            settings,
            outbound,
            outbound_rx: Mutex::new(Some(rx)),
            connected: AtomicBool::new(false),
            me: Mutex::new(me),
        }
    }

    /// Connect, register and process the connection until the server closes it.
    ///
    /// Cancelling `shutdown` sends QUIT when registered, or returns at once otherwise.
    pub async fn run(
        &self,
        events: Arc<dyn SessionEvents>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .map_err(|_| Error::External("irc session state poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::External("irc session already ran".to_string()))?;

        let server = self.settings.target.server();
        let stream = transport::connect(&self.settings.target, self.settings.insecure_skip_verify)
            .await?;
        debug!("tcp connection to {server} established");

        let (reader, writer) = tokio::io::split(stream);
        let writer_task = tokio::spawn(write_lines(writer, outbound_rx));

        let (messages, inbox) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver_messages(events.clone(), inbox));

        let result = match self.register() {
            Ok(()) => self.read_loop(reader, &events, &messages, &shutdown).await,
            Err(e) => Err(e),
        };

        self.connected.store(false, Ordering::SeqCst);
        drop(messages);
        worker.abort();
        writer_task.abort();
        info!("Disconnected from {server}");
        events.on_disconnected().await;

        result
    }

    fn register(&self) -> Result<()> {
        let id = &self.settings.identity;
        if let Some(pw) = &self.settings.target.password {
            self.queue(proto::pass(pw))?;
        }
        self.queue(proto::nick(&self.my_nick()))?;
        self.queue(proto::user(&id.ident, &id.real_name))
    }

    async fn read_loop<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        events: &Arc<dyn SessionEvents>,
        messages: &UnboundedSender<InboundMessage>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut quitting = false;

        loop {
            tokio::select! {
                _ = shutdown.cancelled(), if !quitting => {
                    info!("Received signal to shut down");
                    if !self.is_connected() {
                        return Ok(());
                    }
                    quitting = true;
                    self.disconnect(&self.settings.identity.quit_message).await?;
                }
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        return Ok(());
                    }
                    let raw = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    if let Some(line) = Line::parse(&raw) {
                        self.handle_line(&line, events, messages).await?;
                    }
                }
            }
        }
    }

    async fn handle_line(
        &self,
        line: &Line,
        events: &Arc<dyn SessionEvents>,
        messages: &UnboundedSender<InboundMessage>,
    ) -> Result<()> {
        match proto::classify(line) {
            Inbound::Ping(token) => self.queue(proto::pong(&token))?,
            Inbound::Welcome => {
                self.connected.store(true, Ordering::SeqCst);
                info!("Connected to {}", self.settings.target.server());
                events.on_connected().await;
            }
            Inbound::NickInUse if !self.is_connected() => {
                let next = format!("{}_", self.my_nick());
                warn!("nick in use, retrying as {next}");
                self.set_nick(&next);
                self.queue(proto::nick(&next))?;
            }
            Inbound::NickChange { from, to } if self.is_me(&from) => self.set_nick(&to),
            Inbound::Join { nick, channel } if self.is_me(&nick) => {
                events.on_joined(&channel).await
            }
            Inbound::Part { nick, channel } if self.is_me(&nick) => {
                events.on_parted(&channel).await
            }
            Inbound::Kick {
                channel,
                target,
                by,
                reason,
            } if self.is_me(&target) => events.on_kicked(&channel, &by, &reason).await,
            Inbound::Privmsg { from, target, text } => {
                if let Some(request) = proto::ctcp_body(&text) {
                    if request.eq_ignore_ascii_case("VERSION") {
                        self.queue(proto::ctcp_reply(
                            &from,
                            "VERSION",
                            &self.settings.identity.version,
                        ))?;
                    }
                    return Ok(());
                }
                match ChannelName::parse(&target) {
                    Ok(channel) => {
                        let msg = InboundMessage {
                            channel,
                            sender_nick: from,
                            text,
                        };
                        if messages.send(msg).is_err() {
                            warn!("message worker stopped; dropping message");
                        }
                    }
                    Err(_) => debug!(
                        "not answering private message from {from}: titles are only posted to channels"
                    ),
                }
            }
            Inbound::Error(reason) => warn!("server error: {reason}"),
            _ => {}
        }
        Ok(())
    }

    fn queue(&self, line: String) -> Result<()> {
        self.outbound
            .send(line)
            .map_err(|_| Error::External("irc connection is closed".to_string()))
    }

    fn my_nick(&self) -> String {
        self.me
            .lock()
            .map(|n| n.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    fn set_nick(&self, nick: &str) {
        match self.me.lock() {
            Ok(mut n) => *n = nick.to_string(),
            Err(p) => *p.into_inner() = nick.to_string(),
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.my_nick())
    }
}

#[async_trait]
impl SessionPort for IrcSession {
    async fn join(&self, channel: &ChannelName) -> Result<()> {
        self.queue(proto::join(channel.as_str()))
    }

    async fn send(&self, channel: &ChannelName, text: &str) -> Result<()> {
        self.queue(proto::privmsg(channel.as_str(), text))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self, reason: &str) -> Result<()> {
        self.queue(proto::quit(reason))
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut lines: UnboundedReceiver<String>,
) -> std::io::Result<()> {
    while let Some(line) = lines.recv().await {
        if line.starts_with("PASS ") {
            debug!("-> PASS ****");
        } else {
            debug!("-> {line}");
        }
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn deliver_messages(
    events: Arc<dyn SessionEvents>,
    mut inbox: UnboundedReceiver<InboundMessage>,
) {
    while let Some(msg) = inbox.recv().await {
        events.on_message(msg).await;
    }
}
