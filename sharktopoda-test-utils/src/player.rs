//! Mock Sharktopoda player for testing
//!
//! [`MockPlayer`] listens on a loopback UDP port and answers commands the way
//! the real player does: one acknowledgement per command, followed by
//! `open done` or `frame capture done` for the two-phase commands. Replies can
//! be scripted per message kind to fail, stay silent or carry a payload.

use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use sharktopoda_client_core::MessageKind;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// Scripted replies, keyed by the command's message kind
#[derive(Debug, Default)]
struct Script {
    silent: HashSet<MessageKind>,
    /// Number of commands of a kind to ignore before answering
    drop_first: HashMap<MessageKind, usize>,
    failures: HashMap<MessageKind, String>,
    payloads: HashMap<MessageKind, Map<String, Value>>,
    delays: HashMap<MessageKind, Duration>,
    without_completion: bool,
    capture_elapsed_millis: u64,
}

#[derive(Debug, Default)]
struct Recorded {
    commands: Vec<Value>,
    responses: Vec<Value>,
    client: Option<SocketAddr>,
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<Script>,
    recorded: Mutex<Recorded>,
}

/// Stand-in for the Sharktopoda player
///
/// # Examples
///
/// ```rust,no_run
/// use sharktopoda_test_utils::MockPlayer;
/// use sharktopoda_client_core::{ClientConfig, MessageKind, SharktopodaClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let player = MockPlayer::start().await?;
/// player.fail(MessageKind::Show, "no such video");
///
/// let client = SharktopodaClient::new(player.client_config()).await?;
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
pub struct MockPlayer {
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockPlayer {
    /// Bind an ephemeral loopback port and start answering
    pub async fn start() -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?);
        let addr = socket.local_addr()?;
        let shared = Arc::new(Shared::default());
        shared.script.lock().capture_elapsed_millis = 1_000;

        let task = tokio::spawn(serve(socket.clone(), shared.clone()));
        debug!("Mock player listening on {addr}");

        Ok(Self {
            socket,
            addr,
            shared,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Test client configuration pointing at this player
    pub fn client_config(&self) -> sharktopoda_client_core::ClientConfig {
        sharktopoda_client_core::ClientConfig {
            player_host: self.addr.ip().to_string(),
            player_port: self.addr.port(),
            ..sharktopoda_client_core::ClientConfig::test()
        }
    }

    /// Never answer commands of `kind`
    pub fn silence(&self, kind: MessageKind) {
        self.shared.script.lock().silent.insert(kind);
    }

    /// Ignore the first `count` commands of `kind`, then answer normally
    pub fn drop_first(&self, kind: MessageKind, count: usize) {
        self.shared.script.lock().drop_first.insert(kind, count);
    }

    /// Answer `kind` with a failed status and `cause`
    pub fn fail(&self, kind: MessageKind, cause: impl Into<String>) {
        self.shared.script.lock().failures.insert(kind, cause.into());
    }

    /// Add a field to every successful answer for `kind`
    ///
    /// For `open done` and `frame capture done` the field overrides what the
    /// completion would otherwise echo from the command.
    pub fn reply_with(&self, kind: MessageKind, name: impl Into<String>, value: Value) {
        self.shared
            .script
            .lock()
            .payloads
            .entry(kind)
            .or_default()
            .insert(name.into(), value);
    }

    /// Wait before answering `kind`
    pub fn delay(&self, kind: MessageKind, delay: Duration) {
        self.shared.script.lock().delays.insert(kind, delay);
    }

    /// Acknowledge `open` and `frame capture` but never complete them
    pub fn without_completion(&self) {
        self.shared.script.lock().without_completion = true;
    }

    /// Elapsed time reported in `frame capture done`
    pub fn set_capture_elapsed(&self, millis: u64) {
        self.shared.script.lock().capture_elapsed_millis = millis;
    }

    /// Every command received so far, as JSON
    pub fn commands(&self) -> Vec<Value> {
        self.shared.recorded.lock().commands.clone()
    }

    /// Commands received with the given tag
    pub fn commands_of(&self, kind: MessageKind) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter(|command| command["command"] == kind.as_str())
            .collect()
    }

    /// Responses the client sent to commands pushed by this player
    pub fn responses(&self) -> Vec<Value> {
        self.shared.recorded.lock().responses.clone()
    }

    /// Address the client asked to receive player commands on
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.shared.recorded.lock().client
    }

    /// Send a JSON message to the connected client
    pub async fn send_json(&self, message: &Value) -> io::Result<()> {
        let data = serde_json::to_vec(message)?;
        self.send_raw(&data).await
    }

    /// Send raw bytes to the connected client
    pub async fn send_raw(&self, data: &[u8]) -> io::Result<()> {
        let target = self.client_addr().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "client has not connected")
        })?;
        self.socket.send_to(data, target).await?;
        Ok(())
    }

    /// Wait until the client has answered `count` pushed commands
    pub async fn wait_for_responses(&self, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let responses = self.responses();
            if responses.len() >= count || Instant::now() >= deadline {
                return responses;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockPlayer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(socket: Arc<UdpSocket>, shared: Arc<Shared>) {
    let mut buffer = vec![0u8; 65_536];
    loop {
        let (len, from) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                warn!("Mock player receive failed: {e}");
                sleep(Duration::from_millis(10)).await;
                continue;
            }
        };

        let message: Value = match serde_json::from_slice(&buffer[..len]) {
            Ok(message) => message,
            Err(e) => {
                warn!("Mock player got invalid JSON from {from}: {e}");
                continue;
            }
        };

        if message.get("response").is_some() {
            shared.recorded.lock().responses.push(message);
            continue;
        }

        let Some(kind) = message
            .get("command")
            .and_then(Value::as_str)
            .and_then(|tag| tag.parse::<MessageKind>().ok())
        else {
            warn!("Mock player ignoring {message}");
            continue;
        };

        {
            let mut recorded = shared.recorded.lock();
            recorded.commands.push(message.clone());
            if kind == MessageKind::Connect {
                recorded.client = Some(callback_addr(&message, from));
            } else if recorded.client.is_none() {
                recorded.client = Some(from);
            }
        }

        let replies = replies_for(&shared, kind, &message);
        if replies.is_empty() {
            continue;
        }

        let delay = shared.script.lock().delays.get(&kind).copied();
        let socket = socket.clone();
        tokio::spawn(async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            for reply in replies {
                let data = reply.to_string();
                if let Err(e) = socket.send_to(data.as_bytes(), from).await {
                    warn!("Mock player failed to reply to {from}: {e}");
                }
            }
        });
    }
}

/// Where the client asked the player to send its own commands
fn callback_addr(message: &Value, from: SocketAddr) -> SocketAddr {
    let port = message
        .get("port")
        .and_then(Value::as_u64)
        .and_then(|port| u16::try_from(port).ok())
        .unwrap_or(from.port());
    let ip = message
        .get("host")
        .and_then(Value::as_str)
        .and_then(|host| host.parse::<IpAddr>().ok())
        .unwrap_or(from.ip());
    SocketAddr::new(ip, port)
}

fn replies_for(shared: &Shared, kind: MessageKind, command: &Value) -> Vec<Value> {
    let mut script = shared.script.lock();

    if script.silent.contains(&kind) {
        return Vec::new();
    }
    if let Some(remaining) = script.drop_first.get_mut(&kind)
        && *remaining > 0
    {
        *remaining -= 1;
        return Vec::new();
    }

    let uuid = command.get("uuid").cloned();
    let mut ack = json!({ "response": kind.as_str() });
    if let Some(uuid) = &uuid {
        ack["uuid"] = uuid.clone();
    }

    if let Some(cause) = script.failures.get(&kind) {
        ack["status"] = json!("failed");
        ack["cause"] = json!(cause);
        return vec![ack];
    }

    ack["status"] = json!("ok");
    if let Some(payload) = script.payloads.get(&kind)
        && let Some(fields) = ack.as_object_mut()
    {
        fields.extend(payload.clone());
    }

    let mut replies = vec![ack];
    if script.without_completion {
        return replies;
    }

    let (done_kind, mut done) = match kind {
        MessageKind::Open => {
            let mut done = json!({ "response": "open done", "status": "ok" });
            if let Some(uuid) = uuid {
                done["uuid"] = uuid;
            }
            (MessageKind::OpenDone, done)
        }
        MessageKind::FrameCapture => (
            MessageKind::FrameCaptureDone,
            json!({
                "response": "frame capture done",
                "status": "ok",
                "uuid": uuid,
                "elapsedTimeMillis": script.capture_elapsed_millis,
                "imageReferenceUuid": command.get("imageReferenceUuid"),
                "imageLocation": command.get("imageLocation"),
            }),
        ),
        _ => return replies,
    };

    // Fields scripted for the completion kind replace the echoed ones
    if let Some(payload) = script.payloads.get(&done_kind)
        && let Some(fields) = done.as_object_mut()
    {
        fields.extend(payload.clone());
    }
    replies.push(done);
    replies
}
