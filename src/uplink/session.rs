//! Uplink session event loop.
//!
//! One task owns the [`Network`] and drives a single framed connection:
//! every inbound line is dispatched to completion, then whatever it queued
//! is flushed, before the next line is read. A heartbeat interval sends
//! keepalive pings and detects a dead link.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use slirc_link::LineFramer;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, error, info, warn};

use super::LinkState;
use crate::config::Config;
use crate::error::{DispatchError, UplinkError};
use crate::handlers::{LineOutcome, Pipeline};
use crate::protocol::{self, Dialect, Outbox};
use crate::services::Roster;
use crate::state::{Identity, Network, Notifier, TraceObserver};
use crate::telemetry::spans;

type Link<S> = Framed<S, LineFramer>;

/// The services daemon: network state, dispatch pipeline and pseudo-client
/// roster. Survives reconnects; only the uplink's part of the network is
/// torn down when a session ends.
pub struct Services {
    config: Config,
    pipeline: Pipeline,
    net: Network,
    roster: Roster,
}

impl Services {
    pub fn new(config: Config) -> Result<Self, DispatchError> {
        let me = Arc::new(Identity::from_config(&config));
        let dialect = protocol::select(config.protocol.dialect, Arc::clone(&me));
        let notifier = Arc::new(Notifier::new());
        notifier.subscribe(Arc::new(TraceObserver));
        let net = Network::new(me, Arc::new(dialect.caps().clone()), notifier);
        let pipeline = Pipeline::new(dialect)?;
        let roster = Roster::new(config.services.clone());
        Ok(Self {
            config,
            pipeline,
            net,
            roster,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.net
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.pipeline.dialect()
    }

    /// Connect to the configured uplink and run a session on it. Always
    /// returns the reason the session ended.
    pub async fn connect(&mut self) -> UplinkError {
        let uplink = &self.config.uplink;
        let address = uplink.address();
        let limit = uplink.connect_timeout();
        let span = spans::session(&uplink.name, &address);
        info!(uplink = %uplink.name, address = %address, "Connecting to uplink");

        let stream = match timeout(limit, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return UplinkError::Connect(e),
            Err(_) => return UplinkError::ConnectTimeout(limit),
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        self.run(stream).instrument(span).await
    }

    /// Run a session over an established stream until it ends.
    pub async fn run<S>(&mut self, stream: S) -> UplinkError
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut link = LinkState::from_config(&self.config.uplink);
        let mut framed = Framed::new(
            stream,
            LineFramer::with_max_len(self.config.protocol.max_line_len),
        );

        let reason = self.drive(&mut framed, &mut link).await;
        match &reason {
            UplinkError::Shutdown(_) => error!(error = %reason, "Session ended"),
            UplinkError::PingTimeout(_) => error!(error = %reason, "Session ended"),
            _ => warn!(error = %reason, code = reason.error_code(), "Session ended"),
        }

        let stats = self.pipeline.table().command_stats();
        for (command, count) in &stats {
            debug!(command = %command, count, "Command usage");
        }
        info!(
            commands = stats.len(),
            uptime_secs = link.connected_at.elapsed().as_secs(),
            "Uplink session closed"
        );

        self.net.teardown_uplink();
        reason
    }

    async fn drive<S>(&mut self, framed: &mut Link<S>, link: &mut LinkState) -> UplinkError
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let dialect = Arc::clone(self.pipeline.dialect());
        let mut out = Outbox::new();

        dialect.login(&mut out, &self.config.uplink.send_password);
        let introduced = self
            .roster
            .introduce_all(&mut self.net, dialect.as_ref(), &mut out);
        dialect.end_of_burst(&mut out);
        info!(services = introduced, "Burst sent");
        if let Err(e) = flush(framed, &mut out).await {
            return e;
        }

        let period = self.config.uplink.ping_interval();
        let ping_timeout = self.config.uplink.ping_timeout();
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = framed.next() => {
                    let line = match frame {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => return e.into(),
                        None => return UplinkError::Closed,
                    };
                    link.record_recv();
                    let outcome = self.pipeline.handle_line(
                        &mut self.net,
                        link,
                        &mut self.roster,
                        &mut out,
                        &line,
                    );
                    if !matches!(outcome, LineOutcome::Handled) {
                        debug!(line = %line, outcome = ?outcome, "Line not handled");
                    }
                    if let Err(e) = flush(framed, &mut out).await {
                        return e;
                    }
                    if let Some(close) = link.close_request() {
                        return if close.shutdown {
                            UplinkError::Shutdown(close.reason.clone())
                        } else {
                            UplinkError::Dropped(close.reason.clone())
                        };
                    }
                }
                _ = heartbeat.tick() => {
                    let idle = link.idle_for();
                    if idle >= ping_timeout {
                        return UplinkError::PingTimeout(idle);
                    }
                    dialect.ping(&mut out, None);
                    link.record_ping();
                    if let Err(e) = flush(framed, &mut out).await {
                        return e;
                    }
                }
            }
        }
    }
}

/// Write every queued line, then flush the sink once.
async fn flush<S>(framed: &mut Link<S>, out: &mut Outbox) -> Result<(), UplinkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if out.is_empty() {
        return Ok(());
    }
    for line in out.drain() {
        framed.feed(line).await?;
    }
    SinkExt::<String>::flush(framed).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf};

    const CONFIG: &str = r##"
        [server]
        name = "services.test"
        description = "Test Services"
        sid = "0SV"

        [uplink]
        name = "hub.test"
        hostname = "127.0.0.1"
        port = 6667
        send_password = "linkpass"
        ping_interval = 30
        ping_timeout = 90

        [[service]]
        nick = "NickServ"
        user = "ns"
        host = "services.test"
        gecos = "Nick Services"
        channels = ["#services"]
    "##;

    fn services() -> Services {
        Services::new(Config::from_toml(CONFIG).unwrap()).unwrap()
    }

    async fn read_line(reader: &mut BufReader<ReadHalf<DuplexStream>>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }

    #[tokio::test]
    async fn test_login_burst_then_close() {
        let mut services = services();
        let (ours, theirs) = tokio::io::duplex(4096);
        let (read, mut write) = tokio::io::split(theirs);
        let mut reader = BufReader::new(read);

        let session = tokio::spawn(async move {
            let reason = services.run(ours).await;
            (services, reason)
        });

        assert_eq!(read_line(&mut reader).await, "PASS linkpass TS 6 :0SV");
        let mut burst = Vec::new();
        loop {
            let line = read_line(&mut reader).await;
            if line.starts_with("SVINFO") {
                break;
            }
            burst.push(line);
        }
        assert!(burst.iter().any(|l| l.starts_with("CAPAB ")));
        assert!(burst.iter().any(|l| l.starts_with("SERVER services.test 1 ")));

        write
            .write_all(b"PASS linkpass TS 6 :0HB\r\nSERVER hub.test 1 :Hub\r\n")
            .await
            .unwrap();
        let mut seen = Vec::new();
        loop {
            let line = read_line(&mut reader).await;
            let done = line == "PING :services.test";
            seen.push(line);
            if done {
                break;
            }
        }
        assert!(seen.iter().any(|l| l.starts_with(":0SV UID NickServ 1 ")));
        assert!(seen.iter().any(|l| l.contains("SJOIN") && l.contains("#services")));

        drop(write);
        drop(reader);
        let (services, reason) = session.await.unwrap();
        assert!(matches!(reason, UplinkError::Closed | UplinkError::Frame(_)));
        assert!(services.network().uplink().is_none());
        assert!(services.network().find_user("NickServ").is_some());
    }

    #[tokio::test]
    async fn test_bad_password_drops_session() {
        let mut services = services();
        let (ours, mut theirs) = tokio::io::duplex(4096);
        theirs.write_all(b"PASS wrong TS 6 :0HB\r\n").await.unwrap();
        let reason = services.run(ours).await;
        assert!(matches!(reason, UplinkError::Dropped(ref r) if r == "Invalid password"));
    }
}
