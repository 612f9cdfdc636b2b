//! In-process link harness.
//!
//! Owns a network, pipeline and roster built the same way the daemon builds
//! them, and feeds wire lines straight into dispatch without any socket.

use std::sync::Arc;

use slirc_services::Config;
use slirc_services::handlers::{LineOutcome, Pipeline};
use slirc_services::protocol::{self, Outbox};
use slirc_services::services::Roster;
use slirc_services::state::{EventLog, Identity, Network, Notifier};
use slirc_services::uplink::LinkState;

/// A linked (or linking) network driven one line at a time.
pub struct TestLink {
    pub net: Network,
    pub log: Arc<EventLog>,
    pub link: LinkState,
    pub roster: Roster,
    pub out: Outbox,
    pipeline: Pipeline,
}

#[allow(dead_code)]
impl TestLink {
    /// Build from a config, unregistered, with the services already
    /// introduced (as right after login).
    pub fn from_config(toml: &str) -> Self {
        let config = Config::from_toml(toml).expect("test config parses");
        let me = Arc::new(Identity::from_config(&config));
        let dialect = protocol::select(config.protocol.dialect, Arc::clone(&me));
        let notifier = Arc::new(Notifier::new());
        let log = EventLog::new();
        notifier.subscribe(log.clone());
        let mut net = Network::new(me, Arc::new(dialect.caps().clone()), notifier);
        let pipeline = Pipeline::new(dialect).expect("dispatch table builds");

        let mut roster = Roster::new(config.services.clone());
        let mut out = Outbox::new();
        roster.introduce_all(&mut net, pipeline.dialect().as_ref(), &mut out);

        Self {
            net,
            log,
            link: LinkState::from_config(&config.uplink),
            roster,
            out,
            pipeline,
        }
    }

    /// TS6, linked to `hub.test` (0HB) with its burst finished.
    pub fn ts6(services: &str) -> Self {
        let mut t = Self::from_config(&super::config_toml("ts6", 6667, services));
        t.ok("PASS linkpass TS 6 :0HB");
        t.ok("CAPAB :QS EX IE KLN UNKLN ENCAP TB EUID");
        t.ok("SERVER hub.test 1 :Hub");
        t.ok(":0HB PONG hub.test :services.test");
        t.reset();
        t
    }

    /// P10, linked to `hub.test` (AB) with its burst finished.
    pub fn p10(services: &str) -> Self {
        let mut t = Self::from_config(&super::config_toml("p10", 4400, services));
        t.ok("PASS :linkpass");
        t.ok("SERVER hub.test 1 1700000000 1700000100 J10 AB]]] +h6 :Hub");
        t.ok("AB EB");
        t.reset();
        t
    }

    /// Drop queued output and recorded events.
    pub fn reset(&mut self) {
        self.out.take();
        self.log.take();
    }

    pub fn feed(&mut self, line: &str) -> LineOutcome {
        self.pipeline.handle_line(
            &mut self.net,
            &mut self.link,
            &mut self.roster,
            &mut self.out,
            line,
        )
    }

    /// Feed a line that must be handled.
    pub fn ok(&mut self, line: &str) {
        let outcome = self.feed(line);
        assert!(
            matches!(outcome, LineOutcome::Handled),
            "{line:?} was not handled: {outcome:?}"
        );
    }

    /// Lines queued for the uplink since the last call.
    pub fn sent(&mut self) -> Vec<String> {
        self.out.take()
    }

    /// Hook names fired since the last call.
    pub fn events(&self) -> Vec<&'static str> {
        let names = self.log.names();
        self.log.take();
        names
    }
}
