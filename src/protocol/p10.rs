//! P10 (nefarious family).
//!
//! Every line after registration starts with the sender's base64 numeric.
//! Clients are the two character server numeric followed by three more
//! digits. Bursts end with `EB`, acknowledged by `EA`.

use std::sync::Arc;

use slirc_link::{Framing, p10};

use crate::error::DispatchError;
use crate::handlers::{self, DispatchTable};
use crate::state::{Channel, Identity, User};

use super::{Capabilities, Dialect, Outbox, STANDARD_STATUS_MODES};

/// Default G-line duration when none is given: four weeks.
const DEFAULT_GLINE_SECS: u64 = 2_419_200;

/// Number of local clients one server numeric can address.
const UID_SPACE: u64 = 1 << 18;

pub const CAPS: Capabilities = Capabilities {
    name: "p10",
    framing: Framing::P10,
    uses_uid: true,
    uses_owner: false,
    uses_protect: false,
    uses_halfops: true,
    status_modes: STANDARD_STATUS_MODES,
    simple_modes: "aimnprstzcCDQNMSTOLZ",
    param_modes: "",
    ban_like_modes: "be",
    except_mchar: Some('e'),
    invex_mchar: None,
    oper_only_modes: "zaO",
    perm_mode: Some('z'),
    clears_bans_on_reset: true,
};

pub struct P10 {
    me: Arc<Identity>,
    caps: Capabilities,
    /// Two character server numeric.
    numeric: String,
    started: i64,
}

impl P10 {
    pub fn new(me: Arc<Identity>) -> Self {
        // One character numerics are widened so client numerics stay five
        // characters long.
        let numeric = me
            .sid
            .as_deref()
            .and_then(p10::decode)
            .and_then(|n| p10::encode(n, p10::SERVER_NUMERIC_LEN))
            .unwrap_or_else(|| me.id().to_string());
        Self {
            me,
            caps: CAPS,
            numeric,
            started: chrono::Utc::now().timestamp(),
        }
    }

    pub fn numeric(&self) -> &str {
        &self.numeric
    }
}

impl Dialect for P10 {
    fn caps(&self) -> &Capabilities {
        &self.caps
    }

    fn identity(&self) -> &Identity {
        &self.me
    }

    fn register(&self, table: &mut DispatchTable) -> Result<(), DispatchError> {
        handlers::p10::register(table)
    }

    fn login(&self, out: &mut Outbox, password: &str) {
        out.push(format!("PASS :{password}"));
        out.push(format!(
            "SERVER {} 1 {} {} J10 {}]]] +s6 :{}",
            self.me.name,
            self.started,
            chrono::Utc::now().timestamp(),
            self.numeric,
            self.me.description
        ));
    }

    fn introduce_user(&self, out: &mut Outbox, user: &User) {
        out.push(format!(
            "{} N {} 1 {} {} {} +iok ]]]]]] {} :{}",
            self.numeric,
            user.nick,
            user.ts,
            user.user,
            user.vhost,
            user.target(),
            user.gecos
        ));
    }

    fn quit(&self, out: &mut Outbox, user: &User, reason: &str) {
        out.push(format!("{} Q :{}", user.target(), reason));
    }

    fn join(&self, out: &mut Outbox, channel: &Channel, user: &User, is_new: bool) {
        if is_new {
            out.push(format!("{} C {} {}", user.target(), channel.name, channel.ts));
            let modes = channel.mode_string();
            if modes.len() > 1 {
                out.push(format!("{} M {} {}", user.target(), channel.name, modes));
            }
        } else {
            out.push(format!("{} J {} {}", user.target(), channel.name, channel.ts));
            out.push(format!(
                "{} M {} +o {}",
                self.numeric,
                channel.name,
                user.target()
            ));
        }
    }

    fn part(&self, out: &mut Outbox, channel: &Channel, user: &User) {
        out.push(format!("{} L {}", user.target(), channel.name));
    }

    fn kick(
        &self,
        out: &mut Outbox,
        source: Option<&User>,
        channel: &Channel,
        target: &User,
        reason: &str,
    ) {
        let from = match source {
            Some(u) if channel.member(u.id).is_some() => u.target(),
            _ => self.numeric.as_str(),
        };
        out.push(format!(
            "{} K {} {} :{}",
            from,
            channel.name,
            target.target(),
            reason
        ));
    }

    fn mode(&self, out: &mut Outbox, source: Option<&User>, channel: &Channel, modes: &str) {
        let from = match source {
            Some(u) if channel.member(u.id).is_some() => u.target(),
            _ => self.numeric.as_str(),
        };
        out.push(format!("{} M {} {}", from, channel.name, modes));
    }

    fn topic(&self, out: &mut Outbox, source: &User, channel: &Channel, text: &str, ts: i64) {
        out.push(format!(
            "{} T {} {} {} :{}",
            source.target(),
            channel.name,
            channel.ts,
            ts,
            text
        ));
    }

    fn kill_id(&self, out: &mut Outbox, killer: Option<&User>, target: &str, reason: &str) {
        match killer {
            Some(k) => out.push(format!(
                "{} D {} :{}!{} ({})",
                k.target(),
                target,
                k.host,
                k.nick,
                reason
            )),
            None => out.push(format!(
                "{} D {} :{} ({})",
                self.numeric, target, self.me.name, reason
            )),
        }
    }

    fn kline(
        &self,
        out: &mut Outbox,
        _server: &str,
        user: &str,
        host: &str,
        duration: u64,
        reason: &str,
    ) {
        let duration = if duration > 0 {
            duration
        } else {
            DEFAULT_GLINE_SECS
        };
        out.push(format!(
            "{} GL * +{}@{} {} :{}",
            self.numeric, user, host, duration, reason
        ));
    }

    fn unkline(&self, out: &mut Outbox, _server: &str, user: &str, host: &str) {
        out.push(format!("{} GL * -{}@{}", self.numeric, user, host));
    }

    fn ping(&self, out: &mut Outbox, _target: Option<&str>) {
        let now = chrono::Utc::now().timestamp();
        out.push(format!(
            "{} G !{} {} {}",
            self.numeric, now, self.me.name, now
        ));
    }

    fn pong(&self, out: &mut Outbox, target: &str) {
        out.push(format!("{} Z {} {}", self.numeric, self.numeric, target));
    }

    fn invite(&self, out: &mut Outbox, source: &User, target: &User, channel: &Channel) {
        // P10 invites address the target by nick.
        out.push(format!(
            "{} I {} {}",
            source.target(),
            target.nick,
            channel.name
        ));
    }

    fn wallops(&self, out: &mut Outbox, text: &str) {
        out.push(format!("{} WA :{}", self.numeric, text));
    }

    fn reop(&self, out: &mut Outbox, channel: &Channel, user: &User) {
        out.push(format!(
            "{} M {} +o {}",
            self.numeric,
            channel.name,
            user.target()
        ));
    }

    fn end_of_burst(&self, out: &mut Outbox) {
        out.push(format!("{} EB", self.numeric));
    }

    fn burst_ack(&self, out: &mut Outbox) {
        out.push(format!("{} EA", self.numeric));
    }

    fn allocate_uid(&self, seq: u64) -> Option<String> {
        if seq >= UID_SPACE {
            return None;
        }
        let client = p10::encode(seq, p10::CLIENT_NUMERIC_LEN - p10::SERVER_NUMERIC_LEN)?;
        Some(format!("{}{}", self.numeric, client))
    }
}
