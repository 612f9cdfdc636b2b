//! TS6 (charybdis family).
//!
//! Clients are addressed by nine character UIDs: the three character SID
//! followed by six base36 digits. Channel state travels in `SJOIN`, mode
//! changes in `TMODE`, and end of burst is detected by pinging each new
//! server and waiting for its `PONG`.

use std::sync::Arc;

use slirc_link::Framing;

use crate::error::DispatchError;
use crate::handlers::{self, DispatchTable};
use crate::state::{Channel, Identity, User};

use super::{Capabilities, Dialect, Outbox, STANDARD_STATUS_MODES};

/// Capabilities we announce in `CAPAB`.
const CAPAB: &str = "QS EX IE KLN UNKLN ENCAP TB SERVICES EUID";

/// User modes our pseudo-clients carry.
const SERVICE_UMODES: &str = "+ioS";

/// Number of local clients one SID can address.
const UID_SPACE: u64 = 36u64.pow(6);

pub const CAPS: Capabilities = Capabilities {
    name: "ts6",
    framing: Framing::Rfc1459,
    uses_uid: true,
    uses_owner: false,
    uses_protect: false,
    uses_halfops: false,
    status_modes: STANDARD_STATUS_MODES,
    simple_modes: "imnpstcrzgLPFQ",
    param_modes: "fj",
    ban_like_modes: "beIq",
    except_mchar: Some('e'),
    invex_mchar: Some('I'),
    oper_only_modes: "LP",
    perm_mode: Some('P'),
    clears_bans_on_reset: true,
};

/// Encode a number as a 6-character base36 string.
fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; 6];

    for i in (0..6).rev() {
        result[i] = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}

pub struct Ts6 {
    me: Arc<Identity>,
    caps: Capabilities,
}

impl Ts6 {
    pub fn new(me: Arc<Identity>) -> Self {
        Self { me, caps: CAPS }
    }

    /// Our SID, or our name if none was configured.
    fn sid(&self) -> &str {
        self.me.id()
    }
}

impl Dialect for Ts6 {
    fn caps(&self) -> &Capabilities {
        &self.caps
    }

    fn identity(&self) -> &Identity {
        &self.me
    }

    fn register(&self, table: &mut DispatchTable) -> Result<(), DispatchError> {
        handlers::ts6::register(table)
    }

    fn login(&self, out: &mut Outbox, password: &str) {
        out.push(format!("PASS {} TS 6 :{}", password, self.sid()));
        out.push(format!("CAPAB :{CAPAB}"));
        let hidden = if self.me.hidden { "(H) " } else { "" };
        out.push(format!(
            "SERVER {} 1 :{}{}",
            self.me.name, hidden, self.me.description
        ));
        out.push(format!("SVINFO 6 3 0 :{}", chrono::Utc::now().timestamp()));
    }

    fn introduce_user(&self, out: &mut Outbox, user: &User) {
        out.push(format!(
            ":{} UID {} 1 {} {} {} {} 0 {} :{}",
            self.sid(),
            user.nick,
            user.ts,
            SERVICE_UMODES,
            user.user,
            user.vhost,
            user.target(),
            user.gecos
        ));
    }

    fn quit(&self, out: &mut Outbox, user: &User, reason: &str) {
        out.push(format!(":{} QUIT :{}", user.target(), reason));
    }

    fn join(&self, out: &mut Outbox, channel: &Channel, user: &User, is_new: bool) {
        let modes = if is_new {
            channel.mode_string()
        } else {
            "+".to_string()
        };
        out.push(format!(
            ":{} SJOIN {} {} {} :@{}",
            self.sid(),
            channel.ts,
            channel.name,
            modes,
            user.target()
        ));
    }

    fn part(&self, out: &mut Outbox, channel: &Channel, user: &User) {
        out.push(format!(":{} PART {}", user.target(), channel.name));
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
            Some(u) if channel.ts != 0 || channel.member(u.id).is_some() => u.target(),
            _ => self.sid(),
        };
        out.push(format!(
            ":{} KICK {} {} :{}",
            from,
            channel.name,
            target.target(),
            reason
        ));
    }

    fn mode(&self, out: &mut Outbox, source: Option<&User>, channel: &Channel, modes: &str) {
        let from = source.map_or(self.sid(), User::target);
        out.push(format!(
            ":{} TMODE {} {} {}",
            from, channel.ts, channel.name, modes
        ));
    }

    fn topic(&self, out: &mut Outbox, source: &User, channel: &Channel, text: &str, _ts: i64) {
        // Non-members cannot set topics on most TS6 servers; join briefly.
        let joined = channel.member(source.id).is_none();
        if joined {
            out.push(format!(
                ":{} SJOIN {} {} + :@{}",
                self.sid(),
                channel.ts,
                channel.name,
                source.target()
            ));
        }
        out.push(format!(
            ":{} TOPIC {} :{}",
            source.target(),
            channel.name,
            text
        ));
        if joined {
            out.push(format!(
                ":{} PART {} :Topic set for {}",
                source.target(),
                channel.name,
                source.nick
            ));
        }
    }

    fn kill_id(&self, out: &mut Outbox, killer: Option<&User>, target: &str, reason: &str) {
        match killer {
            Some(k) => out.push(format!(
                ":{} KILL {} :{}!{} ({})",
                k.target(),
                target,
                k.host,
                k.nick,
                reason
            )),
            None => out.push(format!(
                ":{} KILL {} :{} ({})",
                self.sid(),
                target,
                self.me.name,
                reason
            )),
        }
    }

    fn kline(
        &self,
        out: &mut Outbox,
        server: &str,
        user: &str,
        host: &str,
        duration: u64,
        reason: &str,
    ) {
        out.push(format!(
            ":{} ENCAP {} KLINE {} {} {} :{}",
            self.sid(),
            server,
            duration,
            user,
            host,
            reason
        ));
    }

    fn unkline(&self, out: &mut Outbox, server: &str, user: &str, host: &str) {
        out.push(format!(
            ":{} ENCAP {} UNKLINE {} {}",
            self.sid(),
            server,
            user,
            host
        ));
    }

    fn ping(&self, out: &mut Outbox, target: Option<&str>) {
        match target {
            Some(t) => out.push(format!(":{} PING {} {}", self.sid(), self.me.name, t)),
            None => out.push(format!("PING :{}", self.me.name)),
        }
    }

    fn pong(&self, out: &mut Outbox, target: &str) {
        out.push(format!(":{} PONG {} {}", self.sid(), self.me.name, target));
    }

    fn invite(&self, out: &mut Outbox, source: &User, target: &User, channel: &Channel) {
        out.push(format!(
            ":{} INVITE {} {}",
            source.target(),
            target.target(),
            channel.name
        ));
    }

    fn wallops(&self, out: &mut Outbox, text: &str) {
        out.push(format!(":{} WALLOPS :{}", self.sid(), text));
    }

    fn reop(&self, out: &mut Outbox, channel: &Channel, user: &User) {
        out.push(format!(":{} PART {} :Reop", user.target(), channel.name));
        out.push(format!(
            ":{} SJOIN {} {} + :@{}",
            self.sid(),
            channel.ts,
            channel.name,
            user.target()
        ));
    }

    fn allocate_uid(&self, seq: u64) -> Option<String> {
        let sid = self.me.sid.as_deref()?;
        (seq < UID_SPACE).then(|| format!("{}{}", sid, base36_encode_6(seq)))
    }
}
