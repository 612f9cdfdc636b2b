//! Users: introduction, rename, user modes and removal.

use std::collections::BTreeSet;
use std::net::IpAddr;

use slirc_link::{fold, fold_eq};
use tracing::{debug, error, info, warn};

use crate::error::StateError;

use super::collision::{self, Claim, Verdict};
use super::{Effect, Event, Network, UserId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UserFlags {
    /// +i
    pub invisible: bool,
    /// +o
    pub oper: bool,
    /// A services pseudo-client.
    pub service: bool,
    /// Placeholder holding a nick on behalf of an account.
    pub enforcer: bool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub nick: String,
    pub uid: Option<String>,
    pub user: String,
    pub host: String,
    /// Visible host; equals `host` unless cloaked.
    pub vhost: String,
    pub ip: Option<IpAddr>,
    pub gecos: String,
    pub ts: i64,
    /// Folded name of the owning server.
    pub server: String,
    /// Owned by this daemon.
    pub local: bool,
    /// Folded names of joined channels.
    pub channels: BTreeSet<String>,
    pub flags: UserFlags,
}

impl User {
    /// What to address this user by on the wire.
    pub fn target(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.nick)
    }

    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }

    fn claim<'a>(&'a self, server: &'a str) -> Claim<'a> {
        Claim {
            nick: &self.nick,
            uid: self.uid.as_deref(),
            user: &self.user,
            host: &self.host,
            ts: self.ts,
            server,
            local: self.local,
        }
    }

    fn same_as(&self, new: &NewUser<'_>, server_key: &str) -> bool {
        self.uid.as_deref() == new.uid
            && fold_eq(&self.nick, new.nick)
            && self.user == new.user
            && self.host == new.host
            && self.ts == new.ts
            && self.server == server_key
    }
}

/// A user introduction as decoded from the wire.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub nick: &'a str,
    pub user: &'a str,
    pub host: &'a str,
    pub vhost: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub uid: Option<&'a str>,
    pub gecos: &'a str,
    /// Owning server, by name or SID.
    pub server: &'a str,
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntroduceOutcome {
    Created(UserId),
    /// The exact same client was already known; nothing changed.
    Unchanged(UserId),
    /// Lost a nick collision; the user was not created.
    Rejected(Vec<Effect>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// Lost a nick collision; the renaming user is gone.
    Removed(Vec<Effect>),
}

/// Placeholder addresses some servers send for "unknown".
fn parse_ip(ip: Option<&str>) -> Option<IpAddr> {
    match ip? {
        "0" | "0.0.0.0" | "255.255.255.255" => None,
        other => other.parse().ok(),
    }
}

impl Network {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn find_user_by_nick(&self, nick: &str) -> Option<&User> {
        self.nicks.get(&fold(nick)).and_then(|id| self.users.get(id))
    }

    pub fn find_user_by_uid(&self, uid: &str) -> Option<&User> {
        self.uids.get(uid).and_then(|id| self.users.get(id))
    }

    /// Resolve a wire reference: UID first on UID dialects, then nickname.
    pub fn find_user(&self, name: &str) -> Option<&User> {
        if self.caps.uses_uid
            && let Some(user) = self.find_user_by_uid(name)
        {
            return Some(user);
        }
        self.find_user_by_nick(name)
    }

    pub fn user_id(&self, name: &str) -> Option<UserId> {
        self.find_user(name).map(|u| u.id)
    }

    /// Local pseudo-clients, in no particular order.
    pub fn local_users(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|u| u.local)
    }

    fn server_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.servers
            .get(key)
            .map(|s| s.name.as_str())
            .unwrap_or(key)
    }

    /// Introduce a user, resolving nick collisions.
    pub fn introduce_user(&mut self, new: NewUser<'_>) -> Result<IntroduceOutcome, StateError> {
        let server_key = self
            .server_key(new.server)
            .ok_or_else(|| StateError::UnknownServer(new.server.to_string()))?;
        let local = self.is_local_key(&server_key);

        if let Some(uid) = new.uid
            && let Some(&id) = self.uids.get(uid)
        {
            if self.users.get(&id).is_some_and(|u| u.same_as(&new, &server_key)) {
                debug!(nick = %new.nick, uid = %uid, "Ignoring repeated introduction");
                return Ok(IntroduceOutcome::Unchanged(id));
            }
            warn!(nick = %new.nick, uid = %uid, "UID already in use by another client");
            return Err(StateError::DuplicateUid(uid.to_string()));
        }

        if let Some(&holder_id) = self.nicks.get(&fold(new.nick)) {
            let (verdict, effects) = {
                let Some(holder) = self.users.get(&holder_id) else {
                    return Err(StateError::UnknownUser);
                };
                if holder.same_as(&new, &server_key) {
                    debug!(nick = %new.nick, "Ignoring repeated introduction");
                    return Ok(IntroduceOutcome::Unchanged(holder_id));
                }
                let existing = holder.claim(self.server_name(&holder.server));
                let candidate = Claim {
                    nick: new.nick,
                    uid: new.uid,
                    user: new.user,
                    host: new.host,
                    ts: new.ts,
                    server: self.server_name(&server_key),
                    local,
                };
                let verdict = collision::resolve(&existing, &candidate);
                match verdict {
                    Verdict::LocalCollision => {
                        error!(nick = %new.nick, "Tried to add local nick which already exists");
                        return Err(StateError::LocalNickCollision(new.nick.to_string()));
                    }
                    Verdict::KillCandidate => {
                        info!(nick = %new.nick, server = %candidate.server, "Nick collision with services")
                    }
                    Verdict::TieBreak { candidate_wins } => info!(
                        nick = %new.nick,
                        server = %candidate.server,
                        candidate_wins,
                        "Nick collision with services, leaving resolution to the peer"
                    ),
                    Verdict::Ghost => warn!(
                        nick = %new.nick,
                        new_server = %candidate.server,
                        old_server = %existing.server,
                        "Ghost detected via nick collision"
                    ),
                }
                (
                    verdict,
                    collision::introduction_effects(verdict, &existing, &candidate),
                )
            };
            if verdict == Verdict::Ghost {
                self.delete_user(holder_id);
            }
            return Ok(IntroduceOutcome::Rejected(effects));
        }

        let id = UserId(self.next_user);
        self.next_user += 1;
        let ts = if new.ts == 0 {
            chrono::Utc::now().timestamp()
        } else {
            new.ts
        };
        let user = User {
            id,
            nick: new.nick.to_string(),
            uid: new.uid.map(str::to_string),
            user: new.user.to_string(),
            host: new.host.to_string(),
            vhost: new.vhost.unwrap_or(new.host).to_string(),
            ip: parse_ip(new.ip),
            gecos: new.gecos.to_string(),
            ts,
            server: server_key.clone(),
            local,
            channels: BTreeSet::new(),
            flags: UserFlags {
                service: local,
                ..UserFlags::default()
            },
        };
        debug!(nick = %user.nick, user = %user.user, host = %user.host, server = %server_key, "user_add");

        self.nicks.insert(fold(new.nick), id);
        if let Some(uid) = new.uid {
            self.uids.insert(uid.to_string(), id);
        }
        if let Some(server) = self.servers.get_mut(&server_key) {
            server.users.insert(id);
        }
        self.users.insert(id, user);

        self.publish(Event::UserAdd(id));
        Ok(IntroduceOutcome::Created(id))
    }

    /// Add one of our own clients.
    pub fn add_local_user(
        &mut self,
        nick: &str,
        user: &str,
        host: &str,
        gecos: &str,
        uid: Option<&str>,
    ) -> Result<UserId, StateError> {
        let me = self.me.name.clone();
        let new = NewUser {
            nick,
            user,
            host,
            vhost: None,
            ip: None,
            uid,
            gecos,
            server: &me,
            ts: chrono::Utc::now().timestamp(),
        };
        match self.introduce_user(new)? {
            IntroduceOutcome::Created(id) | IntroduceOutcome::Unchanged(id) => Ok(id),
            IntroduceOutcome::Rejected(_) => Err(StateError::LocalNickCollision(nick.to_string())),
        }
    }

    /// Remove a user and all of its memberships. The delete hook fires while
    /// the user is still fully indexed.
    pub fn delete_user(&mut self, id: UserId) -> Option<User> {
        if !self.users.contains_key(&id) {
            return None;
        }
        self.publish(Event::UserDelete(id));

        let channels: Vec<String> = self
            .users
            .get(&id)
            .map(|u| u.channels.iter().cloned().collect())
            .unwrap_or_default();
        for channel in channels {
            self.part_key(&channel, id);
        }

        let user = self.users.remove(&id)?;
        debug!(nick = %user.nick, server = %user.server, "user_delete");
        self.nicks.remove(&fold(&user.nick));
        if let Some(uid) = &user.uid {
            self.uids.remove(uid);
        }
        if let Some(server) = self.servers.get_mut(&user.server) {
            server.users.remove(&id);
            if user.flags.invisible {
                server.invisible_count = server.invisible_count.saturating_sub(1);
            }
            if user.flags.oper {
                server.oper_count = server.oper_count.saturating_sub(1);
            }
        }
        Some(user)
    }

    /// Change a user's nick, resolving collisions. Renaming to a case
    /// variant of the current nick is always allowed.
    pub fn change_nick(
        &mut self,
        id: UserId,
        new_nick: &str,
        ts: i64,
    ) -> Result<RenameOutcome, StateError> {
        let new_key = fold(new_nick);
        if let Some(&holder_id) = self.nicks.get(&new_key)
            && holder_id != id
        {
            let (verdict, effects) = {
                let renamer = self.users.get(&id).ok_or(StateError::UnknownUser)?;
                let holder = self.users.get(&holder_id).ok_or(StateError::UnknownUser)?;
                let holder_claim = holder.claim(self.server_name(&holder.server));
                let mut renamer_claim = renamer.claim(self.server_name(&renamer.server));
                renamer_claim.ts = ts;
                let verdict = collision::resolve(&holder_claim, &renamer_claim);
                match verdict {
                    Verdict::LocalCollision => {
                        error!(old = %renamer.nick, new = %new_nick, "Tried to change local nick to one which already exists");
                        return Err(StateError::LocalNickCollision(new_nick.to_string()));
                    }
                    Verdict::KillCandidate | Verdict::TieBreak { .. } => info!(
                        old = %renamer.nick,
                        new = %new_nick,
                        ?verdict,
                        "Nick change collision with services"
                    ),
                    Verdict::Ghost => warn!(
                        old = %renamer.nick,
                        new = %new_nick,
                        "Ghost detected via nick change collision"
                    ),
                }
                (
                    verdict,
                    collision::rename_effects(verdict, &holder_claim, &renamer_claim, new_nick),
                )
            };
            self.delete_user(id);
            if verdict == Verdict::Ghost {
                self.delete_user(holder_id);
            }
            return Ok(RenameOutcome::Removed(effects));
        }

        let user = self.users.get_mut(&id).ok_or(StateError::UnknownUser)?;
        let old = std::mem::replace(&mut user.nick, new_nick.to_string());
        user.ts = ts;
        self.nicks.remove(&fold(&old));
        self.nicks.insert(new_key, id);
        debug!(old = %old, new = %new_nick, "user_nickchange");

        self.publish(Event::UserNickChange { user: id, old });
        Ok(RenameOutcome::Renamed)
    }

    /// Apply a user mode string. Only `i` and `o` are tracked; the owning
    /// server's counters follow them.
    pub fn apply_user_modes(&mut self, id: UserId, modes: &str) -> Result<(), StateError> {
        let user = self.users.get_mut(&id).ok_or(StateError::UnknownUser)?;
        let was = user.flags;
        let mut adding = true;
        for c in modes.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                'i' => user.flags.invisible = adding,
                'o' => user.flags.oper = adding,
                _ => {}
            }
        }
        let now = user.flags;
        let server_key = user.server.clone();
        let nick = user.nick.clone();

        if let Some(server) = self.servers.get_mut(&server_key) {
            match (was.invisible, now.invisible) {
                (false, true) => server.invisible_count += 1,
                (true, false) => server.invisible_count = server.invisible_count.saturating_sub(1),
                _ => {}
            }
            match (was.oper, now.oper) {
                (false, true) => server.oper_count += 1,
                (true, false) => server.oper_count = server.oper_count.saturating_sub(1),
                _ => {}
            }
        }
        match (was.oper, now.oper) {
            (false, true) => {
                info!(nick = %nick, server = %server_key, "OPER");
                self.publish(Event::UserOper(id));
            }
            (true, false) => {
                info!(nick = %nick, server = %server_key, "DEOPER");
                self.publish(Event::UserDeoper(id));
            }
            _ => {}
        }
        Ok(())
    }

    /// Give a user a new UID, keeping everything else.
    pub fn change_uid(&mut self, id: UserId, uid: &str) -> Result<(), StateError> {
        if self.uids.contains_key(uid) {
            return Err(StateError::DuplicateUid(uid.to_string()));
        }
        let user = self.users.get_mut(&id).ok_or(StateError::UnknownUser)?;
        let old = user.uid.replace(uid.to_string());
        debug!(nick = %user.nick, old = ?old, new = %uid, "user_changeuid");
        if let Some(old) = old {
            self.uids.remove(&old);
        }
        self.uids.insert(uid.to_string(), id);
        Ok(())
    }

    /// Change a user's visible host.
    pub fn set_vhost(&mut self, id: UserId, vhost: &str) -> Result<(), StateError> {
        let user = self.users.get_mut(&id).ok_or(StateError::UnknownUser)?;
        user.vhost = vhost.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{linked, remote, service};

    fn created(outcome: IntroduceOutcome) -> UserId {
        match outcome {
            IntroduceOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[test]
    fn test_introduce_indexes_by_nick_and_uid() {
        let (mut net, log) = linked();
        let id = created(net.introduce_user(remote("Alice", "0HBAAAAAA", 100)).unwrap());
        assert_eq!(net.find_user_by_nick("alice").map(|u| u.id), Some(id));
        assert_eq!(net.find_user("0HBAAAAAA").map(|u| u.id), Some(id));
        assert_eq!(net.find_server("0HB").unwrap().user_count(), 1);
        assert_eq!(log.names(), vec!["user_add"]);
    }

    #[test]
    fn test_reintroduction_is_idempotent() {
        let (mut net, log) = linked();
        let id = created(net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap());
        assert_eq!(
            net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap(),
            IntroduceOutcome::Unchanged(id)
        );
        assert_eq!(net.user_count(), 1);
        assert_eq!(log.names(), vec!["user_add"]);
    }

    #[test]
    fn test_uid_reuse_is_refused() {
        let (mut net, _) = linked();
        net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap();
        assert_eq!(
            net.introduce_user(remote("bob", "0HBAAAAAA", 100)),
            Err(StateError::DuplicateUid("0HBAAAAAA".into()))
        );
    }

    #[test]
    fn test_ip_placeholders_and_zero_ts() {
        let (mut net, _) = linked();
        let mut a = remote("a", "0HBAAAAAA", 0);
        a.ip = Some("255.255.255.255");
        let id = created(net.introduce_user(a).unwrap());
        let user = net.user(id).unwrap();
        assert_eq!(user.ip, None);
        assert!(user.ts > 0);

        let mut b = remote("b", "0HBAAAAAB", 5);
        b.ip = Some("not-an-ip");
        let id = created(net.introduce_user(b).unwrap());
        assert_eq!(net.user(id).unwrap().ip, None);
    }

    #[test]
    fn test_local_collision_is_an_error() {
        let (mut net, _) = linked();
        net.introduce_user(remote("NickServ", "0HBAAAAAA", 100)).unwrap();
        assert_eq!(
            net.add_local_user("NickServ", "ns", "services.test", "x", Some("0SVAAAAAA")),
            Err(StateError::LocalNickCollision("NickServ".into()))
        );
    }

    #[test]
    fn test_remote_uid_against_service_is_killed() {
        let (mut net, log) = linked();
        let ns = created(net.introduce_user(service("NickServ", "0SVAAAAAA")).unwrap());
        log.take();
        let outcome = net.introduce_user(remote("nickserv", "0HBAAAAAA", 1)).unwrap();
        assert_eq!(
            outcome,
            IntroduceOutcome::Rejected(vec![Effect::Kill {
                target: "0HBAAAAAA".into(),
                reason: "Nick collision with services (new)".into()
            }])
        );
        assert_eq!(net.find_user_by_nick("NickServ").map(|u| u.id), Some(ns));
        assert!(net.find_user_by_uid("0HBAAAAAA").is_none());
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_ghost_removes_both() {
        let (mut net, log) = linked();
        net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap();
        log.take();
        let outcome = net.introduce_user(remote("alice", "0HBAAAAAB", 90)).unwrap();
        let IntroduceOutcome::Rejected(effects) = outcome else {
            panic!("ghost must be rejected");
        };
        assert_eq!(effects.len(), 3);
        assert_eq!(net.user_count(), 0);
        assert_eq!(log.names(), vec!["user_delete"]);
    }

    #[test]
    fn test_rename_updates_index_and_fires_hook() {
        let (mut net, log) = linked();
        let id = created(net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap());
        log.take();
        assert_eq!(net.change_nick(id, "alicia", 200).unwrap(), RenameOutcome::Renamed);
        assert!(net.find_user_by_nick("alice").is_none());
        assert_eq!(net.find_user_by_nick("ALICIA").unwrap().ts, 200);
        assert_eq!(
            log.take(),
            vec![Event::UserNickChange {
                user: id,
                old: "alice".into()
            }]
        );
    }

    #[test]
    fn test_case_change_is_not_a_collision() {
        let (mut net, _) = linked();
        let id = created(net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap());
        assert_eq!(net.change_nick(id, "Alice", 100).unwrap(), RenameOutcome::Renamed);
        assert_eq!(net.user(id).unwrap().nick, "Alice");
        assert_eq!(net.user_count(), 1);
    }

    #[test]
    fn test_rename_into_service_removes_renamer() {
        let (mut net, _) = linked();
        net.introduce_user(service("ChanServ", "0SVAAAAAA")).unwrap();
        let bob = created(net.introduce_user(remote("bob", "0HBAAAAAA", 100)).unwrap());
        let outcome = net.change_nick(bob, "chanserv", 150).unwrap();
        assert!(matches!(outcome, RenameOutcome::Removed(ref e) if e.len() == 1));
        assert!(net.user(bob).is_none());
        assert!(net.find_user_by_nick("ChanServ").unwrap().local);
    }

    #[test]
    fn test_user_modes_drive_server_counters() {
        let (mut net, log) = linked();
        let id = created(net.introduce_user(remote("alice", "0HBAAAAAA", 100)).unwrap());
        log.take();
        net.apply_user_modes(id, "+io").unwrap();
        let hub = net.find_server("0HB").unwrap();
        assert_eq!((hub.invisible_count, hub.oper_count), (1, 1));
        net.apply_user_modes(id, "-o").unwrap();
        assert_eq!(net.find_server("0HB").unwrap().oper_count, 0);
        assert_eq!(log.names(), vec!["user_oper", "user_deoper"]);

        net.delete_user(id);
        assert_eq!(net.find_server("0HB").unwrap().invisible_count, 0);
    }
}
