//! Servers: the local identity and the remote tree hanging off the uplink.

use std::collections::BTreeSet;

use slirc_link::fold;
use tracing::{debug, info, warn};

use crate::config::{Config, DialectKind};
use crate::error::StateError;

use super::{Event, Network, UserId};

/// Who this daemon is on the network. Fixed after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub description: String,
    /// TS6 SID or P10 numeric.
    pub sid: Option<String>,
    pub hidden: bool,
}

impl Identity {
    pub fn from_config(config: &Config) -> Self {
        let sid = match config.protocol.dialect {
            DialectKind::Ts6 => config.server.sid.clone(),
            DialectKind::P10 => config.server.numeric.clone(),
        };
        Self {
            name: config.server.name.clone(),
            description: config.server.description.clone(),
            sid,
            hidden: config.server.hidden,
        }
    }

    /// SID when there is one, otherwise the name.
    pub fn id(&self) -> &str {
        self.sid.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServerFlags {
    /// Finished bursting.
    pub eob: bool,
    /// Introduced behind a server that had not finished bursting yet; its
    /// EOB follows its parent's.
    pub pre_synced: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub name: String,
    pub sid: Option<String>,
    pub description: String,
    pub hops: u32,
    /// Folded name of the parent; `None` only for the local server.
    pub parent: Option<String>,
    /// Folded names of directly linked children.
    pub children: Vec<String>,
    pub users: BTreeSet<UserId>,
    pub invisible_count: usize,
    pub oper_count: usize,
    pub flags: ServerFlags,
    pub local: bool,
}

impl Server {
    pub(super) fn local(me: &Identity) -> Self {
        Self {
            name: me.name.clone(),
            sid: me.sid.clone(),
            description: me.description.clone(),
            hops: 0,
            parent: None,
            children: Vec::new(),
            users: BTreeSet::new(),
            invisible_count: 0,
            oper_count: 0,
            flags: ServerFlags {
                eob: true,
                pre_synced: false,
                hidden: me.hidden,
            },
            local: true,
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// SID when there is one, otherwise the name.
    pub fn id(&self) -> &str {
        self.sid.as_deref().unwrap_or(&self.name)
    }
}

impl Network {
    pub(super) fn server_key(&self, name_or_sid: &str) -> Option<String> {
        if let Some(key) = self.sids.get(name_or_sid) {
            return Some(key.clone());
        }
        let key = fold(name_or_sid);
        self.servers.contains_key(&key).then_some(key)
    }

    /// Look a server up by name or SID.
    pub fn find_server(&self, name_or_sid: &str) -> Option<&Server> {
        self.server_key(name_or_sid)
            .and_then(|k| self.servers.get(&k))
    }

    pub(super) fn is_local_key(&self, key: &str) -> bool {
        self.servers.get(key).is_some_and(|s| s.local)
    }

    /// Add a server below `parent` (name or SID; `None` means directly
    /// linked to us). A description starting with `(H) ` hides the server.
    ///
    /// Returns true when this introduction registered the link, i.e. the
    /// server became the uplink.
    pub fn add_server(
        &mut self,
        name: &str,
        sid: Option<&str>,
        hops: u32,
        parent: Option<&str>,
        description: &str,
    ) -> Result<bool, StateError> {
        let key = fold(name);
        if self.servers.contains_key(&key) {
            return Err(StateError::DuplicateServer(name.to_string()));
        }
        if let Some(sid) = sid
            && self.sids.contains_key(sid)
        {
            return Err(StateError::DuplicateSid(sid.to_string()));
        }
        let parent_key = match parent {
            Some(p) => self
                .server_key(p)
                .ok_or_else(|| StateError::UnknownServer(p.to_string()))?,
            None => fold(&self.me.name),
        };

        let (description, hidden) = match description.strip_prefix("(H) ") {
            Some(rest) => (rest, true),
            None => (description, false),
        };
        let pre_synced = self
            .servers
            .get(&parent_key)
            .is_some_and(|p| !p.local && !p.flags.eob);

        let server = Server {
            name: name.to_string(),
            sid: sid.map(str::to_string),
            description: description.to_string(),
            hops,
            parent: Some(parent_key.clone()),
            children: Vec::new(),
            users: BTreeSet::new(),
            invisible_count: 0,
            oper_count: 0,
            flags: ServerFlags {
                eob: false,
                pre_synced,
                hidden,
            },
            local: false,
        };
        self.servers.insert(key.clone(), server);
        if let Some(sid) = sid {
            self.sids.insert(sid.to_string(), key.clone());
        }
        if let Some(p) = self.servers.get_mut(&parent_key) {
            p.children.push(key.clone());
        }

        let became_uplink = self.uplink.is_none() && self.is_local_key(&parent_key);
        if became_uplink {
            info!(server = %name, "Uplink registered");
            self.uplink = Some(key);
        } else {
            debug!(server = %name, hops, "server_add");
        }

        self.publish(Event::ServerAdd(name.to_string()));
        Ok(became_uplink)
    }

    /// Delete a server, its users and, recursively, every server behind it.
    pub fn delete_server(&mut self, name_or_sid: &str) -> Result<(), StateError> {
        let key = self
            .server_key(name_or_sid)
            .ok_or_else(|| StateError::UnknownServer(name_or_sid.to_string()))?;
        if self.is_local_key(&key) {
            return Err(StateError::DeleteSelf);
        }
        self.delete_server_key(&key);
        Ok(())
    }

    fn delete_server_key(&mut self, key: &str) {
        let Some(server) = self.servers.get(key) else {
            return;
        };
        let name = server.name.clone();
        let users: Vec<UserId> = server.users.iter().copied().collect();
        let children = server.children.clone();
        debug!(server = %name, users = users.len(), children = children.len(), "server_delete");

        self.publish(Event::ServerDelete(name));

        for id in users {
            self.delete_user(id);
        }
        for child in children {
            self.delete_server_key(&child);
        }

        if let Some(server) = self.servers.remove(key) {
            if let Some(sid) = &server.sid {
                self.sids.remove(sid);
            }
            if let Some(parent) = server.parent.as_ref().and_then(|p| self.servers.get_mut(p)) {
                parent.children.retain(|c| c != key);
            }
        }
        if self.uplink.as_deref() == Some(key) {
            self.uplink = None;
        }
    }

    /// Drop everything only reachable through the uplink.
    pub fn teardown_uplink(&mut self) {
        if let Some(key) = self.uplink.clone() {
            warn!(server = %key, "Uplink lost, removing its servers and users");
            self.delete_server_key(&key);
        }
    }

    /// Flag a server whose EOB follows its parent's. P10 servers announce
    /// this themselves in their `SERVER` line.
    pub fn mark_pre_synced(&mut self, name_or_sid: &str) -> Result<(), StateError> {
        let key = self
            .server_key(name_or_sid)
            .ok_or_else(|| StateError::UnknownServer(name_or_sid.to_string()))?;
        if let Some(server) = self.servers.get_mut(&key) {
            server.flags.pre_synced = true;
        }
        Ok(())
    }

    /// Mark a server as done bursting, along with children that were
    /// introduced while it was still bursting.
    pub fn server_eob(&mut self, name_or_sid: &str) -> Result<(), StateError> {
        let key = self
            .server_key(name_or_sid)
            .ok_or_else(|| StateError::UnknownServer(name_or_sid.to_string()))?;
        self.eob_key(&key);
        Ok(())
    }

    fn eob_key(&mut self, key: &str) {
        let Some(server) = self.servers.get_mut(key) else {
            return;
        };
        if server.flags.eob {
            return;
        }
        server.flags.eob = true;
        let name = server.name.clone();
        let children = server.children.clone();
        debug!(server = %name, "End of burst");
        self.publish(Event::ServerEob(name));

        for child in children {
            if self.servers.get(&child).is_some_and(|c| c.flags.pre_synced) {
                self.eob_key(&child);
            }
        }
    }
}
