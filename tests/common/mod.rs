//! Integration test common infrastructure.
//!
//! Provides an in-process link harness that feeds wire lines through the
//! dispatch pipeline, and a scripted fake uplink for session tests.

pub mod link;
pub mod uplink;

#[allow(unused_imports)]
pub use link::TestLink;
#[allow(unused_imports)]
pub use uplink::FakeUplink;

/// Services configuration for tests. `dialect` is `"ts6"` or `"p10"`;
/// `services` is appended verbatim (any `[[service]]` blocks).
#[allow(dead_code)]
pub fn config_toml(dialect: &str, port: u16, services: &str) -> String {
    format!(
        r#"
[server]
name = "services.test"
description = "Test Services"
sid = "0SV"
numeric = "SV"

[uplink]
name = "hub.test"
hostname = "127.0.0.1"
port = {port}
send_password = "linkpass"
connect_timeout = 5
ping_interval = 30
ping_timeout = 90
reconnect_delay = 1

[protocol]
dialect = "{dialect}"

{services}
"#
    )
}

/// One pseudo-client block.
#[allow(dead_code)]
pub fn service_block(nick: &str, channels: &[&str]) -> String {
    let channels: Vec<String> = channels.iter().map(|c| format!("\"{c}\"")).collect();
    format!(
        r#"
[[service]]
nick = "{nick}"
user = "{user}"
host = "services.test"
gecos = "{nick} service"
channels = [{channels}]
"#,
        user = nick.to_lowercase(),
        channels = channels.join(", ")
    )
}
