//! Uplink session lifecycle against an in-process fake hub.

mod common;

use std::time::Duration;

use common::{FakeUplink, config_toml, service_block};
use slirc_services::{Config, Services, UplinkError};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;

type Session = JoinHandle<(Services, UplinkError)>;

fn services(dialect: &str) -> Services {
    let toml = config_toml(dialect, 6667, &service_block("NickServ", &["#services"]));
    Services::new(Config::from_toml(&toml).unwrap()).unwrap()
}

/// Start a session on one end of a duplex pipe; the test plays the hub on
/// the other.
fn start(mut services: Services) -> (Session, FakeUplink<DuplexStream>) {
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let session = tokio::spawn(async move {
        let reason = services.run(ours).await;
        (services, reason)
    });
    (session, FakeUplink::new(theirs))
}

/// Read our login and burst, then register the hub.
async fn link_ts6(hub: &mut FakeUplink<DuplexStream>) -> Vec<String> {
    let mut burst = hub.recv_until(|l| l.starts_with("SVINFO ")).await.unwrap();
    hub.send("PASS linkpass TS 6 :0HB").await.unwrap();
    hub.send("CAPAB :QS EX IE KLN UNKLN ENCAP TB EUID").await.unwrap();
    hub.send("SERVER hub.test 1 :Hub").await.unwrap();
    burst.extend(
        hub.recv_until(|l| l == "PING :services.test")
            .await
            .unwrap(),
    );
    burst
}

#[tokio::test]
async fn test_ts6_link_and_burst() {
    let (session, mut hub) = start(services("ts6"));
    let burst = link_ts6(&mut hub).await;

    assert_eq!(burst[0], "PASS linkpass TS 6 :0SV");
    assert!(burst.iter().any(|l| l.starts_with("SERVER services.test 1 ")));
    assert!(
        burst
            .iter()
            .any(|l| l.starts_with(":0SV UID NickServ 1 ") && l.contains(" 0SVAAAAAA "))
    );
    assert!(burst.iter().any(|l| l.contains(" SJOIN ") && l.contains("#services")));

    hub.send(":0HB PING :hub.test").await.unwrap();
    hub.recv_until(|l| l == ":0SV PONG services.test hub.test")
        .await
        .unwrap();

    hub.send(":0HB PONG hub.test :services.test").await.unwrap();
    hub.recv_until(|l| l.starts_with(":0SV WALLOPS :Finished synchronizing with network"))
        .await
        .unwrap();

    drop(hub);
    let (services, reason) = session.await.unwrap();
    assert!(matches!(reason, UplinkError::Closed | UplinkError::Frame(_)));
    assert!(services.network().uplink().is_none());
}

#[tokio::test]
async fn test_p10_link_and_burst() {
    let (session, mut hub) = start(services("p10"));
    let burst = hub.recv_until(|l| l == "SV EB").await.unwrap();
    assert_eq!(burst[0], "PASS :linkpass");
    assert!(burst[1].starts_with("SERVER services.test 1 "));
    assert!(burst.iter().any(|l| l.starts_with("SV N NickServ 1 ") && l.contains(" SVAAA ")));
    assert!(burst.iter().any(|l| l.starts_with("SVAAA C #services ")));

    hub.send("PASS :linkpass").await.unwrap();
    hub.send("SERVER hub.test 1 1700000000 1700000100 J10 AB]]] +h6 :Hub")
        .await
        .unwrap();
    hub.send("AB N alice 1 1700000000 alice example.com +i B]AAAB ABAAA :Alice")
        .await
        .unwrap();
    hub.send("AB EB").await.unwrap();
    hub.recv_until(|l| l == "SV EA").await.unwrap();
    hub.recv_until(|l| l.starts_with("SV WA :Finished synchronizing with network"))
        .await
        .unwrap();

    hub.send("AB G !1700000200.5 services.test 1700000200.5")
        .await
        .unwrap();
    hub.recv_until(|l| l == "SV Z SV !1700000200.5").await.unwrap();

    drop(hub);
    let (services, _) = session.await.unwrap();
    // Remote users go with the uplink; our own clients stay.
    assert!(services.network().find_user("alice").is_none());
    assert!(services.network().find_user("NickServ").is_some());
}

#[tokio::test]
async fn test_reconnect_reuses_service_clients() {
    let (session, mut hub) = start(services("ts6"));
    let first = link_ts6(&mut hub).await;
    drop(hub);
    let (services, _) = session.await.unwrap();

    let (session, mut hub) = start(services);
    let second = link_ts6(&mut hub).await;
    drop(hub);
    let (services, _) = session.await.unwrap();

    let uid_line = |burst: &[String]| {
        burst
            .iter()
            .find(|l| l.starts_with(":0SV UID NickServ "))
            .cloned()
            .unwrap()
    };
    assert!(uid_line(&first).contains(" 0SVAAAAAA "));
    assert!(uid_line(&second).contains(" 0SVAAAAAA "));
    assert_eq!(services.network().local_users().count(), 1);
}

#[tokio::test]
async fn test_bad_lines_do_not_end_the_session() {
    let (session, mut hub) = start(services("ts6"));
    link_ts6(&mut hub).await;

    hub.send(":nobody.test PRIVMSG #x :hi").await.unwrap();
    hub.send(":0HB FROBNICATE").await.unwrap();
    hub.send(":0HB UID short").await.unwrap();
    hub.send(&format!(":0HB PING :{}", "x".repeat(600))).await.unwrap();
    hub.send("ERROR :Something odd").await.unwrap();
    hub.send(":0HB PING :still.here").await.unwrap();
    hub.recv_until(|l| l == ":0SV PONG services.test still.here")
        .await
        .unwrap();

    drop(hub);
    let (_, reason) = session.await.unwrap();
    assert!(matches!(reason, UplinkError::Closed | UplinkError::Frame(_)));
}

#[tokio::test(start_paused = true)]
async fn test_silent_uplink_times_out() {
    let (session, mut hub) = start(services("ts6"));
    link_ts6(&mut hub).await;

    // Nothing more from the hub: keepalives go out every 30s and the link
    // is declared dead once 90s pass without a line.
    let (services, reason) = session.await.unwrap();
    match reason {
        UplinkError::PingTimeout(idle) => assert!(idle >= Duration::from_secs(90)),
        other => panic!("expected a ping timeout, got {other:?}"),
    }
    assert!(services.network().uplink().is_none());
    assert_eq!(services.network().server_count(), 1);
    assert!(services.network().find_user("NickServ").is_some());

    let keepalives = hub.drain().await.unwrap();
    assert!(keepalives.iter().filter(|l| *l == "PING :services.test").count() >= 2);
}
