//! End-to-end P10 link flows driven through the dispatch pipeline.

mod common;

use common::{TestLink, service_block};
use slirc_services::state::MemberModes;

fn status(t: &TestLink, channel: &str, nick: &str) -> MemberModes {
    let id = t.net.find_user(nick).unwrap().id;
    *t.net.find_channel(channel).unwrap().member(id).unwrap()
}

fn with_users(services: &str) -> TestLink {
    let mut t = TestLink::p10(services);
    t.ok("AB S leaf.test 2 0 1700000100 J10 CD]]] +h6 :Leaf");
    t.ok("CD EB");
    for (nick, numeric) in [("alice", "ABAAA"), ("bob", "ABAAB"), ("carol", "CDAAA")] {
        t.ok(&format!(
            "{} N {nick} 2 1700000000 {nick} example.com +i B]AAAB {numeric} :{nick}",
            &numeric[..2]
        ));
    }
    t.reset();
    t
}

#[test]
fn test_handshake_reaches_registered_state() {
    let t = with_users("");
    let hub = t.net.uplink().unwrap();
    assert_eq!(hub.name, "hub.test");
    assert_eq!(hub.sid.as_deref(), Some("AB"));
    assert!(hub.flags.eob);
    assert!(!t.link.is_bursting());
    assert!(t.net.find_server("CD").unwrap().flags.eob);
    assert_eq!(t.net.user_count(), 3);
}

#[test]
fn test_burst_merge_across_ts_reset() {
    let mut t = with_users(&service_block("ChanServ", &["#test"]));
    t.ok("AB B #test 100 +nt ABAAA:o,ABAAB");
    assert!(status(&t, "#test", "alice").op);
    t.reset();

    t.ok("CD B #test 50 +s CDAAA");

    let chan = t.net.find_channel("#test").unwrap();
    assert_eq!(chan.ts, 50);
    assert_eq!(chan.mode_string(), "+s");
    for nick in ["alice", "bob", "carol"] {
        assert!(status(&t, "#test", nick).is_empty(), "{nick} kept status");
    }
    assert!(status(&t, "#test", "ChanServ").op);
    assert_eq!(t.sent(), vec!["SV M #test +o SVAAA"]);
}

#[test]
fn test_service_collision_kills_newcomer() {
    let mut t = with_users(&service_block("NickServ", &[]));
    t.ok("CD N NickServ 2 1600000000 evil example.com +i B]AAAB CDAAB :Not really");

    assert_eq!(
        t.sent(),
        vec!["SV D CDAAB :services.test (Nick collision with services (new))"]
    );
    assert!(t.net.find_user("CDAAB").is_none());
    assert_eq!(t.net.find_user("NickServ").unwrap().uid.as_deref(), Some("SVAAA"));
}

#[test]
fn test_killed_service_comes_back() {
    let mut t = with_users(&service_block("OperServ", &["#opers"]));
    t.ok("ABAAA D SVAAA :hub.test!alice (go away)");

    let sent = t.sent();
    assert!(sent[0].starts_with("SV WA :"));
    assert!(sent[0].contains("killed service OperServ"));
    assert!(sent.iter().any(|l| l.starts_with("SV N OperServ 1 ")));
    let operserv = t.net.find_user("OperServ").unwrap();
    assert_eq!(operserv.uid.as_deref(), Some("SVAAB"));
    assert!(status(&t, "#opers", "OperServ").op);
    assert!(t.link.close_request().is_none());
}

#[test]
fn test_kill_fight_stops_the_link() {
    let mut t = with_users(&service_block("OperServ", &[]));
    for _ in 0..10 {
        let uid = t.net.find_user("OperServ").unwrap().uid.clone().unwrap();
        t.ok(&format!("ABAAA D {uid} :fight"));
        if t.link.close_request().is_some() {
            break;
        }
    }
    let close = t.link.close_request().expect("kill fight detected");
    assert!(close.shutdown);
}

#[test]
fn test_leaf_split_removes_its_users() {
    let mut t = with_users("");
    t.ok("AB B #mixed 100 ABAAA,CDAAA");
    t.ok("AB SQ leaf.test 0 :Split");

    assert!(t.net.find_server("CD").is_none());
    assert!(t.net.find_user("carol").is_none());
    let chan = t.net.find_channel("#mixed").unwrap();
    assert_eq!(chan.members.len(), 1);
    assert_eq!(t.net.user_count(), 2);
}

#[test]
fn test_topic_and_modes_from_users() {
    let mut t = with_users("");
    t.ok("ABAAA C #chat 100");
    t.ok("ABAAB J #chat 100");
    t.ok("ABAAA T #chat 100 1700000500 :Welcome");
    t.ok("ABAAA M #chat +ov ABAAB ABAAB");
    t.ok("ABAAA M #chat +b *!*@bad.example");

    let chan = t.net.find_channel("#chat").unwrap();
    let topic = chan.topic.as_ref().unwrap();
    assert_eq!(topic.text, "Welcome");
    assert_eq!(topic.set_at, 1_700_000_500);
    assert_eq!(chan.bans.len(), 1);
    assert!(chan.find_ban('b', "*!*@bad.example").is_some());
    let bob = status(&t, "#chat", "bob");
    assert!(bob.op && bob.voice);
}
