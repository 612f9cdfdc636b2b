//! Collision Resolver.
//!
//! Decides what happens when a nickname is claimed while another client
//! already holds it. The rules are the timestamp rules every TS-based IRC
//! daemon applies, so both sides of a netjoin reach the same answer without
//! talking to each other:
//!
//! - a local client colliding is a caller bug and is refused;
//! - a remote client colliding with a local service is killed when it has a
//!   UID, otherwise the TS tie-break is evaluated and nothing is sent;
//! - two remote clients colliding is a ghost: both go.
//!
//! This module only produces verdicts and wire effects. Applying them to the
//! indexes is [`Network::introduce_user`](super::Network::introduce_user)'s
//! and [`Network::change_nick`](super::Network::change_nick)'s job.

use slirc_link::fold_eq;

use super::Effect;

/// One side of a nickname collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim<'a> {
    pub nick: &'a str,
    pub uid: Option<&'a str>,
    pub user: &'a str,
    pub host: &'a str,
    pub ts: i64,
    /// Name of the server the claim comes from.
    pub server: &'a str,
    /// Owned by this daemon.
    pub local: bool,
}

impl Claim<'_> {
    fn same_mask(&self, other: &Claim<'_>) -> bool {
        fold_eq(self.user, other.user) && fold_eq(self.host, other.host)
    }
}

/// Outcome of a collision between an existing holder and a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A local client tried to take a nick that is in use.
    LocalCollision,
    /// Holder is a local service and the candidate carries a UID.
    KillCandidate,
    /// Holder is a local service and the candidate has no UID.
    TieBreak { candidate_wins: bool },
    /// Both claims are remote.
    Ghost,
}

/// TS tie-break between a local holder and a UID-less candidate. The
/// candidate only wins with a strictly older TS and a different user@host.
pub fn candidate_wins(existing: &Claim<'_>, candidate: &Claim<'_>) -> bool {
    candidate.ts < existing.ts && !candidate.same_mask(existing)
}

pub fn resolve(existing: &Claim<'_>, candidate: &Claim<'_>) -> Verdict {
    if candidate.local {
        Verdict::LocalCollision
    } else if existing.local {
        match candidate.uid {
            Some(_) => Verdict::KillCandidate,
            None => Verdict::TieBreak {
                candidate_wins: candidate_wins(existing, candidate),
            },
        }
    } else {
        Verdict::Ghost
    }
}

fn kill(target: &str, reason: &str) -> Effect {
    Effect::Kill {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}

/// Wire effects of a collision on introduction. The candidate is never
/// created; on a ghost the existing holder is deleted too.
pub fn introduction_effects(
    verdict: Verdict,
    existing: &Claim<'_>,
    candidate: &Claim<'_>,
) -> Vec<Effect> {
    match verdict {
        Verdict::LocalCollision | Verdict::TieBreak { .. } => Vec::new(),
        Verdict::KillCandidate => match candidate.uid {
            Some(uid) => vec![kill(uid, "Nick collision with services (new)")],
            None => Vec::new(),
        },
        Verdict::Ghost => {
            let mut effects = vec![Effect::Wallops(format!(
                "Server {} is introducing nick {} which already exists on {}",
                candidate.server, candidate.nick, existing.server
            ))];
            match (candidate.uid, existing.uid) {
                (Some(new), Some(old)) => {
                    effects.push(kill(new, "Ghost detected via nick collision (new)"));
                    effects.push(kill(old, "Ghost detected via nick collision (old)"));
                }
                _ => effects.push(kill(candidate.nick, "Ghost detected via nick collision")),
            }
            effects
        }
    }
}

/// Wire effects of a collision on rename. `renamer` carries the old nick;
/// every verdict other than [`Verdict::LocalCollision`] removes the renaming
/// client, and a ghost removes the holder as well.
pub fn rename_effects(
    verdict: Verdict,
    holder: &Claim<'_>,
    renamer: &Claim<'_>,
    new_nick: &str,
) -> Vec<Effect> {
    const SERVICES: &str = "Nick change collision with services";
    match verdict {
        Verdict::LocalCollision => Vec::new(),
        Verdict::KillCandidate => vec![kill(renamer.uid.unwrap_or(renamer.nick), SERVICES)],
        Verdict::TieBreak { .. } => vec![kill(renamer.nick, SERVICES)],
        Verdict::Ghost => {
            let mut effects = vec![Effect::Wallops(format!(
                "Server {} is sending nick change from {} to {} which already exists on {}",
                renamer.server, renamer.nick, new_nick, holder.server
            ))];
            match (renamer.uid, holder.uid) {
                (Some(new), Some(old)) => {
                    effects.push(kill(new, "Ghost detected via nick change collision (new)"));
                    effects.push(kill(old, "Ghost detected via nick change collision (old)"));
                }
                _ => {
                    effects.push(kill(renamer.nick, "Ghost detected via nick change collision"));
                    effects.push(kill(new_nick, "Ghost detected via nick change collision"));
                }
            }
            effects
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim<'a>(uid: Option<&'a str>, ts: i64, user: &'a str, local: bool) -> Claim<'a> {
        Claim {
            nick: "alice",
            uid,
            user,
            host: "example.com",
            ts,
            server: if local { "services.test" } else { "hub.test" },
            local,
        }
    }

    #[test]
    fn test_local_candidate_is_refused() {
        let existing = claim(Some("0AAAAAAAA"), 100, "alice", false);
        let candidate = claim(None, 100, "alice", true);
        assert_eq!(resolve(&existing, &candidate), Verdict::LocalCollision);
        assert!(introduction_effects(Verdict::LocalCollision, &existing, &candidate).is_empty());
    }

    #[test]
    fn test_uid_candidate_against_service_is_killed_alone() {
        let service = claim(Some("0SVAAAAAA"), 100, "alice", true);
        let candidate = claim(Some("UID002"), 50, "alice2", false);
        let verdict = resolve(&service, &candidate);
        assert_eq!(verdict, Verdict::KillCandidate);
        assert_eq!(
            introduction_effects(verdict, &service, &candidate),
            vec![Effect::Kill {
                target: "UID002".into(),
                reason: "Nick collision with services (new)".into()
            }]
        );
    }

    #[test]
    fn test_tie_break_truth_table() {
        let service = claim(None, 100, "alice", true);
        // older and different mask: candidate wins
        assert!(candidate_wins(&service, &claim(None, 50, "bob", false)));
        // equal TS: holder kept
        assert!(!candidate_wins(&service, &claim(None, 100, "bob", false)));
        // newer TS: holder kept
        assert!(!candidate_wins(&service, &claim(None, 150, "bob", false)));
        // same mask (case-insensitive): holder kept
        assert!(!candidate_wins(&service, &claim(None, 50, "ALICE", false)));
    }

    #[test]
    fn test_tie_break_sends_nothing_either_way() {
        let service = claim(None, 100, "alice", true);
        for candidate in [claim(None, 50, "bob", false), claim(None, 150, "bob", false)] {
            let verdict = resolve(&service, &candidate);
            assert!(matches!(verdict, Verdict::TieBreak { .. }));
            assert!(introduction_effects(verdict, &service, &candidate).is_empty());
        }
    }

    #[test]
    fn test_ghost_with_uids_kills_both_ids() {
        let existing = claim(Some("1AAAAAAAA"), 100, "alice", false);
        let mut candidate = claim(Some("2AAAAAAAA"), 90, "alice", false);
        candidate.server = "leaf.test";
        let verdict = resolve(&existing, &candidate);
        assert_eq!(verdict, Verdict::Ghost);
        let effects = introduction_effects(verdict, &existing, &candidate);
        assert_eq!(
            effects[0],
            Effect::Wallops(
                "Server leaf.test is introducing nick alice which already exists on hub.test".into()
            )
        );
        assert_eq!(effects.len(), 3);
        assert!(matches!(&effects[1], Effect::Kill { target, .. } if target == "2AAAAAAAA"));
        assert!(matches!(&effects[2], Effect::Kill { target, .. } if target == "1AAAAAAAA"));
    }

    #[test]
    fn test_ghost_without_uids_kills_by_nick() {
        let existing = claim(None, 100, "alice", false);
        let candidate = claim(None, 90, "alice", false);
        let effects = introduction_effects(Verdict::Ghost, &existing, &candidate);
        assert_eq!(effects.len(), 2);
        assert_eq!(
            effects[1],
            Effect::Kill {
                target: "alice".into(),
                reason: "Ghost detected via nick collision".into()
            }
        );
    }

    #[test]
    fn test_rename_into_service_kills_renamer() {
        let service = claim(None, 100, "alice", true);
        let mut renamer = claim(None, 50, "bob", false);
        renamer.nick = "bob";
        let verdict = resolve(&service, &renamer);
        let effects = rename_effects(verdict, &service, &renamer, "alice");
        assert_eq!(
            effects,
            vec![Effect::Kill {
                target: "bob".into(),
                reason: "Nick change collision with services".into()
            }]
        );

        renamer.uid = Some("1AAAAAAAB");
        let effects = rename_effects(resolve(&service, &renamer), &service, &renamer, "alice");
        assert!(matches!(&effects[0], Effect::Kill { target, .. } if target == "1AAAAAAAB"));
    }

    #[test]
    fn test_rename_ghost_without_uids_kills_both_nicks() {
        let holder = claim(None, 100, "alice", false);
        let mut renamer = claim(None, 50, "bob", false);
        renamer.nick = "bob";
        let effects = rename_effects(Verdict::Ghost, &holder, &renamer, "alice");
        assert_eq!(effects.len(), 3);
        assert!(matches!(&effects[1], Effect::Kill { target, .. } if target == "bob"));
        assert!(matches!(&effects[2], Effect::Kill { target, .. } if target == "alice"));
    }
}
