use clrvote::core::hash::{ActionHash, AgentPubKey};
use clrvote::core::store::Store;
use clrvote::core::sync::sync_views;
use clrvote::core::time::Timestamp;
use clrvote::plugins::agent_profile::{AgentProfile, AgentProfiles};
use clrvote::plugins::ballot::{Ballot, Ballots};
use clrvote::plugins::vote_item::{VoteItem, VoteItems};
use tempfile::{TempDir, tempdir};

fn open(name: &str) -> (TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path(), AgentPubKey::digest(name.as_bytes())).unwrap();
    (dir, store)
}

fn sample_ballot(store: &Store, title: &str) -> Ballot {
    Ballot {
        title: title.to_string(),
        description: "Lorem ipsum dolor sit amet, consectetur adipiscing elit.".to_string(),
        created_by: store.agent,
        created_at: Timestamp(1674053334548000),
    }
}

#[test]
fn create_update_and_read_ballot_across_views() {
    let (_a, alice) = open("alice");
    let (_b, bob) = open("bob");
    let alice_ballots = Ballots::new(&alice);
    let bob_ballots = Ballots::new(&bob);

    let record = alice_ballots.create(&sample_ballot(&alice, "Budget")).unwrap();
    let origin = *record.action_hash();
    let revised = sample_ballot(&alice, "Budget 2027");
    let updated = alice_ballots.update(&origin, &origin, &revised).unwrap();

    sync_views(&[&alice, &bob]).unwrap();

    let latest = bob_ballots.get_latest(&origin).unwrap().unwrap();
    assert_eq!(latest, updated);
    assert_eq!(bob_ballots.payload_of(&latest).unwrap(), revised);
    assert_eq!(bob_ballots.get_original(&origin).unwrap().unwrap(), record);
}

#[test]
fn hash_of_another_kind_is_malformed() {
    let (_d, store) = open("alice");
    let profile = AgentProfiles::new(&store)
        .create(&AgentProfile {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            password: "pw".into(),
            region: "north".into(),
        })
        .unwrap();
    let ballots = Ballots::new(&store);

    let err = ballots.get_latest(profile.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
    let err = ballots.get_original(profile.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
    let err = ballots.delete(profile.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
    let err = ballots.get_all_deletes(profile.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
    let err = ballots.get_oldest_delete(profile.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
}

#[test]
fn updating_across_kinds_is_rejected() {
    let (_d, store) = open("alice");
    let vote = VoteItems::new(&store)
        .create(&VoteItem {
            ballot_name: "Budget".into(),
            vote_weight: 10,
        })
        .unwrap();
    let err = Ballots::new(&store)
        .update(
            vote.action_hash(),
            vote.action_hash(),
            &sample_ballot(&store, "Budget"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");
}

#[test]
fn delete_action_is_not_a_valid_previous() {
    let (_d, store) = open("alice");
    let ballots = Ballots::new(&store);
    let origin = *ballots
        .create(&sample_ballot(&store, "Budget"))
        .unwrap()
        .action_hash();
    let delete_hash = ballots.delete(&origin).unwrap();

    let err = ballots
        .update(&origin, &delete_hash, &sample_ballot(&store, "Budget v2"))
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");

    let err = ballots.get_latest(&delete_hash).unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");

    // Deleting a delete is rejected as well.
    let err = ballots.delete(&delete_hash).unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");
}

#[test]
fn unknown_previous_is_rejected_without_side_effects() {
    let (_d, store) = open("alice");
    let ballots = Ballots::new(&store);
    let origin = *ballots
        .create(&sample_ballot(&store, "Budget"))
        .unwrap()
        .action_hash();
    let chain_len = store.source_chain().unwrap().len();

    let err = ballots
        .update(
            &origin,
            &ActionHash::digest(b"nowhere"),
            &sample_ballot(&store, "Budget v2"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");
    assert_eq!(store.source_chain().unwrap().len(), chain_len);
    assert_eq!(ballots.get_all_revisions(&origin).unwrap().len(), 1);

    let err = ballots.delete(&ActionHash::digest(b"nowhere")).unwrap_err();
    assert_eq!(err.kind(), "invalid_chain_reference");
}

#[test]
fn blank_title_is_rejected() {
    let (_d, store) = open("alice");
    let err = Ballots::new(&store)
        .create(&sample_ballot(&store, "   "))
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
}

#[test]
fn update_records_origin_and_previous() {
    let (_d, store) = open("alice");
    let ballots = Ballots::new(&store);
    let h0 = *ballots
        .create(&sample_ballot(&store, "v0"))
        .unwrap()
        .action_hash();
    let h1 = *ballots
        .update(&h0, &h0, &sample_ballot(&store, "v1"))
        .unwrap()
        .action_hash();
    let r2 = ballots
        .update(&h0, &h1, &sample_ballot(&store, "v2"))
        .unwrap();

    match &r2.action().kind {
        clrvote::core::action::ActionKind::Update {
            original_action,
            previous_action,
            entry_type,
            ..
        } => {
            assert_eq!(*original_action, h0);
            assert_eq!(*previous_action, h1);
            assert_eq!(entry_type, "ballot");
        }
        other => panic!("expected an Update action, got {:?}", other),
    }
}
