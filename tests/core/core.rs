use clrvote::core::action::{ActionKind, Entry};
use clrvote::core::broker::{AUDIT_LOG_NAME, read_audit_log};
use clrvote::core::db::db_connect;
use clrvote::core::hash::{ActionHash, AgentPubKey};
use clrvote::core::schemas;
use clrvote::core::engine::EntryPayload;
use clrvote::core::store::{LinkFrom, RecordStore, Store};
use clrvote::core::sync::sync_views;
use clrvote::plugins::vote_item::{VoteItem, VoteItems};
use rusqlite::params;
use tempfile::{TempDir, tempdir};

fn open(name: &str) -> (TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path(), AgentPubKey::digest(name.as_bytes())).unwrap();
    (dir, store)
}

fn vote(weight: u8) -> VoteItem {
    VoteItem {
        ballot_name: "Budget".to_string(),
        vote_weight: weight,
    }
}

#[test]
fn open_creates_schema_and_is_repeatable() {
    let dir = tempdir().unwrap();
    let agent = AgentPubKey::digest(b"alice");
    let store = Store::open(dir.path(), agent).unwrap();
    assert!(store.db_path().exists());

    let conn = db_connect(&store.db_path().to_string_lossy()).unwrap();
    for table in ["entries", "actions", "links", "meta"] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "table {} missing", table);
    }
    let version: String = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(version, schemas::LEDGER_SCHEMA_VERSION);

    VoteItems::new(&store).create(&vote(1)).unwrap();
    let reopened = Store::open(dir.path(), agent).unwrap();
    assert_eq!(reopened.source_chain().unwrap().len(), 1);
}

#[test]
fn every_store_operation_is_audited() {
    let (_d, store) = open("alice");
    let votes = VoteItems::new(&store);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();
    votes.get_latest(&origin).unwrap();

    let events = read_audit_log(&store.root).unwrap();
    let ops: Vec<&str> = events.iter().map(|e| e.op.as_str()).collect();
    assert!(ops.contains(&"ledger.init"));
    assert!(ops.contains(&"ledger.commit_entry"));
    assert!(ops.contains(&"ledger.get_links"));
    assert!(events.iter().all(|e| e.db_id == schemas::LEDGER_DB_NAME));
    assert!(
        events
            .iter()
            .filter(|e| e.op == "ledger.commit_entry")
            .all(|e| e.status == "success" && e.actor == store.agent.to_hex())
    );
}

#[test]
fn failed_operations_are_audited_as_errors() {
    let (_d, store) = open("alice");
    let _ = store.commit_delete(&ActionHash::digest(b"nowhere"), &[]);
    let events = read_audit_log(&store.root).unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.op, "ledger.commit_delete");
    assert_eq!(last.status, "error");
}

#[test]
fn update_and_its_link_commit_together() {
    let (_d, store) = open("alice");
    let votes = VoteItems::new(&store);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();

    // Audit log unwritable: the operation reports an error after commit.
    let audit = store.root.join(AUDIT_LOG_NAME);
    std::fs::remove_file(&audit).unwrap();
    std::fs::create_dir(&audit).unwrap();
    let outcome = votes.update(&origin, &origin, &vote(2));
    assert!(outcome.is_err());
    std::fs::remove_dir(&audit).unwrap();

    let chain = store.source_chain().unwrap();
    assert_eq!(chain.len(), 2);
    let revisions = votes.get_all_revisions(&origin).unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(*revisions[1].action_hash(), chain[1].hash);
    assert_eq!(
        *votes.get_latest(&origin).unwrap().unwrap().action_hash(),
        chain[1].hash
    );
}

#[test]
fn delete_and_its_links_commit_together() {
    let (_d, store) = open("alice");
    let votes = VoteItems::new(&store);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();
    let revision = *votes
        .update(&origin, &origin, &vote(2))
        .unwrap()
        .action_hash();

    let audit = store.root.join(AUDIT_LOG_NAME);
    std::fs::remove_file(&audit).unwrap();
    std::fs::create_dir(&audit).unwrap();
    let links = [
        LinkFrom {
            base: origin,
            tag: VoteItem::DELETES_LINK,
        },
        LinkFrom {
            base: revision,
            tag: VoteItem::DELETES_LINK,
        },
    ];
    assert!(store.commit_delete(&revision, &links).is_err());
    std::fs::remove_dir(&audit).unwrap();

    let delete_hash = store.source_chain().unwrap()[2].hash;
    assert_eq!(votes.get_all_deletes(&origin).unwrap()[0].hash, delete_hash);
    assert_eq!(votes.get_all_deletes(&revision).unwrap()[0].hash, delete_hash);
}

#[test]
fn source_chain_is_linked_and_strictly_ordered() {
    let (_d, store) = open("alice");
    let votes = VoteItems::new(&store);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();
    let mut previous = origin;
    for w in 2..8 {
        previous = *votes.update(&origin, &previous, &vote(w)).unwrap().action_hash();
    }
    votes.delete(&origin).unwrap();

    let chain = store.source_chain().unwrap();
    assert_eq!(chain.len(), 8);
    assert_eq!(chain[0].action.prev_action, None);
    for (i, pair) in chain.windows(2).enumerate() {
        assert_eq!(pair[1].action.prev_action, Some(pair[0].hash));
        assert_eq!(pair[1].action.action_seq as usize, i + 1);
        assert!(pair[1].timestamp() > pair[0].timestamp());
        assert_eq!(pair[1].action.author, store.agent);
    }
    assert!(matches!(chain[7].action.kind, ActionKind::Delete { .. }));
}

#[test]
fn links_never_share_a_timestamp_with_their_author_actions() {
    let (_d, store) = open("alice");
    let votes = VoteItems::new(&store);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();
    let r1 = votes.update(&origin, &origin, &vote(2)).unwrap();
    let r2 = votes.update(&origin, r1.action_hash(), &vote(3)).unwrap();

    let links = store.get_links(&origin, "VoteItemUpdates").unwrap();
    assert_eq!(links.len(), 2);
    for link in &links {
        assert!(link.verify().unwrap());
        assert_ne!(link.timestamp, r1.timestamp());
        assert_ne!(link.timestamp, r2.timestamp());
    }
    let link_to_r2 = links.iter().find(|l| l.target == *r2.action_hash()).unwrap();
    assert!(link_to_r2.timestamp > r2.timestamp());
}

#[test]
fn identical_payloads_share_one_entry() {
    let (_d, store) = open("alice");
    let (h1, e1) = store
        .commit_entry("vote_item", Entry::from_payload(&vote(4)).unwrap())
        .unwrap();
    let (h2, e2) = store
        .commit_entry("vote_item", Entry::from_payload(&vote(4)).unwrap())
        .unwrap();
    assert_eq!(e1, e2);
    assert_ne!(h1, h2);

    let conn = db_connect(&store.db_path().to_string_lossy()).unwrap();
    let entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(entries, 1);
}

#[test]
fn tampered_action_body_is_detected_on_read() {
    let (_d, store) = open("alice");
    let origin = *VoteItems::new(&store).create(&vote(1)).unwrap().action_hash();
    let other = *VoteItems::new(&store).create(&vote(2)).unwrap().action_hash();

    // File `other`'s body under `origin`'s hash.
    let conn = db_connect(&store.db_path().to_string_lossy()).unwrap();
    let body: Vec<u8> = conn
        .query_row(
            "SELECT body FROM actions WHERE action_hash = ?1",
            params![other.to_hex()],
            |row| row.get(0),
        )
        .unwrap();
    conn.execute(
        "UPDATE actions SET body = ?1 WHERE action_hash = ?2",
        params![body, origin.to_hex()],
    )
    .unwrap();
    drop(conn);

    let err = store.get_record(&origin).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
}

#[test]
fn tampered_entry_is_detected_on_read() {
    let (_d, store) = open("alice");
    let record = VoteItems::new(&store).create(&vote(1)).unwrap();
    let entry_hash = *record.action().entry_hash().unwrap();

    let conn = db_connect(&store.db_path().to_string_lossy()).unwrap();
    conn.execute(
        "UPDATE entries SET bytes = ?1 WHERE entry_hash = ?2",
        params![Entry::from_payload(&vote(99)).unwrap().0, entry_hash.to_hex()],
    )
    .unwrap();
    drop(conn);

    let err = store.get_record(record.action_hash()).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
}

#[test]
fn tampered_snapshot_is_rejected_whole() {
    let (_a, alice) = open("alice");
    let (_b, bob) = open("bob");
    let votes = VoteItems::new(&alice);
    let origin = *votes.create(&vote(1)).unwrap().action_hash();
    votes.update(&origin, &origin, &vote(2)).unwrap();

    let mut snapshot = alice.export_view().unwrap();
    snapshot.links[0].tag = "BallotUpdates".to_string();
    let err = bob.import_view(&snapshot).unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");

    let mut snapshot = alice.export_view().unwrap();
    snapshot.actions[0].body.push(0);
    assert!(bob.import_view(&snapshot).is_err());

    // Nothing from either attempt landed.
    assert!(bob.export_view().unwrap().actions.is_empty());
    assert!(bob.export_view().unwrap().links.is_empty());
}

#[test]
fn sync_is_idempotent_and_only_grows() {
    let (_a, alice) = open("alice");
    let (_b, bob) = open("bob");
    let (_c, carol) = open("carol");
    VoteItems::new(&alice).create(&vote(1)).unwrap();
    VoteItems::new(&bob).create(&vote(2)).unwrap();

    let first = sync_views(&[&alice, &bob, &carol]).unwrap();
    assert!(!first.is_empty());
    let second = sync_views(&[&alice, &bob, &carol]).unwrap();
    assert!(second.is_empty());

    let views = [&alice, &bob, &carol].map(|s| s.export_view().unwrap());
    for v in &views {
        assert_eq!(v.actions.len(), 2);
        assert_eq!(v.entries.len(), 2);
    }

    // A later sync with a stale peer never removes anything.
    let (_d, dave) = open("dave");
    carol.sync_with(&dave).unwrap();
    assert_eq!(carol.export_view().unwrap().actions.len(), 2);
    assert_eq!(dave.export_view().unwrap().actions.len(), 2);
}

#[test]
fn replicated_chains_keep_their_author() {
    let (_a, alice) = open("alice");
    let (_b, bob) = open("bob");
    VoteItems::new(&alice).create(&vote(1)).unwrap();
    alice.sync_with(&bob).unwrap();

    assert!(bob.source_chain().unwrap().is_empty());
    let alice_chain = bob.author_chain(&alice.agent).unwrap();
    assert_eq!(alice_chain, alice.source_chain().unwrap());

    // Bob's own chain starts fresh at seq 0.
    VoteItems::new(&bob).create(&vote(2)).unwrap();
    assert_eq!(bob.source_chain().unwrap()[0].action.action_seq, 0);
}
