use skillswap_db::Database;
use skillswap_db::queries::skills::SkillQuery;
use uuid::Uuid;

fn db() -> Database {
    Database::open_in_memory().unwrap()
}

fn seed_user(db: &Database, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.create_user(&id, name, &format!("{name}@example.com"), "hash")
        .unwrap();
    id
}

fn seed_skill(db: &Database, owner: &str, title: &str, kind: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.insert_skill(
        &id, owner, title, "a description", "general", kind, "[]", None, None, None,
    )
    .unwrap();
    id
}

// -- Conversations --

#[test]
fn conversation_pair_is_unique_regardless_of_direction() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    let first = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();
    // Second create with the pair reversed converges on the same row.
    let second = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &bob, &alice)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(db.conversation_between(&bob, &alice).unwrap().is_some());
}

#[test]
fn insert_message_moves_last_message_pointer() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let conv = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();

    let m1 = db
        .insert_message(&Uuid::new_v4().to_string(), &conv.id, &alice, &bob, "hi")
        .unwrap();
    let m2 = db
        .insert_message(&Uuid::new_v4().to_string(), &conv.id, &bob, &alice, "hey")
        .unwrap();

    let conv = db.get_conversation(&conv.id).unwrap().unwrap();
    assert_eq!(conv.last_message_id.as_deref(), Some(m2.id.as_str()));
    assert_ne!(m1.id, m2.id);
}

#[test]
fn deleting_a_message_recomputes_the_pointer() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let conv = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();

    let m1 = db
        .insert_message(&Uuid::new_v4().to_string(), &conv.id, &alice, &bob, "one")
        .unwrap();
    let m2 = db
        .insert_message(&Uuid::new_v4().to_string(), &conv.id, &alice, &bob, "two")
        .unwrap();

    db.delete_message(&m2.id).unwrap();

    // Pointer falls back to the previous message, and the deleted one is
    // gone from the log.
    let conv_row = db.get_conversation(&conv.id).unwrap().unwrap();
    assert_eq!(conv_row.last_message_id.as_deref(), Some(m1.id.as_str()));
    assert!(db.get_message(&m2.id).unwrap().is_none());
    assert_eq!(db.count_messages(&conv.id).unwrap(), 1);

    // Deleting the only remaining message clears the pointer.
    db.delete_message(&m1.id).unwrap();
    let conv_row = db.get_conversation(&conv.id).unwrap().unwrap();
    assert_eq!(conv_row.last_message_id, None);
}

#[test]
fn delete_conversation_cascades_messages() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let conv = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();
    let m = db
        .insert_message(&Uuid::new_v4().to_string(), &conv.id, &alice, &bob, "hi")
        .unwrap();

    db.delete_conversation(&conv.id).unwrap();

    assert!(db.get_conversation(&conv.id).unwrap().is_none());
    assert!(db.get_message(&m.id).unwrap().is_none());
}

#[test]
fn unread_counts_and_mark_read() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let conv = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();

    for body in ["one", "two", "three"] {
        db.insert_message(&Uuid::new_v4().to_string(), &conv.id, &alice, &bob, body)
            .unwrap();
    }
    db.insert_message(&Uuid::new_v4().to_string(), &conv.id, &bob, &alice, "reply")
        .unwrap();

    // Bob sees three unread; Alice sees one.
    let bobs = db.list_conversations(&bob).unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].unread_count, 3);
    assert_eq!(bobs[0].peer_username, "alice");
    assert_eq!(bobs[0].last_message.as_ref().unwrap().body, "reply");

    let alices = db.list_conversations(&alice).unwrap();
    assert_eq!(alices[0].unread_count, 1);

    assert_eq!(db.mark_read(&conv.id, &bob).unwrap(), 3);
    let bobs = db.list_conversations(&bob).unwrap();
    assert_eq!(bobs[0].unread_count, 0);

    // Marking again is a no-op.
    assert_eq!(db.mark_read(&conv.id, &bob).unwrap(), 0);
}

#[test]
fn message_pages_walk_newest_first() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let conv = db
        .get_or_create_conversation(&Uuid::new_v4().to_string(), &alice, &bob)
        .unwrap();

    for i in 0..5 {
        db.insert_message(
            &Uuid::new_v4().to_string(),
            &conv.id,
            &alice,
            &bob,
            &format!("m{i}"),
        )
        .unwrap();
    }

    let page = db.get_messages(&conv.id, 2, None).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].body, "m4");
    assert_eq!(page[1].body, "m3");
}

// -- Chat requests --

#[test]
fn live_request_lookup_is_direction_agnostic() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    let id = Uuid::new_v4().to_string();
    db.create_chat_request(&id, &alice, &bob).unwrap();

    assert!(db.live_request_between(&alice, &bob).unwrap().is_some());
    assert!(db.live_request_between(&bob, &alice).unwrap().is_some());
    assert!(!db.accepted_request_between(&alice, &bob).unwrap());

    db.set_chat_request_status(&id, "accepted").unwrap();
    assert!(db.accepted_request_between(&bob, &alice).unwrap());

    // A rejected request is no longer live.
    db.set_chat_request_status(&id, "rejected").unwrap();
    assert!(db.live_request_between(&alice, &bob).unwrap().is_none());
}

// -- OTP --

#[test]
fn otp_rejects_mismatch_and_expiry_and_reuse() {
    let db = db();
    let alice = seed_user(&db, "alice");

    db.set_otp(&alice, "123456", "verify_email", 10).unwrap();

    // Wrong code, wrong purpose.
    assert!(!db.consume_otp(&alice, "654321", "verify_email").unwrap());
    assert!(!db.consume_otp(&alice, "123456", "reset_password").unwrap());

    // Right code works exactly once.
    assert!(db.consume_otp(&alice, "123456", "verify_email").unwrap());
    assert!(!db.consume_otp(&alice, "123456", "verify_email").unwrap());

    // An already-expired code never validates.
    db.set_otp(&alice, "111111", "reset_password", -1).unwrap();
    assert!(!db.consume_otp(&alice, "111111", "reset_password").unwrap());
}

#[test]
fn pending_email_applies_once() {
    let db = db();
    let alice = seed_user(&db, "alice");

    db.set_pending_email(&alice, "new@example.com").unwrap();
    assert!(db.apply_pending_email(&alice).unwrap());

    let user = db.get_user_by_id(&alice).unwrap().unwrap();
    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.pending_email, None);

    // Nothing pending anymore.
    assert!(!db.apply_pending_email(&alice).unwrap());
}

#[test]
fn pending_email_refused_when_address_got_taken() {
    let db = db();
    let alice = seed_user(&db, "alice");
    seed_user(&db, "taken"); // owns taken@example.com

    db.set_pending_email(&alice, "taken@example.com").unwrap();
    assert!(!db.apply_pending_email(&alice).unwrap());
    let user = db.get_user_by_id(&alice).unwrap().unwrap();
    assert_eq!(user.email, "alice@example.com");
}

// -- Reports --

#[test]
fn duplicate_reports_are_refused() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let skill = seed_skill(&db, &bob, "Welding", "offer");

    let inserted = db
        .insert_report(
            &Uuid::new_v4().to_string(),
            &alice,
            &bob,
            Some(&skill),
            None,
            "spam",
        )
        .unwrap();
    assert!(inserted);

    // Same reporter, same target, same anchor: refused.
    let duplicate = db
        .insert_report(
            &Uuid::new_v4().to_string(),
            &alice,
            &bob,
            Some(&skill),
            None,
            "spam again",
        )
        .unwrap();
    assert!(!duplicate);

    // A different anchor (no skill) is a distinct report.
    let different = db
        .insert_report(&Uuid::new_v4().to_string(), &alice, &bob, None, None, "rude")
        .unwrap();
    assert!(different);

    assert_eq!(db.list_reports(Some("open")).unwrap().len(), 2);
}

#[test]
fn resolving_reports() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    let id = Uuid::new_v4().to_string();
    db.insert_report(&id, &alice, &bob, None, None, "rude").unwrap();

    assert!(db.set_report_status(&id, "resolved").unwrap());
    assert!(db.list_reports(Some("open")).unwrap().is_empty());
    assert_eq!(db.list_reports(Some("resolved")).unwrap().len(), 1);

    assert!(!db.set_report_status("missing", "resolved").unwrap());
}

// -- Credits --

#[test]
fn credits_never_move_without_a_ledger_row() {
    let db = db();
    let alice = seed_user(&db, "alice");

    assert!(
        db.adjust_credits(&Uuid::new_v4().to_string(), &alice, 25, "signup_bonus", None)
            .unwrap()
    );
    assert_eq!(db.get_credits(&alice).unwrap(), 25);

    let ledger = db.credit_ledger(&alice, 10).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, 25);
    assert_eq!(ledger[0].reason, "signup_bonus");
}

#[test]
fn overdraft_is_refused_and_nothing_is_journaled() {
    let db = db();
    let alice = seed_user(&db, "alice");

    let ok = db
        .adjust_credits(&Uuid::new_v4().to_string(), &alice, -5, "oops", None)
        .unwrap();
    assert!(!ok);
    assert_eq!(db.get_credits(&alice).unwrap(), 0);
    assert!(db.credit_ledger(&alice, 10).unwrap().is_empty());
}

#[test]
fn transfer_journals_both_sides() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    db.adjust_credits(&Uuid::new_v4().to_string(), &alice, 30, "signup_bonus", None)
        .unwrap();

    let moved = db
        .transfer_credits(
            (
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
            ),
            &alice,
            &bob,
            20,
            "swap_completed",
            None,
        )
        .unwrap();
    assert!(moved);
    assert_eq!(db.get_credits(&alice).unwrap(), 10);
    assert_eq!(db.get_credits(&bob).unwrap(), 20);
    assert_eq!(db.credit_ledger(&bob, 10).unwrap()[0].delta, 20);

    // A short balance refuses the whole transfer.
    let moved = db
        .transfer_credits(
            (
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
            ),
            &alice,
            &bob,
            999,
            "swap_completed",
            None,
        )
        .unwrap();
    assert!(!moved);
    assert_eq!(db.get_credits(&alice).unwrap(), 10);
    assert_eq!(db.get_credits(&bob).unwrap(), 20);
}

// -- Derived counters --

#[test]
fn user_stats_are_derived_from_the_tables() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    let offered = seed_skill(&db, &alice, "Guitar", "offer");
    seed_skill(&db, &alice, "Spanish", "request");
    let requested = seed_skill(&db, &bob, "Baking", "offer");

    let stats = db.user_stats(&alice).unwrap();
    assert_eq!(stats.skills_offered, 1);
    assert_eq!(stats.skills_wanted, 1);
    assert_eq!(stats.swaps_completed, 0);
    assert_eq!(stats.rating, None);

    // Completing a proposal shows up in the derived count for both sides.
    let proposal = Uuid::new_v4().to_string();
    db.insert_proposal(&proposal, &alice, &bob, &offered, &requested, 0, None)
        .unwrap();
    db.set_proposal_status(&proposal, "completed").unwrap();

    assert_eq!(db.user_stats(&alice).unwrap().swaps_completed, 1);
    assert_eq!(db.user_stats(&bob).unwrap().swaps_completed, 1);

    // Ratings aggregate per rated user.
    db.insert_rating(&Uuid::new_v4().to_string(), &proposal, &bob, &alice, 4, None)
        .unwrap();
    let stats = db.user_stats(&alice).unwrap();
    assert_eq!(stats.rating, Some(4.0));
    assert_eq!(stats.rating_count, 1);
}

// -- Skill listing --

#[test]
fn skill_filters_compose() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    seed_skill(&db, &alice, "Guitar lessons", "offer");
    seed_skill(&db, &bob, "Guitar repair", "request");
    seed_skill(&db, &bob, "Baking", "offer");

    let all = db
        .list_skills(&SkillQuery {
            limit: 50,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(all.len(), 3);

    let guitars = db
        .list_skills(&SkillQuery {
            keyword: Some("guitar"),
            limit: 50,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(guitars.len(), 2);

    let offers = db
        .list_skills(&SkillQuery {
            keyword: Some("guitar"),
            kind: Some("offer"),
            limit: 50,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].title, "Guitar lessons");
    assert_eq!(offers[0].owner_username, "alice");
}

#[test]
fn match_candidates_exclude_the_requester() {
    let db = db();
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    seed_skill(&db, &alice, "My own offer", "offer");
    seed_skill(&db, &bob, "Bob's offer", "offer");
    seed_skill(&db, &bob, "Bob's request", "request");

    let candidates = db.match_candidates(&alice).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].title, "Bob's offer");
}
