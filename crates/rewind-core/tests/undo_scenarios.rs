#![forbid(unsafe_code)]

//! End-to-end undo/redo scenarios over in-memory documents.
//!
//! Run:
//!   cargo test -p rewind-core --test undo_scenarios

use rewind_core::{
    ActionError, CommandSpec, ConfirmationPolicy, ConflictKind, Decision, FnAction, Target,
    UndoConfig, UndoError, UndoManager, UndoOutcome,
};
use rewind_harness::{HistoryEvent, RecordingObserver, ScriptedConfirmer, TextDocument};

fn typing() -> CommandSpec {
    CommandSpec::new("Typing").with_merge_id("typing")
}

fn applied(outcome: Result<UndoOutcome, UndoError>) -> String {
    match outcome {
        Ok(UndoOutcome::Applied { name }) => name,
        other => panic!("expected an applied step, got {other:?}"),
    }
}

// ============================================================================
// Basic round trips
// ============================================================================

#[test]
fn typing_test_then_undo_and_redo_everything() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    for ch in ["t", "e", "s", "t"] {
        doc.type_in(&mut undo, CommandSpec::new("Type"), ch);
    }
    assert_eq!(doc.text(), "test");

    for expected in ["tes", "te", "t", ""] {
        applied(undo.undo(doc.resource()));
        assert_eq!(doc.text(), expected);
    }
    assert!(!undo.is_undo_available(doc.resource()));
    assert_eq!(undo.undo(doc.resource()).unwrap(), UndoOutcome::Unavailable);

    for expected in ["t", "te", "tes", "test"] {
        applied(undo.redo(doc.resource()));
        assert_eq!(doc.text(), expected);
    }
    assert!(!undo.is_redo_available(Target::Global));
}

#[test]
fn new_command_clears_redo() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "a");
    doc.type_in(&mut undo, CommandSpec::new("Type"), "b");
    applied(undo.undo(Target::Global));
    assert!(undo.is_redo_available(doc.resource()));

    doc.type_in(&mut undo, CommandSpec::new("Type"), "c");
    assert!(!undo.is_redo_available(doc.resource()));
    assert!(!undo.is_redo_available(Target::Global));
    assert_eq!(doc.text(), "ac");
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn commands_with_same_merge_id_undo_as_one_step() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    for ch in ["h", "e", "y"] {
        doc.type_in(&mut undo, typing(), ch);
    }
    assert_eq!(undo.undo_depth(doc.resource()), 1);
    assert_eq!(undo.next_undo_name(doc.resource()), Some("Typing"));

    assert_eq!(applied(undo.undo(doc.resource())), "Typing");
    assert_eq!(doc.text(), "");
    applied(undo.redo(doc.resource()));
    assert_eq!(doc.text(), "hey");
}

#[test]
fn break_merge_starts_a_new_group() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "ab");
    undo.break_merge();
    doc.type_in(&mut undo, typing(), "cd");

    assert_eq!(undo.undo_depth(doc.resource()), 2);
    applied(undo.undo(doc.resource()));
    assert_eq!(doc.text(), "ab");
}

#[test]
fn undo_stops_merging_into_older_groups() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "a");
    doc.type_in(&mut undo, typing(), "b");
    applied(undo.undo(Target::Global));
    applied(undo.redo(Target::Global));
    doc.type_in(&mut undo, typing(), "c");

    assert_eq!(undo.undo_depth(Target::Global), 2);
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "ab");
}

#[test]
fn merged_group_keeps_first_name() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Insert").with_merge_id("edit"), "a");
    doc.type_in(&mut undo, CommandSpec::new("Delete").with_merge_id("edit"), "b");
    assert_eq!(undo.next_undo_name(Target::Global), Some("Insert"));
}

// ============================================================================
// Transparent actions
// ============================================================================

#[test]
fn transparent_action_joins_the_last_command() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "x");
    doc.type_transparently(&mut undo, ";");

    assert_eq!(undo.undo_depth(Target::Global), 1);
    applied(undo.undo(doc.resource()));
    assert_eq!(doc.text(), "");
    assert_eq!(applied(undo.redo(doc.resource())), "Type");
    assert_eq!(doc.text(), "x;");
}

#[test]
fn transparent_action_keeps_the_last_group_mergeable() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "a");
    doc.type_transparently(&mut undo, ";");
    doc.type_in(&mut undo, typing(), "b");

    assert_eq!(undo.undo_depth(Target::Global), 1);
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "");
}

#[test]
fn transparent_action_on_another_document_joins_the_group() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let mut undo = UndoManager::default();
    a.type_in(&mut undo, CommandSpec::new("Edit"), "1");
    b.type_transparently(&mut undo, "2");

    assert!(undo.is_undo_available(b.resource()));
    assert_eq!(undo.undo_depth(Target::Global), 1);

    applied(undo.undo(b.resource()));
    assert_eq!(a.text(), "");
    assert_eq!(b.text(), "");
}

#[test]
fn transparent_action_inside_a_command_is_part_of_it() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    undo.execute_command(CommandSpec::new("Type"), |undo| {
        undo.record(Box::new(doc.append("a")));
        doc.type_transparently(undo, "b");
    });

    assert_eq!(undo.undo_depth(Target::Global), 1);
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "");
}

#[test]
fn lone_transparent_group_is_absorbed_by_next_command() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_transparently(&mut undo, "x");
    assert!(!undo.is_undo_available(Target::Global));
    assert_eq!(undo.undo(Target::Global).unwrap(), UndoOutcome::Unavailable);

    doc.type_in(&mut undo, CommandSpec::new("Type"), "y");
    assert_eq!(undo.undo_depth(Target::Global), 1);
    assert_eq!(applied(undo.undo(Target::Global)), "Type");
    assert_eq!(doc.text(), "");
}

#[test]
fn transparent_group_is_undone_with_the_command_beneath_it() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "a");
    undo.break_merge();
    doc.type_transparently(&mut undo, ";");
    assert_eq!(undo.undo_depth(Target::Global), 2);

    assert_eq!(applied(undo.undo(Target::Global)), "Type");
    assert_eq!(doc.text(), "");
    applied(undo.redo(Target::Global));
    assert_eq!(doc.text(), "a;");
}

#[test]
fn transparent_action_does_not_clear_redo() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "a");
    doc.type_in(&mut undo, CommandSpec::new("Type"), "b");
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "a");

    doc.type_transparently(&mut undo, ";");
    assert!(undo.is_redo_available(doc.resource()));
    applied(undo.redo(doc.resource()));
    assert_eq!(doc.text(), "ab;");
}

#[test]
fn empty_transparent_scope_changes_nothing() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "a");
    undo.run_transparently(|_| {});
    doc.type_in(&mut undo, typing(), "b");
    assert_eq!(undo.undo_depth(Target::Global), 1);
    assert_eq!(undo.group_count(), 1);
}

// ============================================================================
// Compound commands
// ============================================================================

#[test]
fn compound_folds_commands_into_one_named_step() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "x");

    undo.start_compound("Reformat");
    doc.type_in(&mut undo, CommandSpec::new("Indent"), "  ");
    doc.type_in(&mut undo, CommandSpec::new("Wrap"), "\n");
    let group = undo.finish_compound();
    assert!(group.is_some());

    assert_eq!(undo.undo_depth(Target::Global), 2);
    assert_eq!(undo.next_undo_name(Target::Global), Some("Reformat"));
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "x");
}

#[test]
fn empty_compound_records_nothing() {
    let mut undo = UndoManager::default();
    undo.start_compound("Nothing");
    assert_eq!(undo.finish_compound(), None);
    assert_eq!(undo.group_count(), 0);
}

// ============================================================================
// Local and global histories
// ============================================================================

#[test]
fn local_undo_leaves_other_documents_alone() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let mut undo = UndoManager::default();
    a.type_in(&mut undo, CommandSpec::new("Edit A"), "a1");
    b.type_in(&mut undo, CommandSpec::new("Edit B"), "b1");

    assert_eq!(applied(undo.undo(a.resource())), "Edit A");
    assert_eq!(a.text(), "");
    assert_eq!(b.text(), "b1");
    assert_eq!(undo.next_undo_name(Target::Global), Some("Edit B"));
    assert_eq!(undo.next_redo_name(Target::Global), Some("Edit A"));
}

#[test]
fn undo_conflicts_when_another_document_changed_since() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let mut undo = UndoManager::default();
    undo.execute_command(CommandSpec::new("Rename"), |undo| {
        undo.record(Box::new(a.append("x")));
        undo.record(Box::new(b.append("x")));
    });
    b.type_in(&mut undo, CommandSpec::new("Type"), "y");

    let err = undo.undo(a.resource()).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::AlreadyChanged));
    match &err {
        UndoError::Conflict { resources, .. } => assert_eq!(resources, &[b.resource().clone()]),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(
        err.to_string(),
        "files affected by this action have been already changed: b.txt"
    );
    assert_eq!(a.text(), "x");
    assert_eq!(b.text(), "xy");
    assert_eq!(undo.undo_depth(a.resource()), 1);
}

#[test]
fn limits_evict_oldest_groups_per_stack() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::new(UndoConfig::new(3, 5));
    for digit in 0..10 {
        doc.type_in(&mut undo, CommandSpec::new("Type"), &digit.to_string());
    }
    assert_eq!(undo.undo_depth(doc.resource()), 3);
    assert_eq!(undo.undo_depth(Target::Global), 5);
    assert_eq!(undo.group_count(), 5);

    for _ in 0..3 {
        applied(undo.undo(doc.resource()));
    }
    assert_eq!(undo.undo(doc.resource()).unwrap(), UndoOutcome::Unavailable);

    applied(undo.undo(Target::Global));
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "01234");
    assert_eq!(undo.undo(Target::Global).unwrap(), UndoOutcome::Unavailable);
}

#[test]
fn local_limit_holds_with_global_commands_in_between() {
    let doc = TextDocument::new("notes.txt");
    let other = TextDocument::new("project.toml");
    let mut undo = UndoManager::new(UndoConfig::new(3, 20));
    for digit in 0..4 {
        doc.type_in(&mut undo, CommandSpec::new(format!("Type {digit}")), &digit.to_string());
        undo.execute_command(CommandSpec::new("Rename"), |undo| {
            undo.mark_global();
            undo.record(Box::new(other.append("r")));
        });
    }
    assert_eq!(undo.undo_depth(doc.resource()), 3);
    assert_eq!(undo.undo_depth(Target::Global), 8);

    for digit in (1..4).rev() {
        assert_eq!(applied(undo.undo(doc.resource())), format!("Type {digit}"));
    }
    assert_eq!(undo.undo(doc.resource()).unwrap(), UndoOutcome::Unavailable);
    assert_eq!(doc.text(), "0");
    assert_eq!(other.text(), "rrrr");
}

// ============================================================================
// Confirmation
// ============================================================================

#[test]
fn global_command_asks_before_undo() {
    let doc = TextDocument::new("notes.txt");
    let confirmer = ScriptedConfirmer::new(Decision::Proceed);
    confirmer.answer(Decision::Abort);
    let mut undo = UndoManager::builder().confirmer(confirmer.clone()).build();

    undo.execute_command(CommandSpec::new("Create file"), |undo| {
        undo.mark_global();
        undo.record(Box::new(doc.append("new")));
    });

    assert_eq!(undo.undo(Target::Global).unwrap(), UndoOutcome::Declined);
    assert_eq!(doc.text(), "new");
    assert_eq!(undo.undo_depth(Target::Global), 1);

    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "");
    assert_eq!(
        confirmer.asked(),
        vec![
            "Undo 'Create file' affecting notes.txt?",
            "Undo 'Create file' affecting notes.txt?",
        ]
    );
}

#[test]
fn silent_policy_never_asks() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let confirmer = ScriptedConfirmer::new(Decision::Abort);
    let mut undo = UndoManager::builder().confirmer(confirmer.clone()).build();

    undo.execute_command(
        CommandSpec::new("Replace all").with_policy(ConfirmationPolicy::Silent),
        |undo| {
            undo.record(Box::new(a.append("1")));
            undo.record(Box::new(b.append("2")));
        },
    );
    applied(undo.undo(Target::Global));
    assert!(confirmer.asked().is_empty());
}

#[test]
fn single_document_edit_is_silent_by_default() {
    let doc = TextDocument::new("notes.txt");
    let confirmer = ScriptedConfirmer::new(Decision::Abort);
    let mut undo = UndoManager::builder().confirmer(confirmer.clone()).build();
    doc.type_in(&mut undo, CommandSpec::new("Type"), "a");

    applied(undo.undo(doc.resource()));
    applied(undo.redo(doc.resource()));
    assert!(confirmer.asked().is_empty());
}

#[test]
fn redo_asks_too() {
    let doc = TextDocument::new("notes.txt");
    let confirmer = ScriptedConfirmer::new(Decision::Proceed);
    let mut undo = UndoManager::builder().confirmer(confirmer.clone()).build();
    doc.type_in(
        &mut undo,
        CommandSpec::new("Type").with_policy(ConfirmationPolicy::Ask),
        "a",
    );

    applied(undo.undo(doc.resource()));
    confirmer.answer(Decision::Abort);
    assert_eq!(undo.redo(doc.resource()).unwrap(), UndoOutcome::Declined);
    assert_eq!(doc.text(), "");
    assert_eq!(confirmer.asked().last().map(String::as_str), Some("Redo 'Type' affecting notes.txt?"));
}

// ============================================================================
// Failing actions
// ============================================================================

#[test]
fn failed_undo_rolls_back_the_whole_step() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    undo.execute_command(CommandSpec::new("Save"), |undo| {
        undo.record(Box::new(doc.append("a")));
        undo.record(Box::new(FnAction::new(
            vec![doc.resource().clone()],
            || Err(ActionError::new("disk full")),
            || Ok(()),
        )));
    });
    undo.break_merge();
    doc.type_transparently(&mut undo, ";");

    let err = undo.undo(Target::Global).unwrap_err();
    match &err {
        UndoError::Action { source, .. } => assert_eq!(source.message(), "disk full"),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(doc.text(), "a;");
    assert!(undo.is_undo_available(Target::Global));
    assert!(!undo.is_redo_available(Target::Global));
}

// ============================================================================
// Lifecycle and links
// ============================================================================

#[test]
fn disposal_purges_local_groups_and_keeps_global_ones() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let observer = RecordingObserver::new();
    let mut undo = UndoManager::builder().observer(observer.clone()).build();

    a.type_in(&mut undo, CommandSpec::new("Edit A"), "1");
    b.type_in(&mut undo, CommandSpec::new("Edit B"), "2");
    undo.execute_command(CommandSpec::new("Move"), |undo| {
        undo.mark_global();
        undo.record(Box::new(a.append("3")));
    });
    assert_eq!(undo.group_count(), 3);

    undo.on_resource_disposed(a.resource());
    assert_eq!(undo.group_count(), 2);
    assert!(!undo.is_undo_available(a.resource()));
    assert!(undo.is_undo_available(b.resource()));
    assert_eq!(undo.next_undo_name(Target::Global), Some("Move"));
    assert_eq!(
        observer.events().last(),
        Some(&HistoryEvent::Invalidated {
            resource: "a.txt".to_string(),
            purged: 1,
        })
    );
}

#[test]
fn created_resource_has_an_empty_history() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    undo.on_resource_created(doc.resource());
    assert!(undo.stacks().has_local(doc.resource()));
    assert!(!undo.is_undo_available(doc.resource()));
    assert_eq!(undo.undo_depth(doc.resource()), 0);
}

#[test]
fn forced_external_change_blocks_undo() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let mut undo = UndoManager::default();
    b.type_in(&mut undo, CommandSpec::new("Edit B"), "b");
    a.type_in(&mut undo, CommandSpec::new("Edit A"), "a");
    a.overwrite_externally("changed on disk");
    undo.on_resource_externally_changed(a.resource(), true);

    let err = undo.undo(a.resource()).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::ExternallyChanged));
    let err = undo.undo(Target::Global).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::ExternallyChanged));
    assert_eq!(a.text(), "changed on disk");

    applied(undo.undo(b.resource()));
    assert_eq!(b.text(), "");
}

#[test]
fn unforced_external_change_invalidates_history() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "a");
    undo.on_resource_externally_changed(doc.resource(), false);

    assert!(!undo.is_undo_available(doc.resource()));
    assert!(undo.stacks().has_local(doc.resource()));
    assert_eq!(undo.group_count(), 0);

    doc.type_in(&mut undo, typing(), "b");
    assert_eq!(undo.undo_depth(doc.resource()), 1);
}

#[test]
fn linked_copy_shares_the_original_history() {
    let doc = TextDocument::new("notes.txt");
    let copy = doc.copy_view("notes.txt (split)");
    let mut undo = UndoManager::default();
    undo.link_resources(copy.resource().clone(), doc.resource().clone())
        .unwrap();

    copy.type_in(&mut undo, CommandSpec::new("Type"), "a");
    assert!(undo.is_undo_available(doc.resource()));
    assert_eq!(undo.undo_depth(copy.resource()), 1);

    undo.on_resource_disposed(copy.resource());
    assert!(undo.is_undo_available(doc.resource()));
    applied(undo.undo(doc.resource()));
    assert_eq!(doc.text(), "");
}

#[test]
fn copy_keeps_the_history_when_the_original_is_disposed() {
    let doc = TextDocument::new("notes.txt");
    let copy = doc.copy_view("notes.txt (split)");
    let mut undo = UndoManager::default();
    undo.link_resources(copy.resource().clone(), doc.resource().clone())
        .unwrap();
    doc.type_in(&mut undo, CommandSpec::new("Type a"), "a");
    copy.type_in(&mut undo, CommandSpec::new("Type b"), "b");

    undo.on_resource_disposed(doc.resource());
    assert_eq!(undo.resolve_resource(copy.resource()), copy.resource().clone());
    assert_eq!(undo.undo_depth(copy.resource()), 2);
    assert!(undo.is_undo_available(Target::Global));
    assert_eq!(undo.group_count(), 2);

    assert_eq!(applied(undo.undo(copy.resource())), "Type b");
    assert_eq!(applied(undo.undo(copy.resource())), "Type a");
    assert_eq!(copy.text(), "");
    assert_eq!(applied(undo.redo(Target::Global)), "Type a");
    assert_eq!(copy.text(), "a");
}

#[test]
fn remaining_copies_link_to_the_surviving_copy() {
    let doc = TextDocument::new("notes.txt");
    let first = doc.copy_view("notes.txt (1)");
    let second = doc.copy_view("notes.txt (2)");
    let mut undo = UndoManager::default();
    undo.link_resources(first.resource().clone(), doc.resource().clone())
        .unwrap();
    undo.link_resources(second.resource().clone(), doc.resource().clone())
        .unwrap();
    second.type_in(&mut undo, CommandSpec::new("Type"), "x");

    undo.on_resource_disposed(doc.resource());
    assert_eq!(undo.resolve_resource(second.resource()), first.resource().clone());
    assert_eq!(undo.undo_depth(first.resource()), 1);
    applied(undo.undo(second.resource()));
    assert_eq!(second.text(), "");
}

#[test]
fn disposing_a_middle_copy_relinks_its_copies() {
    let doc = TextDocument::new("notes.txt");
    let middle = doc.copy_view("notes.txt (1)");
    let leaf = doc.copy_view("notes.txt (2)");
    let mut undo = UndoManager::default();
    undo.link_resources(middle.resource().clone(), doc.resource().clone())
        .unwrap();
    undo.link_resources(leaf.resource().clone(), middle.resource().clone())
        .unwrap();
    leaf.type_in(&mut undo, CommandSpec::new("Type"), "x");

    undo.on_resource_disposed(middle.resource());
    assert_eq!(undo.resolve_resource(leaf.resource()), doc.resource().clone());
    assert_eq!(undo.undo_depth(doc.resource()), 1);
    applied(undo.undo(leaf.resource()));
    assert_eq!(doc.text(), "");
}

#[test]
fn relinking_into_a_cycle_is_refused() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let z = TextDocument::new("z.txt");
    let mut undo = UndoManager::default();
    undo.link_resources(a.resource().clone(), z.resource().clone())
        .unwrap();
    undo.link_resources(b.resource().clone(), a.resource().clone())
        .unwrap();

    let err = undo
        .link_resources(a.resource().clone(), b.resource().clone())
        .unwrap_err();
    assert!(err.to_string().contains("cycle"));
    a.type_in(&mut undo, CommandSpec::new("Type"), "x");
    assert!(undo.is_undo_available(b.resource()));
    assert_eq!(undo.resolve_resource(b.resource()), z.resource().clone());
}

#[test]
fn invalid_links_are_refused() {
    let a = TextDocument::new("a.txt");
    let b = TextDocument::new("b.txt");
    let mut undo = UndoManager::default();

    let err = undo
        .link_resources(a.resource().clone(), a.resource().clone())
        .unwrap_err();
    assert!(matches!(err, UndoError::InvalidLink { .. }));

    undo.link_resources(a.resource().clone(), b.resource().clone())
        .unwrap();
    let err = undo
        .link_resources(b.resource().clone(), a.resource().clone())
        .unwrap_err();
    assert!(err.to_string().contains("cycle"));
    assert_eq!(undo.unlink_resource(a.resource()), Some(b.resource().clone()));
}

// ============================================================================
// Observers and housekeeping
// ============================================================================

#[test]
fn observer_sees_history_events_in_order() {
    let doc = TextDocument::new("notes.txt");
    let observer = RecordingObserver::new();
    let mut undo = UndoManager::builder().observer(observer.clone()).build();

    doc.type_in(&mut undo, CommandSpec::new("Type"), "a");
    applied(undo.undo(Target::Global));
    applied(undo.redo(Target::Global));

    assert_eq!(
        observer.events(),
        vec![
            HistoryEvent::Recorded {
                name: "Type".to_string()
            },
            HistoryEvent::Undone {
                names: vec!["Type".to_string()]
            },
            HistoryEvent::Redone {
                names: vec!["Type".to_string()]
            },
        ]
    );
}

#[test]
fn clear_drops_every_group() {
    let doc = TextDocument::new("notes.txt");
    let mut undo = UndoManager::default();
    doc.type_in(&mut undo, typing(), "a");
    undo.clear();

    assert_eq!(undo.group_count(), 0);
    assert!(!undo.is_undo_available(Target::Global));
    doc.type_in(&mut undo, typing(), "b");
    assert_eq!(undo.undo_depth(Target::Global), 1);
    applied(undo.undo(Target::Global));
    assert_eq!(doc.text(), "a");
}
