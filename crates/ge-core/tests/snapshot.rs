#![cfg(not(target_arch = "wasm32"))]

use std::io::Cursor;

use ge_core::cmd::{self, encode};
use ge_core::{
    DisplayListId, FakeTickSource, GeEngine, GeListStatus, RecordingGeBackend,
    RecordingInterruptSink, SnapshotError, DISPLAY_LIST_STACK_DEPTH,
};
use ge_memory::PspMemory;
use ge_snapshot::{
    save_snapshot, CommandCacheState, DisplayListRecord, EngineState, SnapshotSource,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const LIST: u32 = 0x0880_0000;
const FAR_STALL: u32 = 0x0890_0000;

fn program() -> PspMemory {
    let mut mem = PspMemory::default();
    mem.write_words(
        LIST,
        &[
            encode(cmd::BASE, 0x08_0000),
            encode(cmd::CALL, 0x80_0020),
            encode(cmd::PRIM, 1),
            encode(cmd::SIGNAL, 0x02_0055),
            encode(cmd::END, 0),
            encode(cmd::FINISH, 0x77),
            encode(cmd::END, 0),
            encode(cmd::NOP, 0),
            // Subroutine at LIST + 0x20.
            encode(cmd::PRIM, 2),
            encode(cmd::PRIM, 3),
            encode(cmd::RET, 0),
        ],
    )
    .unwrap();
    mem
}

struct Harness {
    engine: GeEngine,
    backend: RecordingGeBackend,
    sink: RecordingInterruptSink,
}

impl Harness {
    fn new() -> Self {
        let mut engine = GeEngine::default();
        let backend = RecordingGeBackend::new();
        let sink = RecordingInterruptSink::new();
        engine.set_backend(Box::new(backend.clone()));
        engine.set_interrupt_sink(Box::new(sink.clone()));
        engine.set_tick_source(Box::new(FakeTickSource::new(1_000)));
        Self {
            engine,
            backend,
            sink,
        }
    }
}

struct Edited {
    engine: EngineState,
    lists: Vec<DisplayListRecord>,
}

impl Edited {
    fn from_engine(engine: &GeEngine) -> Self {
        Self {
            engine: SnapshotSource::engine_state(engine),
            lists: SnapshotSource::display_lists(engine),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = Cursor::new(Vec::new());
        save_snapshot(&mut w, self).unwrap();
        w.into_inner()
    }
}

impl SnapshotSource for Edited {
    fn engine_state(&self) -> EngineState {
        self.engine.clone()
    }

    fn display_lists(&self) -> Vec<DisplayListRecord> {
        self.lists.clone()
    }

    fn command_cache(&self) -> CommandCacheState {
        CommandCacheState::default()
    }
}

#[test]
fn restored_stalled_list_finishes_like_the_original() {
    let mem = program();

    let mut original = Harness::new();
    let id = original.engine.enqueue_list(&mem, LIST, LIST + 0x24, 4, false);
    assert_eq!(original.engine.list_sync(id, 1), Ok(GeListStatus::Stalling));
    assert_eq!(original.engine.display_list(id).unwrap().stack_depth(), 1);

    let bytes = original.engine.save_state().unwrap();
    original.backend.clear();

    let mut restored = Harness::new();
    restored.engine.load_state(&bytes).unwrap();
    assert_eq!(restored.engine.current_list_id(), Some(id));
    assert_eq!(restored.engine.list_sync(id, 1), Ok(GeListStatus::Stalling));
    assert_eq!(restored.engine.save_state().unwrap(), bytes);

    original.engine.update_stall(&mem, id, FAR_STALL);
    restored.engine.update_stall(&mem, id, FAR_STALL);

    assert_eq!(restored.backend.events(), original.backend.events());
    assert_eq!(restored.sink.raised(), original.sink.raised());
    assert_eq!(restored.sink.raised().len(), 2);
    assert_eq!(
        restored.engine.cycles_executed(),
        original.engine.cycles_executed()
    );
    assert_eq!(restored.engine.draw_sync(1), Ok(GeListStatus::Completed));
    assert_eq!(original.engine.draw_sync(1), Ok(GeListStatus::Completed));
    assert_eq!(
        restored.engine.save_state().unwrap(),
        original.engine.save_state().unwrap()
    );
}

#[test]
fn restored_engine_keeps_allocating_fresh_ids() {
    let mem = program();
    let mut original = Harness::new();
    original.engine.enqueue_list(&mem, LIST, LIST, -1, false);
    original.engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut restored = Harness::new();
    restored
        .engine
        .load_state(&original.engine.save_state().unwrap())
        .unwrap();

    let next = restored.engine.enqueue_list(&mem, LIST, LIST, -1, false);
    assert_eq!(next, DisplayListId(3));
    assert_eq!(restored.engine.queue_len(), 3);
}

#[test]
fn command_cache_survives_restore() {
    let mem = program();
    let mut original = Harness::new();
    original.engine.enqueue_list(&mem, LIST, LIST + 0x24, -1, false);

    let mut restored = Harness::new();
    restored
        .engine
        .load_state(&original.engine.save_state().unwrap())
        .unwrap();

    assert_eq!(
        restored.engine.command_cache(),
        original.engine.command_cache()
    );
    assert_eq!(
        restored.engine.command_cache().get(cmd::PRIM),
        encode(cmd::PRIM, 2)
    );
}

#[test]
fn pending_interrupts_survive_restore() {
    let mut mem = PspMemory::default();
    mem.write_words(LIST, &[encode(cmd::FINISH, 0x0009), encode(cmd::END, 0)])
        .unwrap();

    let mut original = Harness::new();
    original.engine.interrupt_service_begin();
    original.engine.enqueue_list(&mem, LIST, FAR_STALL, 1, false);

    let mut restored = Harness::new();
    restored
        .engine
        .load_state(&original.engine.save_state().unwrap())
        .unwrap();
    assert!(restored.engine.interrupt_running());
    assert_eq!(restored.engine.pending_interrupts().len(), 1);

    restored.engine.interrupt_service_end(&mem);
    assert_eq!(restored.sink.raised().len(), 1);
    assert_eq!(restored.sink.raised()[0].token, 0x0009);
}

#[test]
fn duplicate_ids_are_rejected_and_leave_the_engine_untouched() {
    let mem = program();
    let mut engine = Harness::new().engine;
    engine.enqueue_list(&mem, LIST, LIST, -1, false);
    engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut edited = Edited::from_engine(&engine);
    edited.lists[1].id = edited.lists[0].id;
    let bytes = edited.to_bytes();

    let mut target = Harness::new().engine;
    let fresh = target.enqueue_list(&mem, LIST + 8, LIST + 8, -1, false);
    let before = target.save_state().unwrap();

    let err = target.load_state(&bytes).unwrap_err();
    assert!(matches!(err, SnapshotError::DuplicateListId(1)));
    assert_eq!(target.save_state().unwrap(), before);
    assert_eq!(target.current_list_id(), Some(fresh));
}

#[test]
fn oversized_stack_is_rejected() {
    let mem = program();
    let mut engine = Harness::new().engine;
    engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut edited = Edited::from_engine(&engine);
    edited.lists[0].stack = vec![LIST; DISPLAY_LIST_STACK_DEPTH + 1];

    let err = engine.load_state(&edited.to_bytes()).unwrap_err();
    assert!(matches!(err, SnapshotError::StackTooDeep { id: 1, .. }));
}

#[test]
fn id_generator_behind_a_live_list_is_rejected() {
    let mem = program();
    let mut engine = Harness::new().engine;
    engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut edited = Edited::from_engine(&engine);
    edited.engine.next_list_id = 1;

    let err = engine.load_state(&edited.to_bytes()).unwrap_err();
    assert!(matches!(err, SnapshotError::Corrupt(_)));
    assert_eq!(engine.queue_len(), 1);
}

#[test]
fn unknown_state_code_is_rejected() {
    let mem = program();
    let mut engine = Harness::new().engine;
    engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut edited = Edited::from_engine(&engine);
    edited.lists[0].state = 9;

    let err = engine.load_state(&edited.to_bytes()).unwrap_err();
    assert!(matches!(err, SnapshotError::Corrupt(_)));
}

#[test]
fn missing_current_list_restores_as_none() {
    let mem = program();
    let mut engine = Harness::new().engine;
    engine.enqueue_list(&mem, LIST, LIST, -1, false);

    let mut edited = Edited::from_engine(&engine);
    edited.engine.current_list_id = 77;
    edited.engine.next_list_id = 100;

    engine.load_state(&edited.to_bytes()).unwrap();
    assert_eq!(engine.current_list_id(), None);
    assert_eq!(engine.draw_sync(1), Ok(GeListStatus::Completed));
    assert_eq!(engine.queue_len(), 1);
}

#[test]
fn garbage_is_rejected() {
    let mut engine = GeEngine::default();
    let err = engine.load_state(b"definitely not a snapshot").unwrap_err();
    assert!(matches!(err, SnapshotError::InvalidMagic));
}

proptest! {
    #[test]
    fn failed_restore_never_changes_the_engine(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mem = program();
        let mut engine = Harness::new().engine;
        engine.enqueue_list(&mem, LIST, LIST + 0x24, 2, false);
        let before = engine.save_state().unwrap();

        if engine.load_state(&data).is_err() {
            prop_assert_eq!(engine.save_state().unwrap(), before);
        }
    }
}
