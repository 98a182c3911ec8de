#![cfg(not(target_arch = "wasm32"))]

//! End-to-end runs: guest memory, the interpreter and the snapshot container together.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use ge_core::cmd::{self, encode};
use ge_core::{
    DisplayListId, FakeTickSource, GeEngine, GeInterrupt, GeListStatus, RecordingGeBackend,
    RecordingInterruptSink,
};
use ge_memory::{PspMemory, VRAM_BASE};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const MAIN: u32 = 0x0880_0000;
const SUB: u32 = 0x0880_1000;
const SECOND: u32 = 0x0400_0100;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A main list that draws through a subroutine, signals, and finishes, plus a second list in
/// VRAM that jumps relative to ORIGIN.
fn scene() -> PspMemory {
    let mut mem = PspMemory::default();
    mem.write_words(
        MAIN,
        &[
            encode(cmd::VERTEXTYPE, 0x00_011C),
            encode(cmd::BASE, 0x08_0000),
            encode(cmd::CALL, SUB & 0x00FF_FFFF),
            encode(cmd::PRIM, 0x03_0004),
            encode(cmd::SIGNAL, 0x02_0020),
            encode(cmd::END, 0),
            encode(cmd::PRIM, 0x03_0008),
            encode(cmd::FINISH, 0x0030),
            encode(cmd::END, 0),
        ],
    )
    .unwrap();
    mem.write_words(
        SUB,
        &[
            encode(cmd::VADDR, 0x00_2000),
            encode(cmd::PRIM, 0x03_0003),
            encode(cmd::RET, 0),
        ],
    )
    .unwrap();
    mem.write_words(
        SECOND,
        &[
            // BASE is shared with the main list through the command cache.
            encode(cmd::BASE, 0),
            encode(cmd::ORIGIN, 0),
            encode(cmd::JUMP, 0x00_0010),
            encode(cmd::PRIM, 0xFF),
            encode(cmd::PRIM, 0xFF),
            // SECOND + 0x14, reached relative to ORIGIN.
            encode(cmd::PRIM, 0x04_0001),
            encode(cmd::FINISH, 0x0040),
            encode(cmd::END, 0),
        ],
    )
    .unwrap();
    mem
}

struct Rig {
    engine: GeEngine,
    backend: RecordingGeBackend,
    sink: RecordingInterruptSink,
}

fn rig() -> Rig {
    let mut engine = GeEngine::default();
    let backend = RecordingGeBackend::new();
    let sink = RecordingInterruptSink::new();
    engine.set_backend(Box::new(backend.clone()));
    engine.set_interrupt_sink(Box::new(sink.clone()));
    engine.set_tick_source(Box::new(FakeTickSource::new(0)));
    Rig {
        engine,
        backend,
        sink,
    }
}

fn prims(backend: &RecordingGeBackend) -> Vec<u32> {
    backend
        .executed()
        .into_iter()
        .filter(|&(op, _, _)| op == cmd::PRIM)
        .map(|(_, data, _)| data)
        .collect()
}

#[test]
fn snapshot_file_round_trip_resumes_mid_subroutine() {
    init_tracing();
    let mem = scene();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ge.snap");

    // Reference run without a snapshot.
    let mut reference = rig();
    let main_ref = reference.engine.enqueue_list(&mem, MAIN, SUB + 8, 1, false);
    let second_ref = reference.engine.enqueue_list(&mem, SECOND, VRAM_BASE + 0x1000, 2, false);
    assert_eq!(reference.engine.list_sync(second_ref, 1), Ok(GeListStatus::Queued));
    reference.engine.update_stall(&mem, main_ref, MAIN + 0x100);

    // Same run, interrupted by a snapshot written to disk while stalled on the RET.
    let mut before = rig();
    let main_id = before.engine.enqueue_list(&mem, MAIN, SUB + 8, 1, false);
    let second_id = before.engine.enqueue_list(&mem, SECOND, VRAM_BASE + 0x1000, 2, false);
    assert_eq!(before.engine.display_list(main_id).unwrap().stack_depth(), 1);
    {
        let mut w = BufWriter::new(File::create(&path).unwrap());
        before.engine.save_snapshot(&mut w).unwrap();
        w.flush().unwrap();
    }

    let mut after = rig();
    after
        .engine
        .restore_snapshot(&mut BufReader::new(File::open(&path).unwrap()))
        .unwrap();
    assert_eq!(after.engine.current_list_id(), Some(main_id));
    assert_eq!(after.engine.list_sync(main_id, 1), Ok(GeListStatus::Stalling));
    assert_eq!(after.engine.list_sync(second_id, 1), Ok(GeListStatus::Queued));
    after.engine.update_stall(&mem, main_id, MAIN + 0x100);

    let mut combined = prims(&before.backend);
    combined.extend(prims(&after.backend));
    assert_eq!(combined, prims(&reference.backend));
    assert_eq!(
        combined,
        vec![0x03_0003, 0x03_0004, 0x03_0008, 0x04_0001]
    );

    let mut raised = before.sink.raised();
    raised.extend(after.sink.raised());
    assert_eq!(raised, reference.sink.raised());
    assert_eq!(
        raised,
        vec![
            GeInterrupt {
                list_id: main_id,
                pc: MAIN + 0x14,
                sub_intr_base: 1,
                token: 0x20,
            },
            GeInterrupt {
                list_id: main_id,
                pc: MAIN + 0x20,
                sub_intr_base: 1,
                token: 0x30,
            },
            GeInterrupt {
                list_id: second_id,
                pc: SECOND + 0x1C,
                sub_intr_base: 2,
                token: 0x40,
            },
        ]
    );

    assert_eq!(after.engine.draw_sync(1), Ok(GeListStatus::Completed));
    assert_eq!(after.engine.queue_len(), 0);
    assert_eq!(
        after.engine.save_state().unwrap(),
        reference.engine.save_state().unwrap()
    );
}

#[test]
fn second_list_never_starts_before_the_first_completes() {
    init_tracing();
    let mem = scene();
    let mut rig = rig();

    let main_id = rig.engine.enqueue_list(&mem, MAIN, MAIN + 0x0C, -1, false);
    let second_id = rig.engine.enqueue_list(&mem, SECOND, VRAM_BASE + 0x1000, -1, false);

    // Feed the main list in steps. SIGNAL/FINISH stay in the same step as their END, since END
    // only sees a command executed in the same pass.
    for stall in [MAIN + 0x10, MAIN + 0x18, MAIN + 0x1C, MAIN + 0x100] {
        assert!(rig.engine.display_list(main_id).is_some());
        assert_eq!(rig.engine.list_sync(second_id, 1), Ok(GeListStatus::Queued));
        assert!(!prims(&rig.backend).contains(&0x04_0001));
        rig.engine.update_stall(&mem, main_id, stall);
    }

    assert!(rig.engine.display_list(main_id).is_none());
    assert_eq!(prims(&rig.backend).last(), Some(&0x04_0001));
    assert!(rig.engine.display_list(second_id).is_none());
    assert_eq!(rig.engine.stats().lists_completed, 2);
    assert!(rig.sink.raised().is_empty());
}

#[test]
fn interrupt_service_defers_delivery_across_lists() {
    init_tracing();
    let mem = scene();
    let mut rig = rig();

    rig.engine.interrupt_service_begin();
    let main_id = rig.engine.enqueue_list(&mem, MAIN, MAIN + 0x100, 1, false);
    assert!(rig.sink.raised().is_empty());
    assert_eq!(rig.engine.pending_interrupts().len(), 2);

    assert!(rig.engine.interrupt_service_end(&mem));
    let tokens: Vec<(DisplayListId, u32)> = rig
        .sink
        .raised()
        .iter()
        .map(|i| (i.list_id, i.token))
        .collect();
    assert_eq!(tokens, vec![(main_id, 0x20), (main_id, 0x30)]);
}
