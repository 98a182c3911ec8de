//! PSP graphics engine (GE) display-list interpreter.
//!
//! [`GeEngine`] keeps a queue of display lists living in guest memory and runs them in order,
//! handling the control-flow commands itself (jumps, calls, returns, the SIGNAL/FINISH + END
//! interrupt protocol) and forwarding everything else to a [`GeBackend`]. A list stops whenever
//! its PC reaches its stall address; all state needed to resume lives in the engine, so the
//! caller simply advances the stall address later, possibly after a snapshot round trip.
#![forbid(unsafe_code)]

pub mod cmd;

mod backend;
mod cache;
mod clock;
mod config;
mod dispatch;
mod engine;
mod interrupt;
mod list;
mod queue;
mod snapshot;
mod stats;
mod status;
mod sync;

pub use backend::{BackendEvent, GeBackend, NullGeBackend, RecordingGeBackend};
pub use cache::CommandCache;
pub use clock::{FakeTickSource, StdTickSource, TickSource};
pub use config::GeEngineConfig;
pub use engine::GeEngine;
pub use interrupt::{GeInterrupt, GeInterruptSink, NullInterruptSink, RecordingInterruptSink};
pub use list::{DisplayList, DisplayListId, DISPLAY_LIST_STACK_DEPTH};
pub use queue::DisplayListQueue;
pub use stats::GeStats;
pub use status::{DisplayListState, GeListStatus, GeSyncError, SyncMode};

pub use ge_snapshot::SnapshotError;
