//! Parallel BIP-39 mnemonic generation with batched, append-only persistence.
//!
//! A pool of worker threads executes [`JobDescriptor`]s on an [`Engine`] and
//! reports each [`Outcome`] as soon as it completes. A single coordinator
//! consumes outcomes in completion order, buffers artifacts in a [`Batcher`]
//! and hands whole batches to a [`Sink`] when the size or age trigger of the
//! [`FlushPolicy`] fires. See [`pipeline::run_pipeline`].

mod batch;
mod counters;
mod engine;
mod error;
mod job;
pub mod pipeline;
mod primitive;
mod sink;
mod status;
pub mod telemetry;
pub mod wordlist;

pub use crate::batch::*;
pub use crate::counters::*;
pub use crate::engine::{DefaultEngine, Engine, Executor, Preview};
pub use crate::error::*;
pub use crate::job::*;
pub use crate::primitive::*;
pub use crate::sink::{
    AppendTarget, DEFAULT_FILE_PREFIX, FileSink, NullSink, RecordFormat, SINK_BUFFER_BYTES, Sink,
    sink_path,
};
pub use crate::status::*;
