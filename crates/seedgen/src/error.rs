//! Error types for the generation pipeline.
//!
//! Errors are split by where they are recovered:
//!
//! - [`GenerationError`] and [`DeriveError`] never leave a worker. They are
//!   folded into an [`Outcome`](crate::Outcome) and counted by the
//!   coordinator.
//! - [`PipelineError`] is surfaced to the caller of
//!   [`run_pipeline`](crate::pipeline::run_pipeline) and terminates the run.
//! - [`ConfigError`] is produced while validating a
//!   [`PipelineConfig`](crate::pipeline::PipelineConfig).

use crate::job::Network;
use std::io;
use thiserror::Error;

/// The generation primitive rejected a job.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The entropy could not be encoded as a mnemonic.
    #[error("mnemonic encoding failed: {0}")]
    Mnemonic(#[from] bip39::Error),

    /// A custom [`MnemonicSource`](crate::MnemonicSource) failed.
    #[error("generation failed: {reason}")]
    Source { reason: String },

    /// The job panicked on the worker thread. The worker keeps running.
    #[error("job panicked: {reason}")]
    Panicked { reason: String },
}

/// The derivation primitive could not produce an address.
#[derive(Error, Debug)]
pub enum DeriveError {
    /// No derivation scheme is known for this network.
    #[error("network {network} is not supported by the deriver")]
    UnsupportedNetwork { network: Network },

    /// Key derivation along the requested path failed.
    #[error("key derivation failed: {0}")]
    Key(#[from] bitcoin::bip32::Error),
}

/// Fatal errors that stop the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Writing a batch to the sink failed. The batch is not considered
    /// persisted.
    #[error("sink write to {target} failed: {source}")]
    Sink {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Internal channel send/receive failure, or every worker stopped
    /// before the run was cancelled.
    #[error("Channel communication error: {context}")]
    ChannelError { context: String },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: io::Error,
    },

    /// The run was started with an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Work was submitted after shutdown began.
    #[error("Pipeline is shutting down")]
    ServiceShutdown,
}

/// Invalid pipeline configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },

    #[error("unsupported word count {0} (expected 12 or 24)")]
    WordCount(usize),

    #[error("unknown network tag {0:?}")]
    UnknownNetwork(String),

    #[error("unknown standard tag {0:?}")]
    UnknownStandard(String),

    #[error("unknown record format {0:?}")]
    UnknownFormat(String),

    #[error("BIP44 generation needs at least one network")]
    NoNetworks,
}
