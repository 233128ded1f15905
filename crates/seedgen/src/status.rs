use crate::{
    error::{DeriveError, GenerationError},
    job::{JobDescriptor, Network, Standard, Strength},
};
use serde::Serialize;

/// How an [`Artifact`] came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// Produced exactly as the job asked.
    Primary,
    /// The job's derivation failed and a baseline mnemonic was generated in
    /// its place.
    Fallback,
}

/// One unit of generated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Space-separated mnemonic words.
    pub phrase: String,
    pub strength: Strength,
    pub standard: Standard,
    pub network: Option<Network>,
    /// Derived address, present only for primary BIP-44 artifacts.
    pub address: Option<String>,
    pub origin: Origin,
}

impl Artifact {
    /// A baseline artifact carrying only the phrase.
    pub fn baseline(phrase: String, strength: Strength) -> Self {
        Self {
            phrase,
            strength,
            standard: Standard::Bip39,
            network: None,
            address: None,
            origin: Origin::Primary,
        }
    }

    /// Creates the artifact for `job` with an optional derived `address`.
    pub fn for_job(phrase: String, job: &JobDescriptor, address: Option<String>) -> Self {
        Self {
            phrase,
            strength: job.strength,
            standard: job.standard,
            network: job.network,
            address,
            origin: Origin::Primary,
        }
    }
}

/// Represents the result of running a single [`JobDescriptor`] on a worker.
///
/// - [`Outcome::Primary`] indicates the job produced what it asked for.
/// - [`Outcome::Fallback`] means derivation failed for the job's network and
///   the single permitted fallback produced a baseline artifact instead.
/// - [`Outcome::Failure`] means no artifact was produced.
///
/// Outcomes are transient: they live only between a worker returning and the
/// coordinator consuming them.
#[derive(Debug)]
pub enum Outcome {
    Primary(Artifact),
    Fallback {
        artifact: Artifact,
        /// Why the primary derivation was abandoned.
        cause: DeriveError,
    },
    Failure(GenerationError),
}

impl Outcome {
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }
}
