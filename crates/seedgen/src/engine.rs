//! Per-job execution: generation, optional derivation and the fallback rule.

use crate::{
    error::{DeriveError, GenerationError},
    job::{JobDescriptor, Network, Standard, Strength},
    primitive::{AddressDeriver, HdDeriver, MnemonicSource, ThreadRngSource},
    status::{Artifact, Origin, Outcome},
};

/// The engine used by the binary.
pub type DefaultEngine = Engine<ThreadRngSource, HdDeriver>;

/// One mnemonic together with its address on several networks.
#[derive(Debug)]
pub struct Preview {
    /// The bare mnemonic, as it would be persisted.
    pub artifact: Artifact,
    pub addresses: Vec<(Network, Result<String, DeriveError>)>,
}

/// Anything a worker can run jobs on.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, job: &JobDescriptor) -> Outcome;
}

/// Runs a [`JobDescriptor`] against a generation and a derivation primitive.
///
/// The engine holds no mutable state, so one instance is shared by every
/// worker behind an `Arc`.
#[derive(Debug, Default)]
pub struct Engine<G, D> {
    source: G,
    deriver: D,
}

impl<G, D> Engine<G, D>
where
    G: MnemonicSource,
    D: AddressDeriver,
{
    pub const fn new(source: G, deriver: D) -> Self {
        Self { source, deriver }
    }

    pub const fn source(&self) -> &G {
        &self.source
    }

    pub const fn deriver(&self) -> &D {
        &self.deriver
    }

    /// Executes one job.
    ///
    /// Baseline jobs make a single generation call. BIP-44 jobs additionally
    /// derive an address; if that derivation fails, exactly one fallback
    /// generation is attempted and tagged [`Origin::Fallback`]. A failed
    /// fallback is reported as [`Outcome::Failure`] and never retried.
    pub fn execute(&self, job: &JobDescriptor) -> Outcome {
        let mnemonic = match self.source.generate(job.strength) {
            Ok(mnemonic) => mnemonic,
            Err(e) => return Outcome::Failure(e),
        };

        let (Standard::Bip44, Some(network)) = (job.standard, job.network) else {
            return Outcome::Primary(Artifact::for_job(mnemonic.to_string(), job, None));
        };

        match self
            .deriver
            .derive(&mnemonic, &network.derivation_path(), network)
        {
            Ok(address) => {
                Outcome::Primary(Artifact::for_job(mnemonic.to_string(), job, Some(address)))
            }
            Err(cause) => self.fallback(job, cause),
        }
    }

    /// Generates a single mnemonic and derives its first receiving address
    /// on each of `networks`. Derivation errors are reported per network and
    /// never trigger a fallback.
    ///
    /// # Errors
    ///
    /// Returns the [`GenerationError`] if no mnemonic could be generated.
    pub fn preview(
        &self,
        strength: Strength,
        networks: &[Network],
    ) -> Result<Preview, GenerationError> {
        let mnemonic = self.source.generate(strength)?;
        let addresses = networks
            .iter()
            .map(|&network| {
                let address = self
                    .deriver
                    .derive(&mnemonic, &network.derivation_path(), network);
                (network, address)
            })
            .collect();

        Ok(Preview {
            artifact: Artifact::baseline(mnemonic.to_string(), strength),
            addresses,
        })
    }

    fn fallback(&self, job: &JobDescriptor, cause: DeriveError) -> Outcome {
        match self.source.generate(job.strength) {
            Ok(mnemonic) => Outcome::Fallback {
                artifact: Artifact {
                    phrase: mnemonic.to_string(),
                    strength: job.strength,
                    standard: Standard::Bip39,
                    network: job.network,
                    address: None,
                    origin: Origin::Fallback,
                },
                cause,
            },
            Err(e) => Outcome::Failure(e),
        }
    }
}

impl<G, D> Executor for Engine<G, D>
where
    G: MnemonicSource + 'static,
    D: AddressDeriver + 'static,
{
    fn execute(&self, job: &JobDescriptor) -> Outcome {
        Self::execute(self, job)
    }
}
