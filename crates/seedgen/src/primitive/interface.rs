use crate::{
    error::{DeriveError, GenerationError},
    job::{Network, Strength},
};
use bip39::Mnemonic;
use bitcoin::bip32::DerivationPath;

/// A minimal interface for producing mnemonics.
///
/// Implementations must be stateless from the pipeline's point of view: every
/// worker calls the same instance concurrently and no call may depend on
/// another.
pub trait MnemonicSource: Send + Sync {
    /// Returns a fresh mnemonic of the requested strength.
    fn generate(&self, strength: Strength) -> Result<Mnemonic, GenerationError>;
}

/// A minimal interface for deriving a network address from a mnemonic.
pub trait AddressDeriver: Send + Sync {
    /// Derives the address at `path` for `network`.
    ///
    /// Returns [`DeriveError::UnsupportedNetwork`] when the implementation has
    /// no scheme for `network`.
    fn derive(
        &self,
        mnemonic: &Mnemonic,
        path: &DerivationPath,
        network: Network,
    ) -> Result<String, DeriveError>;
}
