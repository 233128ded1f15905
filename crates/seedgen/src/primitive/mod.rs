//! Generation and derivation primitives.
//!
//! The pipeline only talks to these through [`MnemonicSource`] and
//! [`AddressDeriver`]; the bundled implementations delegate the cryptography
//! to `bip39`, `bitcoin` and `sha3`.

mod entropy;
mod hd;
mod interface;

pub use entropy::*;
pub use hd::*;
pub use interface::*;
