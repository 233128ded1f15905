use super::MnemonicSource;
use crate::{error::GenerationError, job::Strength};
use bip39::{Language, Mnemonic};
use rand::RngCore;

/// Largest entropy size we ever request (256 bits).
const MAX_ENTROPY_BYTES: usize = 32;

/// English BIP-39 mnemonics from the thread-local CSPRNG.
///
/// Each calling thread uses its own `ThreadRng`, so workers never contend on
/// a shared generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl MnemonicSource for ThreadRngSource {
    fn generate(&self, strength: Strength) -> Result<Mnemonic, GenerationError> {
        let mut buf = [0_u8; MAX_ENTROPY_BYTES];
        let entropy = &mut buf[..strength.entropy_bytes()];
        rand::rng().fill_bytes(entropy);
        Ok(Mnemonic::from_entropy_in(Language::English, entropy)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_follows_strength() {
        let source = ThreadRngSource;
        for strength in [Strength::Bits128, Strength::Bits256] {
            let mnemonic = source.generate(strength).unwrap();
            assert_eq!(mnemonic.word_count(), strength.word_count());
            assert_eq!(
                mnemonic.to_string().split(' ').count(),
                strength.word_count()
            );
        }
    }

    #[test]
    fn generated_phrases_round_trip_through_the_checksum() {
        let phrase = ThreadRngSource
            .generate(Strength::Bits128)
            .unwrap()
            .to_string();
        assert!(Mnemonic::parse_in_normalized(Language::English, &phrase).is_ok());
    }
}
