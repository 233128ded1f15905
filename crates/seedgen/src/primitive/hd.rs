use super::AddressDeriver;
use crate::{error::DeriveError, job::Network};
use bip39::Mnemonic;
use bitcoin::{
    Address, CompressedPublicKey, NetworkKind,
    bip32::{DerivationPath, Xpriv, Xpub},
    secp256k1::{All, Secp256k1},
};
use core::fmt::Write as _;
use sha3::{Digest, Keccak256};

/// Hierarchical-deterministic deriver (BIP-32) for Bitcoin and Ethereum.
///
/// Bitcoin addresses are rendered as legacy P2PKH, Ethereum addresses as
/// EIP-55 checksummed hex. Every other network is rejected with
/// [`DeriveError::UnsupportedNetwork`].
pub struct HdDeriver {
    secp: Secp256k1<All>,
}

impl HdDeriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for HdDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HdDeriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HdDeriver").finish_non_exhaustive()
    }
}

impl AddressDeriver for HdDeriver {
    fn derive(
        &self,
        mnemonic: &Mnemonic,
        path: &DerivationPath,
        network: Network,
    ) -> Result<String, DeriveError> {
        // Reject before paying for PBKDF2 and the key walk.
        let render: fn(&Xpub) -> String = match network {
            Network::Bitcoin => p2pkh_address,
            Network::Ethereum => ethereum_address,
            other => return Err(DeriveError::UnsupportedNetwork { network: other }),
        };

        let seed = mnemonic.to_seed_normalized("");
        let master = Xpriv::new_master(NetworkKind::Main, &seed)?;
        let child = master.derive_priv(&self.secp, path)?;
        let xpub = Xpub::from_priv(&self.secp, &child);
        Ok(render(&xpub))
    }
}

fn p2pkh_address(xpub: &Xpub) -> String {
    let pubkey_hash = CompressedPublicKey(xpub.public_key).pubkey_hash();
    Address::p2pkh(pubkey_hash, NetworkKind::Main).to_string()
}

fn ethereum_address(xpub: &Xpub) -> String {
    let uncompressed = xpub.public_key.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    to_checksum_address(&hash[12..])
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address.
fn to_checksum_address(addr: &[u8]) -> String {
    let mut lower = String::with_capacity(addr.len() * 2);
    for byte in addr {
        let _ = write!(lower, "{byte:02x}");
    }

    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    fn abandon() -> Mnemonic {
        Mnemonic::parse_in_normalized(bip39::Language::English, ABANDON).unwrap()
    }

    fn decode_hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn derives_known_bitcoin_address() {
        let deriver = HdDeriver::new();
        let address = deriver
            .derive(
                &abandon(),
                &Network::Bitcoin.derivation_path(),
                Network::Bitcoin,
            )
            .unwrap();
        assert_eq!(address, "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
    }

    #[test]
    fn derives_known_ethereum_address() {
        let deriver = HdDeriver::new();
        let address = deriver
            .derive(
                &abandon(),
                &Network::Ethereum.derivation_path(),
                Network::Ethereum,
            )
            .unwrap();
        assert_eq!(address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    }

    #[test]
    fn rejects_networks_without_a_scheme() {
        let deriver = HdDeriver::new();
        for network in [Network::Litecoin, Network::Dogecoin] {
            let err = deriver
                .derive(&abandon(), &network.derivation_path(), network)
                .unwrap_err();
            assert!(matches!(err, DeriveError::UnsupportedNetwork { network: n } if n == network));
        }
    }

    #[test]
    fn checksum_matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        ] {
            let raw = decode_hex(&expected[2..].to_ascii_lowercase());
            assert_eq!(to_checksum_address(&raw), expected);
        }
    }
}
