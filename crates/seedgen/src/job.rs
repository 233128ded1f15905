//! Job descriptors and the lazy job source that feeds the worker pool.

use crate::error::ConfigError;
use bitcoin::bip32::{ChildNumber, DerivationPath};
use core::{fmt, str::FromStr};
use serde::Serialize;

/// Entropy strength of a generated mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strength {
    /// 128 bits, 12 words.
    Bits128,
    /// 256 bits, 24 words.
    Bits256,
}

impl Strength {
    pub const fn bits(self) -> usize {
        match self {
            Self::Bits128 => 128,
            Self::Bits256 => 256,
        }
    }

    pub const fn entropy_bytes(self) -> usize {
        self.bits() / 8
    }

    pub const fn word_count(self) -> usize {
        match self {
            Self::Bits128 => 12,
            Self::Bits256 => 24,
        }
    }

    pub const fn from_word_count(words: usize) -> Result<Self, ConfigError> {
        match words {
            12 => Ok(Self::Bits128),
            24 => Ok(Self::Bits256),
            other => Err(ConfigError::WordCount(other)),
        }
    }
}

/// Which standard an artifact is produced under.
///
/// [`Standard::Bip39`] is the baseline: a bare mnemonic with no derived
/// fields. [`Standard::Bip44`] additionally derives the first receiving
/// address for the job's network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Standard {
    Bip39,
    Bip44,
}

impl Standard {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bip39 => "BIP39",
            Self::Bip44 => "BIP44",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Standard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BIP39" => Ok(Self::Bip39),
            "BIP44" => Ok(Self::Bip44),
            _ => Err(ConfigError::UnknownStandard(s.to_string())),
        }
    }
}

/// Network tag of a job.
///
/// Every network has a registered BIP-44 coin type, but the bundled deriver
/// only knows how to render addresses for Bitcoin and Ethereum. Jobs for the
/// other networks go through the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Network {
    #[serde(rename = "BTC")]
    Bitcoin,
    #[serde(rename = "ETH")]
    Ethereum,
    #[serde(rename = "LTC")]
    Litecoin,
    #[serde(rename = "DOGE")]
    Dogecoin,
}

impl Network {
    pub const ALL: [Self; 4] = [Self::Bitcoin, Self::Ethereum, Self::Litecoin, Self::Dogecoin];

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bitcoin => "BTC",
            Self::Ethereum => "ETH",
            Self::Litecoin => "LTC",
            Self::Dogecoin => "DOGE",
        }
    }

    /// SLIP-44 coin type.
    pub const fn coin_type(self) -> u32 {
        match self {
            Self::Bitcoin => 0,
            Self::Litecoin => 2,
            Self::Dogecoin => 3,
            Self::Ethereum => 60,
        }
    }

    /// First external address of the first account: `m/44'/coin'/0'/0/0`.
    pub fn derivation_path(self) -> DerivationPath {
        DerivationPath::from(vec![
            ChildNumber::Hardened { index: 44 },
            ChildNumber::Hardened {
                index: self.coin_type(),
            },
            ChildNumber::Hardened { index: 0 },
            ChildNumber::Normal { index: 0 },
            ChildNumber::Normal { index: 0 },
        ])
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|n| n.tag() == upper)
            .ok_or_else(|| ConfigError::UnknownNetwork(s.to_string()))
    }
}

/// Immutable description of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobDescriptor {
    pub strength: Strength,
    pub standard: Standard,
    pub network: Option<Network>,
}

impl JobDescriptor {
    /// A baseline job: bare mnemonic, no derivation.
    pub const fn baseline(strength: Strength) -> Self {
        Self {
            strength,
            standard: Standard::Bip39,
            network: None,
        }
    }

    /// A BIP-44 job that derives an address on `network`.
    pub const fn bip44(strength: Strength, network: Network) -> Self {
        Self {
            strength,
            standard: Standard::Bip44,
            network: Some(network),
        }
    }
}

/// Lazy, unbounded sequence of [`JobDescriptor`]s.
///
/// The source never ends on its own: it either repeats one descriptor
/// ([`JobSource::fixed`]) or cycles through a fixed set in round-robin order
/// ([`JobSource::round_robin`]), giving every entry the same long-run
/// frequency. The position is not persisted; a restart starts over.
#[derive(Debug, Clone)]
pub struct JobSource {
    jobs: Vec<JobDescriptor>,
    cursor: usize,
}

impl JobSource {
    pub fn fixed(job: JobDescriptor) -> Self {
        Self {
            jobs: vec![job],
            cursor: 0,
        }
    }

    /// Cycles through `jobs` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] if `jobs` is empty.
    pub fn round_robin(jobs: Vec<JobDescriptor>) -> Result<Self, ConfigError> {
        if jobs.is_empty() {
            return Err(ConfigError::Zero { name: "job set" });
        }
        Ok(Self { jobs, cursor: 0 })
    }

    /// Number of distinct descriptors in one cycle.
    pub fn cycle_len(&self) -> usize {
        self.jobs.len()
    }
}

impl Iterator for JobSource {
    type Item = JobDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let job = self.jobs[self.cursor];
        self.cursor = (self.cursor + 1) % self.jobs.len();
        Some(job)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl core::iter::FusedIterator for JobSource {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn fixed_source_repeats_forever() {
        let job = JobDescriptor::baseline(Strength::Bits256);
        let source = JobSource::fixed(job);
        assert!(source.take(10_000).all(|j| j == job));
    }

    #[test]
    fn round_robin_visits_in_order() {
        let jobs = vec![
            JobDescriptor::bip44(Strength::Bits128, Network::Bitcoin),
            JobDescriptor::bip44(Strength::Bits128, Network::Ethereum),
            JobDescriptor::baseline(Strength::Bits128),
        ];
        let seen: Vec<_> = JobSource::round_robin(jobs.clone())
            .unwrap()
            .take(7)
            .collect();
        assert_eq!(
            seen,
            vec![jobs[0], jobs[1], jobs[2], jobs[0], jobs[1], jobs[2], jobs[0]]
        );
    }

    #[test]
    fn round_robin_is_unweighted() {
        let jobs: Vec<_> = Network::ALL
            .into_iter()
            .map(|n| JobDescriptor::bip44(Strength::Bits128, n))
            .collect();
        let mut counts: HashMap<JobDescriptor, usize> = HashMap::new();
        for job in JobSource::round_robin(jobs).unwrap().take(4 * 250) {
            *counts.entry(job).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 250));
    }

    #[test]
    fn empty_round_robin_is_rejected() {
        assert_eq!(
            JobSource::round_robin(vec![]).unwrap_err(),
            ConfigError::Zero { name: "job set" }
        );
    }

    #[test]
    fn strength_maps_to_word_count() {
        assert_eq!(Strength::from_word_count(12).unwrap(), Strength::Bits128);
        assert_eq!(Strength::from_word_count(24).unwrap(), Strength::Bits256);
        assert_eq!(
            Strength::from_word_count(18).unwrap_err(),
            ConfigError::WordCount(18)
        );
        assert_eq!(Strength::Bits256.entropy_bytes(), 32);
    }

    #[test]
    fn network_tags_parse_case_insensitively() {
        assert_eq!("eth".parse::<Network>().unwrap(), Network::Ethereum);
        assert_eq!("DOGE".parse::<Network>().unwrap(), Network::Dogecoin);
        assert!("XRP".parse::<Network>().is_err());
        assert_eq!("bip44".parse::<Standard>().unwrap(), Standard::Bip44);
    }

    #[test]
    fn derivation_path_uses_coin_type() {
        assert_eq!(
            Network::Ethereum.derivation_path(),
            "m/44'/60'/0'/0/0".parse::<DerivationPath>().unwrap()
        );
    }
}
