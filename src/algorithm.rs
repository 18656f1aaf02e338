use core::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{errors::CalcError, hashrate::HashRateUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    Sha256,
    Scrypt,
    Etchash,
    KHeavyHash,
    Blake2s,
    Blake2bSha3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmProfile {
    pub algorithm: Algorithm,
    pub block_time_seconds: f64,
    pub canonical_unit: HashRateUnit,
}

// kHeavyHash is modelled as one block per second.
const PROFILES: [AlgorithmProfile; 6] = [
    AlgorithmProfile {
        algorithm: Algorithm::Sha256,
        block_time_seconds: 600.0,
        canonical_unit: HashRateUnit::Ths,
    },
    AlgorithmProfile {
        algorithm: Algorithm::Scrypt,
        block_time_seconds: 150.0,
        canonical_unit: HashRateUnit::Ghs,
    },
    AlgorithmProfile {
        algorithm: Algorithm::Etchash,
        block_time_seconds: 13.0,
        canonical_unit: HashRateUnit::Ghs,
    },
    AlgorithmProfile {
        algorithm: Algorithm::KHeavyHash,
        block_time_seconds: 1.0,
        canonical_unit: HashRateUnit::Ths,
    },
    AlgorithmProfile {
        algorithm: Algorithm::Blake2s,
        block_time_seconds: 30.0,
        canonical_unit: HashRateUnit::Ths,
    },
    AlgorithmProfile {
        algorithm: Algorithm::Blake2bSha3,
        block_time_seconds: 60.0,
        canonical_unit: HashRateUnit::Ghs,
    },
];

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Sha256,
        Algorithm::Scrypt,
        Algorithm::Etchash,
        Algorithm::KHeavyHash,
        Algorithm::Blake2s,
        Algorithm::Blake2bSha3,
    ];

    pub fn profile(self) -> AlgorithmProfile {
        // PROFILES is ordered by discriminant
        PROFILES[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Scrypt => "Scrypt",
            Algorithm::Etchash => "Etchash/Ethash",
            Algorithm::KHeavyHash => "kHeavyHash",
            Algorithm::Blake2s => "Blake2S",
            Algorithm::Blake2bSha3 => "Blake2B+SHA3",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        match key.as_str() {
            "sha256" => Ok(Algorithm::Sha256),
            "scrypt" => Ok(Algorithm::Scrypt),
            "etchash" | "ethash" | "etchash/ethash" => Ok(Algorithm::Etchash),
            "kheavyhash" => Ok(Algorithm::KHeavyHash),
            "blake2s" => Ok(Algorithm::Blake2s),
            "blake2b+sha3" | "blake2bsha3" => Ok(Algorithm::Blake2bSha3),
            _ => Err(CalcError::UnknownAlgorithm {
                name: s.trim().to_string(),
            }),
        }
    }
}

/// Looks up block time and canonical unit by algorithm name.
pub fn lookup(name: &str) -> Result<AlgorithmProfile, CalcError> {
    Ok(name.parse::<Algorithm>()?.profile())
}
