use core::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{errors::CalcError, utils::parse_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashRateUnit {
    #[serde(rename = "H/s")]
    Hs,
    #[serde(rename = "KH/s")]
    Khs,
    #[serde(rename = "MH/s")]
    Mhs,
    #[serde(rename = "GH/s")]
    Ghs,
    #[serde(rename = "TH/s")]
    Ths,
}

impl HashRateUnit {
    pub const ALL: [HashRateUnit; 5] = [
        HashRateUnit::Hs,
        HashRateUnit::Khs,
        HashRateUnit::Mhs,
        HashRateUnit::Ghs,
        HashRateUnit::Ths,
    ];

    /// Hashes per second in one unit.
    #[inline]
    pub fn multiplier(self) -> f64 {
        match self {
            HashRateUnit::Hs => 1.0,
            HashRateUnit::Khs => 1e3,
            HashRateUnit::Mhs => 1e6,
            HashRateUnit::Ghs => 1e9,
            HashRateUnit::Ths => 1e12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashRateUnit::Hs => "H/s",
            HashRateUnit::Khs => "KH/s",
            HashRateUnit::Mhs => "MH/s",
            HashRateUnit::Ghs => "GH/s",
            HashRateUnit::Ths => "TH/s",
        }
    }
}

impl Display for HashRateUnit {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashRateUnit {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let prefix = lowered
            .strip_suffix("/s")
            .or_else(|| lowered.strip_suffix("s"))
            .unwrap_or(&lowered);

        match prefix {
            "h" => Ok(HashRateUnit::Hs),
            "kh" => Ok(HashRateUnit::Khs),
            "mh" => Ok(HashRateUnit::Mhs),
            "gh" => Ok(HashRateUnit::Ghs),
            "th" => Ok(HashRateUnit::Ths),
            _ => Err(CalcError::Configuration {
                unit: s.trim().to_string(),
            }),
        }
    }
}

/// Converts `magnitude` expressed in `unit` to raw hashes per second.
#[inline]
pub fn normalize(magnitude: f64, unit: HashRateUnit) -> f64 {
    magnitude * unit.multiplier()
}

/// A hash rate as it was entered: the unit always travels with the number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashRate {
    pub magnitude: f64,
    pub unit: HashRateUnit,
}

impl HashRate {
    pub fn new(magnitude: f64, unit: HashRateUnit) -> HashRate {
        HashRate { magnitude, unit }
    }

    #[inline]
    pub fn hashes_per_second(&self) -> f64 {
        normalize(self.magnitude, self.unit)
    }

    /// Same physical rate expressed in `unit`, rounded to 6 decimals for
    /// display.
    pub fn in_unit(&self, unit: HashRateUnit) -> HashRate {
        let magnitude = self.hashes_per_second() / unit.multiplier();
        HashRate {
            magnitude: (magnitude * 1e6).round() / 1e6,
            unit,
        }
    }
}

impl Display for HashRate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

lazy_static! {
    static ref HASH_RATE_REGEX: Regex =
        Regex::new(r"^\s*([0-9]+(?:[.,][0-9]+)?)\s*([A-Za-z]+(?:/[sS])?)\s*$").unwrap();
}

impl FromStr for HashRate {
    type Err = CalcError;

    /// Accepts "100 TH/s", "8800MH/s" or "0,4 th/s".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = HASH_RATE_REGEX
            .captures(s)
            .ok_or_else(|| CalcError::Configuration {
                unit: s.trim().to_string(),
            })?;
        let magnitude = parse_number(&captures[1]).map_err(|_| CalcError::Configuration {
            unit: s.trim().to_string(),
        })?;
        let unit = captures[2].parse::<HashRateUnit>()?;

        Ok(HashRate { magnitude, unit })
    }
}
