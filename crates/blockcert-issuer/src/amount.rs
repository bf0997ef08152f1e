//! Fixed-point value arithmetic.
//!
//! Display amounts are decimal strings with at most eight fractional digits;
//! everything that reaches a transaction output is an integer number of
//! satoshis computed with checked arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Satoshis per display unit.
pub const COIN: u64 = 100_000_000;

/// Fractional digits of a display amount.
const DECIMALS: usize = 8;

/// Errors from parsing display amounts or from value overflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("negative amount {0:?}")]
    Negative(String),
    #[error("amount {0:?} has more than 8 fractional digits")]
    TooPrecise(String),
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative value in satoshis, parsed from and shown as a display amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_sat(sat: u64) -> Self {
        Amount(sat)
    }

    pub const fn to_sat(self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse `"0.0000275"`, `"12"` or `".5"` exactly, without floating point.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(AmountError::Empty);
        }
        if text.starts_with('-') {
            return Err(AmountError::Negative(text.to_string()));
        }

        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
            return Err(AmountError::Invalid(text.to_string()));
        }
        if frac.len() > DECIMALS {
            return Err(AmountError::TooPrecise(text.to_string()));
        }

        let mut sat: u64 = 0;
        for b in whole.bytes() {
            sat = sat
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or(AmountError::Overflow)?;
        }
        sat = sat.checked_mul(COIN).ok_or(AmountError::Overflow)?;

        let mut frac_sat: u64 = 0;
        for (i, b) in frac.bytes().enumerate() {
            frac_sat += u64::from(b - b'0') * 10u64.pow((DECIMALS - 1 - i) as u32);
        }
        sat.checked_add(frac_sat)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / COIN;
        let frac = self.0 % COIN;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:08}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Dust floor and fee parameters, all in satoshis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Value of each recipient and revocation marker output.
    pub dust: u64,
    /// Fee paid by one certificate or forwarding transaction.
    pub fee: u64,
    /// Extra fee per recipient of a multi-output transfer.
    pub per_recipient_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            dust: 2_750,
            fee: 10_000,
            per_recipient_fee: 0,
        }
    }
}

impl FeeSchedule {
    /// Smallest input that can fund one certificate transaction: `2·dust + fee`.
    pub fn certificate_cost(&self) -> Result<u64, AmountError> {
        self.dust
            .checked_mul(2)
            .and_then(|v| v.checked_add(self.fee))
            .ok_or(AmountError::Overflow)
    }

    /// Sent from storage to each temporary address: `2·dust + 2·fee`.
    pub fn temporary_allocation(&self) -> Result<u64, AmountError> {
        self.certificate_cost()?
            .checked_add(self.fee)
            .ok_or(AmountError::Overflow)
    }

    /// Forwarded from each temporary address to the issuing address: `2·dust + fee`.
    pub fn forward_amount(&self) -> Result<u64, AmountError> {
        self.certificate_cost()
    }

    /// Total needed on the issuing address for `count` certificates.
    pub fn batch_cost(&self, count: usize) -> Result<u64, AmountError> {
        self.certificate_cost()?
            .checked_mul(count as u64)
            .ok_or(AmountError::Overflow)
    }

    /// Fee for a transfer with `inputs` inputs paying `recipients` outputs.
    pub fn batch_fee(&self, inputs: usize, recipients: usize) -> Result<u64, AmountError> {
        let base = self.fee.checked_mul(inputs as u64);
        let per_recipient = self.per_recipient_fee.checked_mul(recipients as u64);
        match (base, per_recipient) {
            (Some(a), Some(b)) => a.checked_add(b).ok_or(AmountError::Overflow),
            _ => Err(AmountError::Overflow),
        }
    }
}
