//! Kubernetes-style resource quantities (`"2"`, `"500m"`, `"1Gi"`, `"1e3"`).

use crate::EventError;

/// A parsed resource quantity, held in thousandths of the base unit.
///
/// Parsing rounds up to the next milli-unit, matching how the control
/// plane canonicalises fractional requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    millis: i64,
}

impl Quantity {
    /// The zero quantity.
    pub const ZERO: Self = Self { millis: 0 };

    /// Creates a quantity from thousandths of the base unit.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Creates a quantity from whole base units.
    #[must_use]
    pub const fn from_value(value: i64) -> Self {
        Self {
            millis: value.saturating_mul(1000),
        }
    }

    /// Returns the quantity in thousandths of the base unit (millicores for CPU).
    #[must_use]
    pub const fn milli_value(&self) -> i64 {
        self.millis
    }

    /// Returns the quantity in whole base units (bytes for memory), rounded up.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.millis.div_euclid(1000) + if self.millis.rem_euclid(1000) > 0 { 1 } else { 0 }
    }

    /// Parses a quantity string.
    pub fn parse(input: &str) -> Result<Self, EventError> {
        let invalid = |reason| EventError::InvalidQuantity {
            value: input.to_string(),
            reason,
        };

        let s = input.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let split = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (number, suffix) = body.split_at(split);
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("missing digits"));
        }
        if frac_part.contains('.') {
            return Err(invalid("more than one decimal point"));
        }

        let (scale_num, scale_den) = suffix_scale(suffix).ok_or_else(|| invalid("unknown suffix"))?;

        let mut mantissa: i128 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(digit - b'0')))
                .ok_or_else(|| invalid("out of range"))?;
        }

        let numerator = mantissa
            .checked_mul(scale_num)
            .and_then(|v| v.checked_mul(1000))
            .ok_or_else(|| invalid("out of range"))?;
        let denominator = u32::try_from(frac_part.len())
            .ok()
            .and_then(|len| 10i128.checked_pow(len))
            .and_then(|frac| frac.checked_mul(scale_den))
            .ok_or_else(|| invalid("too many fractional digits"))?;

        let millis = (numerator + denominator - 1) / denominator;
        let millis = i64::try_from(millis).map_err(|_| invalid("out of range"))?;

        Ok(Self {
            millis: if negative { -millis } else { millis },
        })
    }
}

/// Returns the multiplier a suffix applies, as a `(numerator, denominator)` pair.
fn suffix_scale(suffix: &str) -> Option<(i128, i128)> {
    const KI: i128 = 1024;

    let scale = match suffix {
        "" => (1, 1),
        "m" => (1, 1000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (KI, 1),
        "Mi" => (KI.pow(2), 1),
        "Gi" => (KI.pow(3), 1),
        "Ti" => (KI.pow(4), 1),
        "Pi" => (KI.pow(5), 1),
        "Ei" => (KI.pow(6), 1),
        _ => {
            let exp: i32 = suffix.strip_prefix(['e', 'E'])?.parse().ok()?;
            let factor = 10i128.checked_pow(exp.unsigned_abs())?;
            if exp >= 0 {
                (factor, 1)
            } else {
                (1, factor)
            }
        }
    };

    Some(scale)
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.millis % 1000 == 0 {
            write!(f, "{}", self.millis / 1000)
        } else {
            write!(f, "{}m", self.millis)
        }
    }
}

impl std::str::FromStr for Quantity {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
