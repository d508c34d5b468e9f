//! Human-readable byte size formatting for logs and the fact card header

use std::fmt;

/// Byte count with a human-readable `Display`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[(&str, u64)] = &[
            ("B", 1),
            ("KB", 1024),
            ("MB", 1024 * 1024),
            ("GB", 1024 * 1024 * 1024),
        ];

        for (i, &(unit, divisor)) in UNITS.iter().enumerate().rev() {
            if self.0 >= divisor {
                let value = self.0 / divisor;
                let remainder = self.0 % divisor;

                if remainder == 0 || i == 0 {
                    return write!(f, "{}{}", value, unit);
                }

                let decimal = remainder * 10 / divisor;
                if decimal > 0 {
                    return write!(f, "{}.{}{}", value, decimal, unit);
                }
                return write!(f, "{}{}", value, unit);
            }
        }

        write!(f, "{}B", self.0)
    }
}
