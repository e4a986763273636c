//! CIDR range type and range merging.
//!
//! [`merge`] coalesces an arbitrary collection of possibly overlapping
//! ranges into a minimal sorted covering set via an interval sweep followed
//! by span-to-CIDR conversion.

use std::fmt;
use std::str::FromStr;

use crate::addr::{self, FormatError};

/// A CIDR block: network base address plus prefix length.
///
/// The base is always the network address; host bits are zeroed on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetworkRange {
    base: u32,
    prefix: u8,
}

impl NetworkRange {
    /// Create a range, rejecting prefix lengths outside [0, 32].
    pub fn new(base: u32, prefix: u8) -> Result<Self, FormatError> {
        if prefix > 32 {
            return Err(FormatError::InvalidPrefix {
                prefix: u32::from(prefix),
            });
        }
        Ok(Self::aligned(base, prefix))
    }

    /// Constructor for callers that guarantee `prefix <= 32`.
    pub(crate) fn aligned(base: u32, prefix: u8) -> Self {
        debug_assert!(prefix <= 32);
        Self {
            base: addr::network_address(base, prefix),
            prefix,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Last address covered by this range.
    pub fn end(&self) -> u32 {
        self.base | !addr::mask_for_prefix(self.prefix)
    }

    /// Whether `addr` falls inside this range.
    pub fn contains(&self, addr: u32) -> bool {
        addr::in_network(addr, self.base, self.prefix)
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", addr::format_addr(self.base), self.prefix)
    }
}

impl FromStr for NetworkRange {
    type Err = FormatError;

    /// Parse `a.b.c.d/prefix` notation. Host bits below the prefix are
    /// zeroed rather than rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_text, prefix_text) = s.split_once('/').ok_or_else(|| {
            FormatError::InvalidAddress {
                text: s.to_string(),
            }
        })?;
        let base = addr::parse_addr(addr_text)?;
        let prefix: u32 = prefix_text.parse().map_err(|_| FormatError::InvalidAddress {
            text: s.to_string(),
        })?;
        if prefix > 32 {
            return Err(FormatError::InvalidPrefix { prefix });
        }
        Ok(Self::aligned(base, prefix as u8))
    }
}

/// Merge ranges into a minimal sorted covering set.
///
/// Ranges are sorted by (base ascending, end descending) so a range fully
/// containing another is processed first, then swept left to right: a range
/// whose start falls within or immediately adjoins the open interval extends
/// it, anything else closes the interval and converts the covered span back
/// into aligned CIDR blocks.
///
/// The output covers exactly the union of the input spans, with no two
/// entries overlapping. Empty input yields empty output.
pub fn merge(ranges: &[NetworkRange]) -> Vec<NetworkRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted = ranges.to_vec();
    sorted.sort_by(|a, b| {
        a.base
            .cmp(&b.base)
            .then_with(|| b.end().cmp(&a.end()))
    });

    let mut out = Vec::new();
    let mut start = u64::from(sorted[0].base());
    let mut end = u64::from(sorted[0].end());
    for range in &sorted[1..] {
        let next_start = u64::from(range.base());
        let next_end = u64::from(range.end());
        if next_start <= end + 1 {
            if next_end > end {
                end = next_end;
            }
        } else {
            span_to_cidrs(start, end, &mut out);
            start = next_start;
            end = next_end;
        }
    }
    span_to_cidrs(start, end, &mut out);
    out
}

/// Convert an inclusive address span into aligned CIDR blocks, repeatedly
/// taking the largest power-of-two block that starts aligned and fits.
fn span_to_cidrs(mut start: u64, end: u64, out: &mut Vec<NetworkRange>) {
    while start <= end {
        let align = if start == 0 {
            32
        } else {
            start.trailing_zeros().min(32)
        };
        let span = end - start + 1;
        let fit = 63 - span.leading_zeros();
        let bits = align.min(fit);
        out.push(NetworkRange::aligned(start as u32, (32 - bits) as u8));
        start += 1u64 << bits;
    }
}
