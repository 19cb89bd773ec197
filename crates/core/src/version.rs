//! Release version algebra.
//!
//! Versions use a `YEAR.MONTH.ITERATION` form, where the iteration counts
//! the releases rolled within a month. An optional `-extra` suffix carries
//! opaque build metadata (typically a git hash or a `dirty` marker).

use std::cmp::Ordering;
use std::fmt;

use time::OffsetDateTime;

use crate::{Error, Result};

/// A parsed release version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Version {
    pub year: i32,
    pub month: u32,
    pub iteration: u32,
    pub extra: Option<String>,
}

impl Version {
    /// Version for the given timestamp: its year and month with a zero
    /// iteration counter and no extra tag.
    pub fn for_timestamp(now: OffsetDateTime) -> Self {
        Version {
            year: now.year(),
            month: u8::from(now.month()) as u32,
            iteration: 0,
            extra: None,
        }
    }

    /// Parse a version string.
    ///
    /// The string must split into exactly three dot-separated fields; an
    /// optional `-extra` suffix is split off the third field only.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || Error::MalformedVersion(input.to_string());

        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed());
        }

        let year = parts[0].parse::<u32>().map_err(|_| malformed())? as i32;
        let month = parts[1].parse::<u32>().map_err(|_| malformed())?;

        let (iteration, extra) = match parts[2].split_once('-') {
            Some((it, tag)) => (it, (!tag.is_empty()).then(|| tag.to_string())),
            None => (parts[2], None),
        };
        let iteration = iteration.parse::<u32>().map_err(|_| malformed())?;

        Ok(Version {
            year,
            month,
            iteration,
            extra,
        })
    }

    /// Compare two versions.
    ///
    /// Ordering is by year, then month, then iteration. With all three
    /// equal, a version without an extra tag sorts before one with a tag.
    /// Two versions equal except for differing non-empty tags compare as
    /// `Less` regardless of which side is `self`: opaque tags admit no
    /// order. The relation is therefore not antisymmetric, which is why
    /// this type does not implement `Ord` and exposes comparison as an
    /// inherent method instead.
    pub fn cmp(&self, other: &Version) -> Ordering {
        match self.year.cmp(&other.year) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.month.cmp(&other.month) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.iteration.cmp(&other.iteration) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (&self.extra, &other.extra) {
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) if a != b => Ordering::Less,
            _ => Ordering::Equal,
        }
    }

    /// Increment the version for the given timestamp.
    ///
    /// A new year resets the month and iteration, a new month within the
    /// same year resets the iteration, and otherwise the iteration is
    /// bumped. A timestamp from an earlier year, or an earlier month of
    /// the same year, fails with [`Error::Regression`]: a release must
    /// never be incremented into the past.
    pub fn increment_at(&self, now: OffsetDateTime) -> Result<Version> {
        let year = now.year();
        let month = u8::from(now.month()) as u32;

        if self.year > year {
            return Err(Error::Regression("year"));
        }
        if self.year == year && self.month > month {
            return Err(Error::Regression("month"));
        }

        let mut next = self.clone();
        if year != next.year {
            next.year = year;
            next.month = month;
            next.iteration = 0;
        } else if month != next.month {
            next.month = month;
            next.iteration = 0;
        } else {
            next.iteration += 1;
        }

        Ok(next)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}.{}.{}", self.year, self.month, self.iteration)?;
        if let Some(extra) = &self.extra {
            write!(f, "-{extra}")?;
        }
        Ok(())
    }
}
