//! Directory category model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One of the three directory datasets mirrored from the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Nationally issued mining permits
    National,
    /// Locally issued (provincial/municipal) permits
    Local,
    /// Reported illegal-mining hotspots
    Hotspots,
}

impl Category {
    /// All categories in sync order.
    pub const ALL: [Self; 3] = [Self::National, Self::Local, Self::Hotspots];

    /// Stable lowercase name, used as the remote path segment and the
    /// `sync_status` key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Local => "local",
            Self::Hotspots => "hotspots",
        }
    }

    /// Local replica table name.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::National => "directory_national",
            Self::Local => "directory_local",
            Self::Hotspots => "directory_hotspots",
        }
    }

    /// Human-readable label for progress output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::National => "National permits",
            Self::Local => "Local permits",
            Self::Hotspots => "Hotspots",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" => Ok(Self::National),
            "local" => Ok(Self::Local),
            "hotspot" | "hotspots" => Ok(Self::Hotspots),
            other => Err(Error::InvalidInput(format!("unknown category: {other}"))),
        }
    }
}

/// A value per category, used for progress and sync reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub national: T,
    pub local: T,
    pub hotspots: T,
}

impl<T> PerCategory<T> {
    pub const fn get(&self, category: Category) -> &T {
        match category {
            Category::National => &self.national,
            Category::Local => &self.local,
            Category::Hotspots => &self.hotspots,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::National => &mut self.national,
            Category::Local => &mut self.local,
            Category::Hotspots => &mut self.hotspots,
        }
    }
}
