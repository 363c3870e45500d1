//! External headline feed: fetching, normalisation, near-duplicate removal
//! and matching against internal stories.

pub mod dedup;
pub mod feed;
pub mod headlines;
pub mod matching;
pub mod retry;

use std::fmt;
use std::str::FromStr;

use crate::error::PlaygroundError;

/// Category label given to headlines from the top-news search feed.
pub const TOP_HEADLINES_CATEGORY: &str = "TopGeneralHeadlines";

const GB_CATEGORIES: &[&str] = &[
    "Business",
    "Entertainment",
    "Health",
    "Politics",
    "ScienceAndTechnology",
    "Sports",
    "UK",
    "World",
];

const US_CATEGORIES: &[&str] = &[
    "Business",
    "Entertainment",
    "Health",
    "Politics",
    "Products",
    "ScienceAndTechnology",
    "Technology",
    "Science",
    "Sports",
    "US",
    "World",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Gb,
    Us,
}

impl Market {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gb => "GB",
            Self::Us => "US",
        }
    }

    /// Value of the feed's `mkt` parameter.
    pub fn language_tag(&self) -> &'static str {
        match self {
            Self::Gb => "en-GB",
            Self::Us => "en-US",
        }
    }

    /// Categories fetched for this market, in fetch order.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Self::Gb => GB_CATEGORIES,
            Self::Us => US_CATEGORIES,
        }
    }
}

impl FromStr for Market {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GB" => Ok(Self::Gb),
            "US" => Ok(Self::Us),
            other => Err(PlaygroundError::InvalidMarket(other.to_string())),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
