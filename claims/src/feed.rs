use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which claims a feed shows, and in what order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedFilter {
    /// Every claim, newest first.
    #[default]
    All,
    /// Open claims by total stake, highest first.
    Trending,
    /// Sealed claims, most recently sealed first.
    Sealed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown feed filter {0:?}")]
pub struct ParseFeedFilterError(pub String);

impl FromStr for FeedFilter {
    type Err = ParseFeedFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "trending" => Ok(Self::Trending),
            "sealed" => Ok(Self::Sealed),
            other => Err(ParseFeedFilterError(other.to_string())),
        }
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Trending => "trending",
            Self::Sealed => "sealed",
        })
    }
}
