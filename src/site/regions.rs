//! Amazon regional storefronts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amazon storefronts the Amazon layout can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Uk,
    De,
    Fr,
    Es,
    It,
    Ca,
    Au,
    Jp,
    In,
}

impl Region {
    /// Returns the storefront domain.
    pub fn domain(&self) -> &'static str {
        match self {
            Region::Us => "amazon.com",
            Region::Uk => "amazon.co.uk",
            Region::De => "amazon.de",
            Region::Fr => "amazon.fr",
            Region::Es => "amazon.es",
            Region::It => "amazon.it",
            Region::Ca => "amazon.ca",
            Region::Au => "amazon.com.au",
            Region::Jp => "amazon.co.jp",
            Region::In => "amazon.in",
        }
    }

    /// Returns the storefront base URL.
    pub fn base_url(&self) -> String {
        format!("https://www.{}", self.domain())
    }

    /// Returns the Accept-Language header sent to this storefront.
    pub fn accept_language(&self) -> &'static str {
        match self {
            Region::Us | Region::Ca | Region::Au => "en-US,en;q=0.9",
            Region::Uk => "en-GB,en;q=0.9",
            Region::In => "en-IN,en;q=0.9,hi;q=0.8",
            Region::De => "de-DE,de;q=0.9,en;q=0.8",
            Region::Fr => "fr-FR,fr;q=0.9,en;q=0.8",
            Region::Es => "es-ES,es;q=0.9,en;q=0.8",
            Region::It => "it-IT,it;q=0.9,en;q=0.8",
            Region::Jp => "ja-JP,ja;q=0.9,en;q=0.8",
        }
    }

    pub fn all() -> &'static [Region] {
        &[
            Region::Us,
            Region::Uk,
            Region::De,
            Region::Fr,
            Region::Es,
            Region::It,
            Region::Ca,
            Region::Au,
            Region::Jp,
            Region::In,
        ]
    }

    fn code(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Uk => "uk",
            Region::De => "de",
            Region::Fr => "fr",
            Region::Es => "es",
            Region::It => "it",
            Region::Ca => "ca",
            Region::Au => "au",
            Region::Jp => "jp",
            Region::In => "in",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = RegionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let alias = match wanted.as_str() {
            "usa" => "us",
            "gb" => "uk",
            other => other,
        };
        Region::all()
            .iter()
            .copied()
            .find(|r| r.code() == alias)
            .ok_or_else(|| RegionParseError(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct RegionParseError(String);

impl fmt::Display for RegionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = Region::all().iter().map(|r| r.to_string()).collect();
        write!(f, "Unknown region '{}'. Valid regions: {}", self.0, codes.join(", "))
    }
}

impl std::error::Error for RegionParseError {}
