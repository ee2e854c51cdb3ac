use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Localized variant of a published table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Language {
    #[default]
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "fra")]
    French,
}

impl Language {
    /// Tag used in download URLs and cache paths.
    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::French => "fra",
        }
    }

    /// Field separator of the published CSV.
    ///
    /// French tables use `;` because `,` is their decimal separator.
    pub fn delimiter(self) -> u8 {
        match self {
            Language::English => b',',
            Language::French => b';',
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eng" => Ok(Language::English),
            "fra" => Ok(Language::French),
            _ => Err(Error::UnknownLanguage(s.to_string())),
        }
    }
}
