// Regional accounts servers

use std::fmt;
use std::str::FromStr;

use crate::error::ZohoError;

/// Data-centre region whose accounts server issues tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    UnitedStates,
    Europe,
    India,
    Australia,
    Japan,
    Canada,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::UnitedStates,
        Domain::Europe,
        Domain::India,
        Domain::Australia,
        Domain::Japan,
        Domain::Canada,
    ];

    /// Lower-case name accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            Domain::UnitedStates => "united states",
            Domain::Europe => "europe",
            Domain::India => "india",
            Domain::Australia => "australia",
            Domain::Japan => "japan",
            Domain::Canada => "canada",
        }
    }

    /// Base URL of the OAuth authorization server, with trailing slash
    pub fn accounts_url(&self) -> &'static str {
        match self {
            Domain::UnitedStates => "https://accounts.zoho.com/",
            Domain::Europe => "https://accounts.zoho.eu/",
            Domain::India => "https://accounts.zoho.in/",
            Domain::Australia => "https://accounts.zoho.com.au/",
            Domain::Japan => "https://accounts.zoho.jp/",
            Domain::Canada => "https://accounts.zohocloud.ca/",
        }
    }
}

impl FromStr for Domain {
    type Err = ZohoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Domain::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| ZohoError::ConfigError(format!("Unknown domain name: {:?}", s)))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
