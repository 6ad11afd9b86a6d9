use core::str::FromStr;

use serde::{Deserialize, Serialize};

use configserver_core::DomainError;

/// Deployment stage that partitions item values.
///
/// The wire form is exactly one of the four upper-case literals; parsing is
/// case-sensitive and rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Dev,
    Test,
    Stage,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Dev,
        Environment::Test,
        Environment::Stage,
        Environment::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Test => "TEST",
            Environment::Stage => "STAGE",
            Environment::Prod => "PROD",
        }
    }
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid environment '{s}' (expected one of DEV, TEST, STAGE, PROD)"
                ))
            })
    }
}
