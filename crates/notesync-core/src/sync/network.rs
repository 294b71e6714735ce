//! Network conditions that gate synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current network link as reported by the host platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Offline,
    /// Mobile data or another link billed per use
    Metered,
    /// Wi-Fi or ethernet
    Unmetered,
}

impl Connectivity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Metered => "metered",
            Self::Unmetered => "unmetered",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" | "none" => Ok(Self::Offline),
            "metered" | "mobile" => Ok(Self::Metered),
            "unmetered" | "wifi" | "ethernet" => Ok(Self::Unmetered),
            other => Err(format!("unknown connectivity: {other}")),
        }
    }
}

/// Connectivity combined with the user's Wi-Fi-only preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub connectivity: Connectivity,
    pub sync_only_on_wifi: bool,
}

impl NetworkStatus {
    pub const fn new(connectivity: Connectivity, sync_only_on_wifi: bool) -> Self {
        Self {
            connectivity,
            sync_only_on_wifi,
        }
    }

    /// Whether a sync round may touch the network right now
    pub const fn is_sync_possible(self) -> bool {
        match self.connectivity {
            Connectivity::Offline => false,
            Connectivity::Metered => !self.sync_only_on_wifi,
            Connectivity::Unmetered => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_possible_matrix() {
        let cases = [
            (Connectivity::Offline, false, false),
            (Connectivity::Offline, true, false),
            (Connectivity::Metered, false, true),
            (Connectivity::Metered, true, false),
            (Connectivity::Unmetered, false, true),
            (Connectivity::Unmetered, true, true),
        ];
        for (connectivity, wifi_only, expected) in cases {
            assert_eq!(
                NetworkStatus::new(connectivity, wifi_only).is_sync_possible(),
                expected,
                "{connectivity} wifi_only={wifi_only}"
            );
        }
    }

    #[test]
    fn test_default_is_offline() {
        assert!(!NetworkStatus::default().is_sync_possible());
    }

    #[test]
    fn test_parse_connectivity() {
        assert_eq!("WiFi".parse::<Connectivity>().unwrap(), Connectivity::Unmetered);
        assert_eq!("metered".parse::<Connectivity>().unwrap(), Connectivity::Metered);
        assert!("carrier-pigeon".parse::<Connectivity>().is_err());
    }
}
