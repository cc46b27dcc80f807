//! Stream identifiers
//!
//! A stream is addressed by the classic 4-tuple of network, station,
//! location and channel codes. The location code may be empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Identifies one physical sensor channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    network: String,
    station: String,
    location: String,
    channel: String,
}

impl StreamId {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
        }
    }

    #[inline]
    pub fn network(&self) -> &str {
        &self.network
    }

    #[inline]
    pub fn station(&self) -> &str {
        &self.station
    }

    #[inline]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The channel code without its component letter, e.g. `BH` for `BHZ`.
    pub fn channel_band(&self) -> &str {
        if self.channel.is_empty() {
            &self.channel
        } else {
            &self.channel[..self.channel.len() - 1]
        }
    }

    /// The component letter of the channel code, e.g. `Z` for `BHZ`.
    pub fn component(&self) -> Option<char> {
        self.channel.chars().last()
    }

    /// The same stream id with the channel component letter replaced.
    pub fn with_component(&self, component: &str) -> StreamId {
        StreamId {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: format!("{}{}", self.channel_band(), component),
        }
    }

    /// True if `other` addresses the same sensor, ignoring the component
    /// letter of the channel code.
    pub fn same_sensor(&self, other: &StreamId) -> bool {
        self.network == other.network
            && self.station == other.station
            && self.location == other.location
            && self.channel_band() == other.channel_band()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

impl FromStr for StreamId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let network = parts.next();
        let station = parts.next();
        let location = parts.next();
        let channel = parts.next();
        match (network, station, location, channel, parts.next()) {
            (Some(net), Some(sta), Some(loc), Some(cha), None) => {
                Ok(StreamId::new(net, sta, loc, cha))
            }
            _ => Err(CoreError::InvalidStreamId(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        let id = StreamId::new("GE", "MORC", "", "BHE");
        assert_eq!(id.to_string(), "GE.MORC..BHE");
        assert_eq!("GE.MORC..BHE".parse::<StreamId>().unwrap(), id);
    }

    #[test]
    fn test_component_handling() {
        let id = StreamId::new("XX", "ABCD", "00", "BHZ");
        assert_eq!(id.channel_band(), "BH");
        assert_eq!(id.component(), Some('Z'));
        assert_eq!(id.with_component("N").channel(), "BHN");
        assert!(id.same_sensor(&id.with_component("E")));
        assert!(!id.same_sensor(&StreamId::new("XX", "ABCD", "01", "BHZ")));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("GE.MORC.BHE".parse::<StreamId>().is_err());
        assert!("GE.MORC..BHE.X".parse::<StreamId>().is_err());
    }
}
