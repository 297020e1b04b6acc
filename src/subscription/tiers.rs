use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered subscription level. A higher tier unlocks everything below it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum SubscriptionTier {
    Basic = 1,
    Premium = 2,
    Ultimate = 3,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] =
        [SubscriptionTier::Basic, SubscriptionTier::Premium, SubscriptionTier::Ultimate];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(SubscriptionTier::Basic),
            2 => Some(SubscriptionTier::Premium),
            3 => Some(SubscriptionTier::Ultimate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "Basic",
            SubscriptionTier::Premium => "Premium",
            SubscriptionTier::Ultimate => "Ultimate",
        }
    }

    /// Monthly price in MIST.
    pub fn price(self) -> u64 {
        match self {
            SubscriptionTier::Basic => 5_000_000_000,
            SubscriptionTier::Premium => 10_000_000_000,
            SubscriptionTier::Ultimate => 15_000_000_000,
        }
    }

    pub fn features(self) -> &'static [&'static str] {
        match self {
            SubscriptionTier::Basic => &[
                "Access to basic content",
                "SD quality streaming",
                "Watch on 1 device",
            ],
            SubscriptionTier::Premium => &[
                "Access to all basic content",
                "HD quality streaming",
                "Watch on 2 devices",
                "Download content",
            ],
            SubscriptionTier::Ultimate => &[
                "Access to all content",
                "4K + HDR quality",
                "Watch on 4 devices",
                "Download content",
                "Early access to new releases",
            ],
        }
    }

    /// `price * months`, or `None` on overflow.
    pub fn cost(self, months: u64) -> Option<u64> {
        self.price().checked_mul(months)
    }

    pub fn info(self) -> TierInfo {
        TierInfo {
            id: self.as_u8(),
            name: self.name(),
            price: self.price(),
            features: self.features(),
        }
    }
}

impl TryFrom<u8> for SubscriptionTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("invalid subscription tier: {}", value))
    }
}

impl From<SubscriptionTier> for u8 {
    fn from(tier: SubscriptionTier) -> Self {
        tier.as_u8()
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierInfo {
    pub id: u8,
    pub name: &'static str,
    pub price: u64,
    pub features: &'static [&'static str],
}

pub fn all_tiers() -> Vec<TierInfo> {
    SubscriptionTier::ALL.iter().map(|tier| tier.info()).collect()
}
