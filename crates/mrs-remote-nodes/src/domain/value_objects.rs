//! # Domain Value Objects
//!
//! Immutable value types for remote node confirmation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ConfirmationError;

/// A remote node known to the registry.
///
/// Deserializes directly from a peer-info object of the node API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNode {
    /// Network address the peer was seen at.
    pub address: String,
    /// Address the peer announces for itself.
    #[serde(default)]
    pub announced_address: Option<String>,
    /// Excluded from validator selection when set.
    #[serde(default)]
    pub blacklisted: bool,
    /// Port of the node's JSON API, when the peer advertises one.
    #[serde(default)]
    pub api_port: Option<u16>,
    /// Application name reported by the peer.
    #[serde(default)]
    pub application: Option<String>,
    /// Application version reported by the peer.
    #[serde(default)]
    pub version: Option<String>,
}

impl RemoteNode {
    /// Create a node known only by its address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            announced_address: None,
            blacklisted: false,
            api_port: None,
            application: None,
            version: None,
        }
    }

    /// Set the announced address.
    pub fn with_announced_address(mut self, announced: impl Into<String>) -> Self {
        self.announced_address = Some(announced.into());
        self
    }

    /// Set the API port.
    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = Some(port);
        self
    }

    /// Mark as blacklisted.
    pub fn blacklisted(mut self) -> Self {
        self.blacklisted = true;
        self
    }

    /// Is this node excluded from validator selection?
    pub fn is_blacklisted(&self) -> bool {
        self.blacklisted
    }

    /// Host to contact: the announced address when present.
    pub fn host(&self) -> &str {
        self.announced_address.as_deref().unwrap_or(&self.address)
    }
}

impl fmt::Display for RemoteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// RGB color used by the trust indicator.
///
/// Serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation towards `to`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
        };
        Rgb::new(mix(self.r, to.r), mix(self.g, to.g), mix(self.b, to.b))
    }

    /// Hex notation, e.g. `#f39c12`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfirmationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.strip_prefix('#').unwrap_or(&value);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConfirmationError::InvalidConfig(format!(
                "color must be #rrggbb, got {value}"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| {
                ConfirmationError::InvalidConfig(format!("bad color {value}: {e}"))
            })
        };
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

/// Colors the trust indicator chooses from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrustPalette {
    /// No rejections (or nothing recorded yet).
    pub neutral: Rgb,
    /// Lowest non-zero rejection ratio.
    pub warning: Rgb,
    /// Rejection ratio of 1.
    pub danger: Rgb,
}

impl Default for TrustPalette {
    fn default() -> Self {
        Self {
            neutral: Rgb::new(0x00, 0xa6, 0x5a),
            warning: Rgb::new(0xf3, 0x9c, 0x12),
            danger: Rgb::new(0xdd, 0x4b, 0x39),
        }
    }
}

/// Aggregate trust signal published to the rendering layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrustSignal {
    /// Indicator color.
    pub color: Rgb,
    /// Icon state: did any validator disagree?
    pub has_rejections: bool,
    /// `min(1, weight * rejections / confirmations)`.
    pub rejection_ratio: f64,
    /// Confirmations counted (primary votes included).
    pub confirmations: usize,
    /// Rejections counted.
    pub rejections: usize,
}

impl TrustSignal {
    /// Signal shown before anything has been recorded.
    pub fn neutral(palette: &TrustPalette) -> Self {
        Self {
            color: palette.neutral,
            has_rejections: false,
            rejection_ratio: 0.0,
            confirmations: 0,
            rejections: 0,
        }
    }
}

/// How a single validator reply was classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyOutcome {
    /// Normalized reply matched the primary's.
    Confirming,
    /// Normalized reply diverged from the primary's.
    Rejecting,
    /// Error reply or transport failure; not counted.
    Discounted,
    /// No reply before the round deadline; not counted.
    TimedOut,
}

impl ReplyOutcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyOutcome::Confirming => "confirming",
            ReplyOutcome::Rejecting => "rejecting",
            ReplyOutcome::Discounted => "discounted",
            ReplyOutcome::TimedOut => "timed_out",
        }
    }
}
