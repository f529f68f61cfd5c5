//! # Trust Indicator
//!
//! Aggregates the confirmation history into one advisory signal. The
//! signal is display-only: it never changes whether a response is used.

use crate::domain::{ConfirmationRound, TrustPalette, TrustSignal};

/// Compute the trust signal over a set of rounds.
///
/// Each round counts the primary node as one implicit confirmation.
pub fn compute_trust<'a>(
    rounds: impl IntoIterator<Item = &'a ConfirmationRound>,
    palette: &TrustPalette,
    rejection_weight: f64,
) -> TrustSignal {
    let (confirmations, rejections) = rounds.into_iter().fold((0, 0), |(c, r), round| {
        (
            c + 1 + round.confirming_nodes().len(),
            r + round.rejecting_nodes().len(),
        )
    });
    trust_from_counts(confirmations, rejections, palette, rejection_weight)
}

/// `ratio = min(1, weight * rejections / confirmations)`; zero confirmations
/// or a zero ratio yield the neutral color.
pub fn trust_from_counts(
    confirmations: usize,
    rejections: usize,
    palette: &TrustPalette,
    rejection_weight: f64,
) -> TrustSignal {
    if confirmations == 0 {
        return TrustSignal {
            rejections,
            ..TrustSignal::neutral(palette)
        };
    }

    let ratio = (rejection_weight * rejections as f64 / confirmations as f64).min(1.0);
    if ratio <= 0.0 {
        return TrustSignal {
            confirmations,
            rejections,
            ..TrustSignal::neutral(palette)
        };
    }

    TrustSignal {
        color: palette.warning.lerp(palette.danger, ratio),
        has_rejections: true,
        rejection_ratio: ratio,
        confirmations,
        rejections,
    }
}
