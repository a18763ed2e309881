//! Weighted expense splitting.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::money::round2;

/// Allowed drift from exactly 100% when summing percentages.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// One participant's share as requested by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareRequest {
    pub user_id: i64,
    pub percentage: f64,
}

/// A computed share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Share {
    pub user_id: i64,
    pub percentage: f64,
    pub amount: f64,
}

/// Check that a split request is well formed.
pub fn validate(shares: &[ShareRequest]) -> Result<()> {
    if shares.is_empty() {
        return Err(CoreError::EmptySplit);
    }

    let mut seen = HashSet::new();
    for share in shares {
        if !(share.percentage > 0.0 && share.percentage <= 100.0) {
            return Err(CoreError::InvalidPercentage(share.percentage));
        }
        if !seen.insert(share.user_id) {
            return Err(CoreError::DuplicateParticipant(share.user_id));
        }
    }

    let total: f64 = shares.iter().map(|s| s.percentage).sum();
    if (total - 100.0).abs() > PERCENT_TOLERANCE {
        return Err(CoreError::SplitTotal { total });
    }

    Ok(())
}

/// Split `amount` by percentage. The last participant absorbs the rounding
/// remainder so the shares always add up to `amount`.
pub fn compute(amount: f64, shares: &[ShareRequest]) -> Result<Vec<Share>> {
    if amount <= 0.0 {
        return Err(CoreError::NonPositiveAmount(amount));
    }
    validate(shares)?;

    let mut allocated = 0.0;
    let last = shares.len() - 1;

    Ok(shares
        .iter()
        .enumerate()
        .map(|(idx, req)| {
            let value = if idx == last {
                round2(amount - allocated)
            } else {
                round2(amount * req.percentage / 100.0)
            };
            allocated += value;
            Share {
                user_id: req.user_id,
                percentage: req.percentage,
                amount: value,
            }
        })
        .collect())
}

/// Even split among `user_ids`.
pub fn equal_shares(user_ids: &[i64]) -> Vec<ShareRequest> {
    if user_ids.is_empty() {
        return Vec::new();
    }
    let each = round2(100.0 / user_ids.len() as f64);
    let last = user_ids.len() - 1;
    user_ids
        .iter()
        .enumerate()
        .map(|(idx, &user_id)| ShareRequest {
            user_id,
            percentage: if idx == last {
                round2(100.0 - each * last as f64)
            } else {
                each
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(user_id: i64, percentage: f64) -> ShareRequest {
        ShareRequest { user_id, percentage }
    }

    #[test]
    fn test_compute_weighted() {
        let shares = compute(300.0, &[req(1, 50.0), req(2, 30.0), req(3, 20.0)]).unwrap();
        let amounts: Vec<f64> = shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![150.0, 90.0, 60.0]);
    }

    #[test]
    fn test_last_share_absorbs_rounding() {
        let shares = compute(100.0, &equal_shares(&[1, 2, 3])).unwrap();
        let total: f64 = shares.iter().map(|s| s.amount).sum();
        assert_eq!(shares[0].amount, 33.33);
        assert_eq!(shares[2].amount, 33.34);
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_total_not_100() {
        let err = compute(100.0, &[req(1, 50.0), req(2, 40.0)]).unwrap_err();
        assert!(matches!(err, CoreError::SplitTotal { .. }));

        let err = validate(&[req(1, 60.0), req(2, 60.0)]).unwrap_err();
        assert!(matches!(err, CoreError::SplitTotal { .. }));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(validate(&[]), Err(CoreError::EmptySplit));
        assert_eq!(
            validate(&[req(1, 50.0), req(1, 50.0)]),
            Err(CoreError::DuplicateParticipant(1))
        );
        assert_eq!(
            validate(&[req(1, 0.0), req(2, 100.0)]),
            Err(CoreError::InvalidPercentage(0.0))
        );
    }

    #[test]
    fn test_equal_shares_sum_to_100() {
        let shares = equal_shares(&[1, 2, 3]);
        assert!(validate(&shares).is_ok());
        assert!(equal_shares(&[]).is_empty());
    }
}
