//! Ensemble reduction.
//!
//! Reanalyses such as ERA5 ship an ensemble axis (`number`). Before spatial
//! selection every field is collapsed to a single member so that all aligned
//! datasets share the same shape.

use crate::errors::{BenchError, BenchResult};
use crate::field::GriddedField;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

/// How an ensemble axis is collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsemblePolicy {
    /// Mean over members, skipping NaN members per value
    #[default]
    Mean,
    /// A single member by position along the ensemble axis
    Member(usize),
}

/// Collapses the ensemble axis of `field` according to `policy`.
///
/// A field without an ensemble axis is returned unchanged whatever the
/// policy. A value whose members are all NaN stays NaN under
/// [`EnsemblePolicy::Mean`].
pub fn reduce_ensemble(field: &GriddedField, policy: EnsemblePolicy) -> BenchResult<GriddedField> {
    if !field.has_ensemble() {
        return Ok(field.clone());
    }

    let values = field.values();
    let reduced: Array3<f64> = match policy {
        EnsemblePolicy::Mean => values.map_axis(Axis(1), |members| {
            let (sum, count) = members
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        }),
        EnsemblePolicy::Member(index) => {
            if index >= field.n_members() {
                return Err(BenchError::InvalidMember {
                    index,
                    available: field.n_members(),
                });
            }
            values.index_axis(Axis(1), index).to_owned()
        }
    };
    log::debug!(
        "Reduced {} ensemble members of '{}' with {:?}",
        field.n_members(),
        field.source(),
        policy
    );
    field.with_single_member(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, TimeAxis};
    use crate::units::Units;
    use is_close::is_close;
    use ndarray::{array, Array4};

    fn ensemble_field() -> GriddedField {
        // one time step, three members, one cell
        let values = Array4::from_shape_vec((1, 3, 1, 1), vec![1.0, f64::NAN, 3.0]).unwrap();
        GriddedField::with_members(
            "ERA5",
            Units::mm_per_day(),
            TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
            vec![0.0, 1.0, 2.0],
            vec![35.0],
            vec![75.0],
            values,
        )
        .unwrap()
    }

    #[test]
    fn test_mean_skips_nan_members() {
        let reduced = reduce_ensemble(&ensemble_field(), EnsemblePolicy::Mean).unwrap();
        assert!(!reduced.has_ensemble());
        assert_eq!(reduced.values().shape(), &[1, 1, 1, 1]);
        assert!(is_close!(reduced.values()[[0, 0, 0, 0]], 2.0));
    }

    #[test]
    fn test_member_selects_by_position() {
        let reduced = reduce_ensemble(&ensemble_field(), EnsemblePolicy::Member(2)).unwrap();
        assert_eq!(reduced.values()[[0, 0, 0, 0]], 3.0);
    }

    #[test]
    fn test_member_out_of_range() {
        match reduce_ensemble(&ensemble_field(), EnsemblePolicy::Member(3)) {
            Err(BenchError::InvalidMember { index, available }) => {
                assert_eq!((index, available), (3, 3))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_fields_without_ensemble_are_unchanged() {
        let field = GriddedField::new(
            "CRU",
            Units::mm_per_day(),
            TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
            vec![35.0],
            vec![75.0],
            array![[[4.0]]],
        )
        .unwrap();
        assert_eq!(reduce_ensemble(&field, EnsemblePolicy::Member(5)).unwrap(), field);
    }

    #[test]
    fn test_policy_deserializes_from_config_names() {
        let mean: EnsemblePolicy = serde_json::from_str("\"mean\"").unwrap();
        let member: EnsemblePolicy = serde_json::from_str("{\"member\": 1}").unwrap();
        assert_eq!(mean, EnsemblePolicy::Mean);
        assert_eq!(member, EnsemblePolicy::Member(1));
    }
}
