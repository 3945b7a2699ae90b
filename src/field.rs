// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Elementwise field plumbing: the sameSize check every binary operation
//! goes through, zip/map combinators, and the empty-field reduction
//! sentinels.

use crate::common::{EquationResult, Loc};
use crate::eqn_err;
use crate::tensor::Vector;

/// The conventional extreme substituted when reducing an empty field, so a
/// process owning zero elements cannot corrupt a cross-process min/max.
pub const HUGE: f64 = 1e40;

/// Every binary and ternary field operation requires equal element counts.
pub fn same_size(a: usize, b: usize, loc: Loc) -> EquationResult<()> {
    if a == b {
        Ok(())
    } else {
        eqn_err!(
            SizeMismatch,
            loc.start,
            loc.end,
            "operands have different sizes: {a} and {b}"
        )
    }
}

pub fn zip_map<T, U, V, F>(a: Vec<T>, b: Vec<U>, loc: Loc, f: F) -> EquationResult<Vec<V>>
where
    F: Fn(T, U) -> V,
{
    same_size(a.len(), b.len(), loc)?;
    Ok(a.into_iter().zip(b).map(|(x, y)| f(x, y)).collect())
}

pub fn zip3_map<T, U, W, V, F>(
    a: Vec<T>,
    b: Vec<U>,
    c: Vec<W>,
    loc: Loc,
    f: F,
) -> EquationResult<Vec<V>>
where
    F: Fn(T, U, W) -> V,
{
    same_size(a.len(), b.len(), loc)?;
    same_size(a.len(), c.len(), loc)?;
    Ok(a.into_iter()
        .zip(b)
        .zip(c)
        .map(|((x, y), z)| f(x, y, z))
        .collect())
}

pub fn map_field<T, V, F>(a: Vec<T>, f: F) -> Vec<V>
where
    F: Fn(T) -> V,
{
    a.into_iter().map(f).collect()
}

pub fn uniform<T: Clone>(v: T, n: usize) -> Vec<T> {
    vec![v; n]
}

/// Local min fold; `HUGE` for an empty field (applied before any
/// cross-process combine).
pub fn fold_min(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(HUGE, f64::min)
}

/// Local max fold; `-HUGE` for an empty field.
pub fn fold_max(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(-HUGE, f64::max)
}

pub fn fold_sum(xs: &[f64]) -> f64 {
    xs.iter().sum()
}

/// Componentwise vector min fold; `(+HUGE, +HUGE, +HUGE)` when empty.
pub fn fold_min_vec(xs: &[Vector]) -> Vector {
    xs.iter().fold(Vector::uniform(HUGE), |acc, v| acc.min(v))
}

pub fn fold_max_vec(xs: &[Vector]) -> Vector {
    xs.iter().fold(Vector::uniform(-HUGE), |acc, v| acc.max(v))
}

pub fn fold_sum_vec(xs: &[Vector]) -> Vector {
    xs.iter().fold(Vector::default(), |acc, v| acc + *v)
}

/// Index of the minimum element, None for an empty field.
pub fn arg_min(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

pub fn arg_max(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    #[test]
    fn same_size_reports_both_lengths() {
        assert!(same_size(10, 10, Loc::new(0, 5)).is_ok());

        let err = same_size(10, 9, Loc::new(2, 5)).unwrap_err();
        assert_eq!(ErrorCode::SizeMismatch, err.code);
        assert_eq!(2, err.start);
        assert_eq!(5, err.end);
        let details = err.details.unwrap();
        assert!(details.contains("10") && details.contains("9"), "{details}");
    }

    #[test]
    fn empty_reduction_sentinels() {
        assert_eq!(HUGE, fold_min(&[]));
        assert_eq!(-HUGE, fold_max(&[]));
        assert_eq!(0.0, fold_sum(&[]));
        assert_eq!(Vector::uniform(HUGE), fold_min_vec(&[]));
        assert_eq!(Vector::uniform(-HUGE), fold_max_vec(&[]));
    }

    #[test]
    fn folds() {
        assert_eq!(1.0, fold_min(&[3.0, 1.0, 2.0]));
        assert_eq!(3.0, fold_max(&[3.0, 1.0, 2.0]));
        assert_eq!(6.0, fold_sum(&[3.0, 1.0, 2.0]));
        assert_eq!(Some(1), arg_min(&[3.0, 1.0, 2.0]));
        assert_eq!(Some(0), arg_max(&[3.0, 1.0, 2.0]));
        assert_eq!(None, arg_min(&[]));
    }

    #[test]
    fn zip_checks_sizes() {
        let r = zip_map(vec![1.0, 2.0], vec![3.0], Loc::new(0, 3), |a, b| a + b);
        assert_eq!(ErrorCode::SizeMismatch, r.unwrap_err().code);

        let r = zip_map(vec![1.0, 2.0], vec![3.0, 4.0], Loc::new(0, 3), |a, b| a + b);
        assert_eq!(vec![4.0, 6.0], r.unwrap());
    }
}
