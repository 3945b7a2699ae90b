// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use crate::tensor::{SphericalTensor, SymmTensor, Tensor, Vector};

/// The result category of an expression. Every sort exists in a cell-mesh
/// and a point-mesh variant; that axis lives on [`Value::on_points`], not
/// here, because the operator tables are identical for both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Scalar,
    Vector,
    Tensor,
    SymmTensor,
    SphericalTensor,
    Logical,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Sort::Scalar => "scalar",
            Sort::Vector => "vector",
            Sort::Tensor => "tensor",
            Sort::SymmTensor => "symmTensor",
            Sort::SphericalTensor => "sphericalTensor",
            Sort::Logical => "logical",
        };
        write!(f, "{name}")
    }
}

/// One field of per-element values. Ownership is moved between semantic
/// actions, so each intermediate result is consumed exactly once -- the
/// manual-delete discipline of the original becomes a compiler guarantee.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Scalar(Vec<f64>),
    Vector(Vec<Vector>),
    Tensor(Vec<Tensor>),
    SymmTensor(Vec<SymmTensor>),
    SphericalTensor(Vec<SphericalTensor>),
    Logical(Vec<bool>),
}

impl FieldData {
    pub fn len(&self) -> usize {
        match self {
            FieldData::Scalar(f) => f.len(),
            FieldData::Vector(f) => f.len(),
            FieldData::Tensor(f) => f.len(),
            FieldData::SymmTensor(f) => f.len(),
            FieldData::SphericalTensor(f) => f.len(),
            FieldData::Logical(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sort(&self) -> Sort {
        match self {
            FieldData::Scalar(_) => Sort::Scalar,
            FieldData::Vector(_) => Sort::Vector,
            FieldData::Tensor(_) => Sort::Tensor,
            FieldData::SymmTensor(_) => Sort::SymmTensor,
            FieldData::SphericalTensor(_) => Sort::SphericalTensor,
            FieldData::Logical(_) => Sort::Logical,
        }
    }
}

/// A computed field value plus which mesh it lives on.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub data: FieldData,
    pub on_points: bool,
}

impl Value {
    pub fn new(data: FieldData, on_points: bool) -> Self {
        Value { data, on_points }
    }

    pub fn scalar(f: Vec<f64>, on_points: bool) -> Self {
        Value::new(FieldData::Scalar(f), on_points)
    }

    pub fn vector(f: Vec<Vector>, on_points: bool) -> Self {
        Value::new(FieldData::Vector(f), on_points)
    }

    pub fn tensor(f: Vec<Tensor>, on_points: bool) -> Self {
        Value::new(FieldData::Tensor(f), on_points)
    }

    pub fn symm_tensor(f: Vec<SymmTensor>, on_points: bool) -> Self {
        Value::new(FieldData::SymmTensor(f), on_points)
    }

    pub fn spherical_tensor(f: Vec<SphericalTensor>, on_points: bool) -> Self {
        Value::new(FieldData::SphericalTensor(f), on_points)
    }

    pub fn logical(f: Vec<bool>, on_points: bool) -> Self {
        Value::new(FieldData::Logical(f), on_points)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sort(&self) -> Sort {
        self.data.sort()
    }

    pub fn as_scalar(&self) -> Option<&[f64]> {
        match &self.data {
            FieldData::Scalar(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_logical(&self) -> Option<&[bool]> {
        match &self.data {
            FieldData::Logical(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Vector]> {
        match &self.data {
            FieldData::Vector(f) => Some(f),
            _ => None,
        }
    }
}
