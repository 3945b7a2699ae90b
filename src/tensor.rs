// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Per-element value algebra: 3-vectors, second-rank tensors, symmetric
//! tensors, and spherical tensors, with the products and decompositions the
//! expression language exposes.

use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yx: f64,
    pub yy: f64,
    pub yz: f64,
    pub zx: f64,
    pub zy: f64,
    pub zz: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SymmTensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

/// A spherical tensor is `ii * I`; a single component is enough.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SphericalTensor {
    pub ii: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector { x, y, z }
    }

    pub fn uniform(s: f64) -> Self {
        Vector { x: s, y: s, z: s }
    }

    pub fn dot(&self, rhs: &Vector) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Vector) -> Vector {
        Vector {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// outer product `a * b`, a full tensor
    pub fn outer(&self, rhs: &Vector) -> Tensor {
        Tensor {
            xx: self.x * rhs.x,
            xy: self.x * rhs.y,
            xz: self.x * rhs.z,
            yx: self.y * rhs.x,
            yy: self.y * rhs.y,
            yz: self.y * rhs.z,
            zx: self.z * rhs.x,
            zy: self.z * rhs.y,
            zz: self.z * rhs.z,
        }
    }

    /// outer square `sqr(v)`, symmetric by construction
    pub fn outer_sqr(&self) -> SymmTensor {
        SymmTensor {
            xx: self.x * self.x,
            xy: self.x * self.y,
            xz: self.x * self.z,
            yy: self.y * self.y,
            yz: self.y * self.z,
            zz: self.z * self.z,
        }
    }

    pub fn mag_sqr(&self) -> f64 {
        self.dot(self)
    }

    pub fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    pub fn min(&self, rhs: &Vector) -> Vector {
        Vector {
            x: self.x.min(rhs.x),
            y: self.y.min(rhs.y),
            z: self.z.min(rhs.z),
        }
    }

    pub fn max(&self, rhs: &Vector) -> Vector {
        Vector {
            x: self.x.max(rhs.x),
            y: self.y.max(rhs.y),
            z: self.z.max(rhs.z),
        }
    }

    fn normalized(&self) -> Option<Vector> {
        let m = self.mag();
        if m > 0.0 {
            Some(*self / m)
        } else {
            None
        }
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, s: f64) -> Vector {
        Vector::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f64> for Vector {
    type Output = Vector;
    fn div(self, s: f64) -> Vector {
        Vector::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Tensor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        xx: f64,
        xy: f64,
        xz: f64,
        yx: f64,
        yy: f64,
        yz: f64,
        zx: f64,
        zy: f64,
        zz: f64,
    ) -> Self {
        Tensor {
            xx,
            xy,
            xz,
            yx,
            yy,
            yz,
            zx,
            zy,
            zz,
        }
    }

    pub fn identity() -> Self {
        Tensor::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
    }

    pub fn from_rows(a: Vector, b: Vector, c: Vector) -> Self {
        Tensor::new(a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z)
    }

    pub fn row(&self, i: usize) -> Vector {
        match i {
            0 => Vector::new(self.xx, self.xy, self.xz),
            1 => Vector::new(self.yx, self.yy, self.yz),
            _ => Vector::new(self.zx, self.zy, self.zz),
        }
    }

    pub fn col(&self, i: usize) -> Vector {
        match i {
            0 => Vector::new(self.xx, self.yx, self.zx),
            1 => Vector::new(self.xy, self.yy, self.zy),
            _ => Vector::new(self.xz, self.yz, self.zz),
        }
    }

    pub fn transpose(&self) -> Tensor {
        Tensor::new(
            self.xx, self.yx, self.zx, self.xy, self.yy, self.zy, self.xz, self.yz, self.zz,
        )
    }

    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    pub fn diag(&self) -> Vector {
        Vector::new(self.xx, self.yy, self.zz)
    }

    pub fn det(&self) -> f64 {
        self.xx * (self.yy * self.zz - self.yz * self.zy)
            - self.xy * (self.yx * self.zz - self.yz * self.zx)
            + self.xz * (self.yx * self.zy - self.yy * self.zx)
    }

    /// cofactor tensor; `cof(T) = det(T) * inv(T)^T` for invertible T
    pub fn cof(&self) -> Tensor {
        Tensor::new(
            self.yy * self.zz - self.yz * self.zy,
            self.yz * self.zx - self.yx * self.zz,
            self.yx * self.zy - self.yy * self.zx,
            self.xz * self.zy - self.xy * self.zz,
            self.xx * self.zz - self.xz * self.zx,
            self.xy * self.zx - self.xx * self.zy,
            self.xy * self.yz - self.xz * self.yy,
            self.xz * self.yx - self.xx * self.yz,
            self.xx * self.yy - self.xy * self.yx,
        )
    }

    pub fn inv(&self) -> Tensor {
        self.cof().transpose() / self.det()
    }

    pub fn symm(&self) -> SymmTensor {
        SymmTensor {
            xx: self.xx,
            xy: 0.5 * (self.xy + self.yx),
            xz: 0.5 * (self.xz + self.zx),
            yy: self.yy,
            yz: 0.5 * (self.yz + self.zy),
            zz: self.zz,
        }
    }

    pub fn two_symm(&self) -> SymmTensor {
        SymmTensor {
            xx: 2.0 * self.xx,
            xy: self.xy + self.yx,
            xz: self.xz + self.zx,
            yy: 2.0 * self.yy,
            yz: self.yz + self.zy,
            zz: 2.0 * self.zz,
        }
    }

    pub fn skew(&self) -> Tensor {
        Tensor::new(
            0.0,
            0.5 * (self.xy - self.yx),
            0.5 * (self.xz - self.zx),
            0.5 * (self.yx - self.xy),
            0.0,
            0.5 * (self.yz - self.zy),
            0.5 * (self.zx - self.xz),
            0.5 * (self.zy - self.yz),
            0.0,
        )
    }

    pub fn sph(&self) -> SphericalTensor {
        SphericalTensor {
            ii: self.trace() / 3.0,
        }
    }

    /// deviatoric part: `T - (1/3) tr(T) I`
    pub fn dev(&self) -> Tensor {
        let t = self.trace() / 3.0;
        let mut r = *self;
        r.xx -= t;
        r.yy -= t;
        r.zz -= t;
        r
    }

    /// second deviatoric part: `T - (2/3) tr(T) I`
    pub fn dev2(&self) -> Tensor {
        let t = 2.0 * self.trace() / 3.0;
        let mut r = *self;
        r.xx -= t;
        r.yy -= t;
        r.zz -= t;
        r
    }

    pub fn mag_sqr(&self) -> f64 {
        self.xx * self.xx
            + self.xy * self.xy
            + self.xz * self.xz
            + self.yx * self.yx
            + self.yy * self.yy
            + self.yz * self.yz
            + self.zx * self.zx
            + self.zy * self.zy
            + self.zz * self.zz
    }

    pub fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    /// single inner product `T & S`, the matrix product
    pub fn inner(&self, rhs: &Tensor) -> Tensor {
        let prod = |i: usize| {
            let row = self.row(i);
            Vector::new(
                row.dot(&rhs.col(0)),
                row.dot(&rhs.col(1)),
                row.dot(&rhs.col(2)),
            )
        };
        Tensor::from_rows(prod(0), prod(1), prod(2))
    }

    /// `T & v`
    pub fn dot_vec(&self, v: &Vector) -> Vector {
        Vector::new(self.row(0).dot(v), self.row(1).dot(v), self.row(2).dot(v))
    }

    /// `v & T`
    pub fn vec_dot(&self, v: &Vector) -> Vector {
        Vector::new(self.col(0).dot(v), self.col(1).dot(v), self.col(2).dot(v))
    }

    /// Real eigenvalues, ascending. Solves the characteristic cubic via the
    /// trigonometric method; for tensors with complex eigenvalue pairs this
    /// clamps into the real interval, matching the convention that the
    /// expression language only promises meaningful results for tensors with
    /// a real spectrum.
    pub fn eigen_values(&self) -> Vector {
        let i1 = self.trace();
        let t2 = self.inner(self);
        let i2 = 0.5 * (i1 * i1 - t2.trace());
        let i3 = self.det();
        solve_characteristic(i1, i2, i3)
    }

    pub fn eigen_vectors(&self) -> Tensor {
        let eigs = self.eigen_values();
        Tensor::from_rows(
            eigen_vector_for(self, eigs.x),
            eigen_vector_for(self, eigs.y),
            eigen_vector_for(self, eigs.z),
        )
    }
}

impl Add for Tensor {
    type Output = Tensor;
    fn add(self, rhs: Tensor) -> Tensor {
        Tensor::from_rows(
            self.row(0) + rhs.row(0),
            self.row(1) + rhs.row(1),
            self.row(2) + rhs.row(2),
        )
    }
}

impl Sub for Tensor {
    type Output = Tensor;
    fn sub(self, rhs: Tensor) -> Tensor {
        Tensor::from_rows(
            self.row(0) - rhs.row(0),
            self.row(1) - rhs.row(1),
            self.row(2) - rhs.row(2),
        )
    }
}

impl Neg for Tensor {
    type Output = Tensor;
    fn neg(self) -> Tensor {
        Tensor::from_rows(-self.row(0), -self.row(1), -self.row(2))
    }
}

impl Mul<f64> for Tensor {
    type Output = Tensor;
    fn mul(self, s: f64) -> Tensor {
        Tensor::from_rows(self.row(0) * s, self.row(1) * s, self.row(2) * s)
    }
}

impl Div<f64> for Tensor {
    type Output = Tensor;
    fn div(self, s: f64) -> Tensor {
        Tensor::from_rows(self.row(0) / s, self.row(1) / s, self.row(2) / s)
    }
}

impl SymmTensor {
    pub fn new(xx: f64, xy: f64, xz: f64, yy: f64, yz: f64, zz: f64) -> Self {
        SymmTensor {
            xx,
            xy,
            xz,
            yy,
            yz,
            zz,
        }
    }

    pub fn to_tensor(&self) -> Tensor {
        Tensor::new(
            self.xx, self.xy, self.xz, self.xy, self.yy, self.yz, self.xz, self.yz, self.zz,
        )
    }

    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    pub fn diag(&self) -> Vector {
        Vector::new(self.xx, self.yy, self.zz)
    }

    pub fn det(&self) -> f64 {
        self.to_tensor().det()
    }

    pub fn cof(&self) -> SymmTensor {
        self.to_tensor().cof().symm()
    }

    pub fn inv(&self) -> SymmTensor {
        self.to_tensor().inv().symm()
    }

    pub fn sph(&self) -> SphericalTensor {
        SphericalTensor {
            ii: self.trace() / 3.0,
        }
    }

    pub fn dev(&self) -> SymmTensor {
        let t = self.trace() / 3.0;
        let mut r = *self;
        r.xx -= t;
        r.yy -= t;
        r.zz -= t;
        r
    }

    pub fn dev2(&self) -> SymmTensor {
        let t = 2.0 * self.trace() / 3.0;
        let mut r = *self;
        r.xx -= t;
        r.yy -= t;
        r.zz -= t;
        r
    }

    pub fn mag_sqr(&self) -> f64 {
        self.to_tensor().mag_sqr()
    }

    pub fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    /// `Y1 & Y2`; the product of two symmetric tensors is full in general
    pub fn inner(&self, rhs: &SymmTensor) -> Tensor {
        self.to_tensor().inner(&rhs.to_tensor())
    }

    pub fn dot_vec(&self, v: &Vector) -> Vector {
        self.to_tensor().dot_vec(v)
    }

    pub fn eigen_values(&self) -> Vector {
        // symmetric tensors always have a real spectrum
        self.to_tensor().eigen_values()
    }

    pub fn eigen_vectors(&self) -> Tensor {
        self.to_tensor().eigen_vectors()
    }
}

impl Add for SymmTensor {
    type Output = SymmTensor;
    fn add(self, rhs: SymmTensor) -> SymmTensor {
        SymmTensor::new(
            self.xx + rhs.xx,
            self.xy + rhs.xy,
            self.xz + rhs.xz,
            self.yy + rhs.yy,
            self.yz + rhs.yz,
            self.zz + rhs.zz,
        )
    }
}

impl Sub for SymmTensor {
    type Output = SymmTensor;
    fn sub(self, rhs: SymmTensor) -> SymmTensor {
        SymmTensor::new(
            self.xx - rhs.xx,
            self.xy - rhs.xy,
            self.xz - rhs.xz,
            self.yy - rhs.yy,
            self.yz - rhs.yz,
            self.zz - rhs.zz,
        )
    }
}

impl Neg for SymmTensor {
    type Output = SymmTensor;
    fn neg(self) -> SymmTensor {
        SymmTensor::new(-self.xx, -self.xy, -self.xz, -self.yy, -self.yz, -self.zz)
    }
}

impl Mul<f64> for SymmTensor {
    type Output = SymmTensor;
    fn mul(self, s: f64) -> SymmTensor {
        SymmTensor::new(
            self.xx * s,
            self.xy * s,
            self.xz * s,
            self.yy * s,
            self.yz * s,
            self.zz * s,
        )
    }
}

impl Div<f64> for SymmTensor {
    type Output = SymmTensor;
    fn div(self, s: f64) -> SymmTensor {
        SymmTensor::new(
            self.xx / s,
            self.xy / s,
            self.xz / s,
            self.yy / s,
            self.yz / s,
            self.zz / s,
        )
    }
}

impl SphericalTensor {
    pub fn new(ii: f64) -> Self {
        SphericalTensor { ii }
    }

    pub fn to_tensor(&self) -> Tensor {
        Tensor::identity() * self.ii
    }

    pub fn to_symm(&self) -> SymmTensor {
        SymmTensor::new(self.ii, 0.0, 0.0, self.ii, 0.0, self.ii)
    }

    pub fn trace(&self) -> f64 {
        3.0 * self.ii
    }

    pub fn det(&self) -> f64 {
        self.ii * self.ii * self.ii
    }

    pub fn inv(&self) -> SphericalTensor {
        SphericalTensor { ii: 1.0 / self.ii }
    }

    pub fn mag(&self) -> f64 {
        (3.0 * self.ii * self.ii).sqrt()
    }

    pub fn mag_sqr(&self) -> f64 {
        3.0 * self.ii * self.ii
    }
}

impl Add for SphericalTensor {
    type Output = SphericalTensor;
    fn add(self, rhs: SphericalTensor) -> SphericalTensor {
        SphericalTensor::new(self.ii + rhs.ii)
    }
}

impl Sub for SphericalTensor {
    type Output = SphericalTensor;
    fn sub(self, rhs: SphericalTensor) -> SphericalTensor {
        SphericalTensor::new(self.ii - rhs.ii)
    }
}

impl Neg for SphericalTensor {
    type Output = SphericalTensor;
    fn neg(self) -> SphericalTensor {
        SphericalTensor::new(-self.ii)
    }
}

impl Mul<f64> for SphericalTensor {
    type Output = SphericalTensor;
    fn mul(self, s: f64) -> SphericalTensor {
        SphericalTensor::new(self.ii * s)
    }
}

impl Div<f64> for SphericalTensor {
    type Output = SphericalTensor;
    fn div(self, s: f64) -> SphericalTensor {
        SphericalTensor::new(self.ii / s)
    }
}

/// Solve `l^3 - i1 l^2 + i2 l - i3 = 0` for three real roots, ascending.
fn solve_characteristic(i1: f64, i2: f64, i3: f64) -> Vector {
    // depressed cubic t^3 + p t + q with l = t + i1/3
    let p = i2 - i1 * i1 / 3.0;
    let q = -2.0 * i1 * i1 * i1 / 27.0 + i1 * i2 / 3.0 - i3;
    let shift = i1 / 3.0;

    if p.abs() < 1e-300 {
        // triple root (or nearly); cbrt handles the sign
        let t = (-q).cbrt();
        return Vector::uniform(t + shift);
    }

    let m = 2.0 * (-p / 3.0).max(0.0).sqrt();
    if m == 0.0 {
        let t = (-q).cbrt();
        return Vector::uniform(t + shift);
    }
    let cos_arg = (3.0 * q / (p * m)).clamp(-1.0, 1.0);
    let theta = cos_arg.acos() / 3.0;

    // one Newton step per root recovers the precision the trigonometric
    // form loses; skipped where the derivative vanishes (repeated roots)
    let polish = |l: f64| {
        let f = ((l - i1) * l + i2) * l - i3;
        let df = (3.0 * l - 2.0 * i1) * l + i2;
        if df.abs() > 1e-8 * (1.0 + l * l) {
            l - f / df
        } else {
            l
        }
    };

    let two_pi_3 = 2.0 * std::f64::consts::PI / 3.0;
    let r0 = polish(m * theta.cos() + shift);
    let r1 = polish(m * (theta - two_pi_3).cos() + shift);
    let r2 = polish(m * (theta + two_pi_3).cos() + shift);

    let (mut a, mut b, mut c) = (r0, r1, r2);
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    if b > c {
        std::mem::swap(&mut b, &mut c);
    }
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    Vector::new(a, b, c)
}

/// Extract the eigenvector for a (near-)eigenvalue by crossing rows of
/// `T - l I`: any two independent rows span the plane the eigenvector is
/// normal to.
fn eigen_vector_for(t: &Tensor, lambda: f64) -> Vector {
    let mut a = *t;
    a.xx -= lambda;
    a.yy -= lambda;
    a.zz -= lambda;

    let candidates = [
        a.row(0).cross(&a.row(1)),
        a.row(1).cross(&a.row(2)),
        a.row(2).cross(&a.row(0)),
    ];
    let best = candidates
        .iter()
        .max_by(|u, v| u.mag_sqr().partial_cmp(&v.mag_sqr()).unwrap())
        .unwrap();

    if let Some(v) = best.normalized() {
        return v;
    }

    // the eigenspace is two- or three-dimensional; pick an axis-aligned
    // direction orthogonal to whichever row survives
    for i in 0..3 {
        if let Some(row) = a.row(i).normalized() {
            let trial = if row.x.abs() < 0.9 {
                Vector::new(1.0, 0.0, 0.0)
            } else {
                Vector::new(0.0, 1.0, 0.0)
            };
            if let Some(v) = row.cross(&trial).normalized() {
                return v;
            }
        }
    }
    Vector::new(1.0, 0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn assert_vec_close(a: Vector, b: Vector) {
        assert_vec_close_eps(a, b, 1e-9);
    }

    // repeated eigenvalues are only good to about sqrt(machine epsilon)
    fn assert_vec_close_eps(a: Vector, b: Vector, eps: f64) {
        assert!(
            approx_eq!(f64, a.x, b.x, epsilon = eps)
                && approx_eq!(f64, a.y, b.y, epsilon = eps)
                && approx_eq!(f64, a.z, b.z, epsilon = eps),
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn vector_products() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(4.0, 5.0, 6.0);
        assert_eq!(32.0, a.dot(&b));
        assert_vec_close(a.cross(&b), Vector::new(-3.0, 6.0, -3.0));
        assert_eq!(a.outer(&b).trace(), 32.0);
        assert_eq!(a.mag_sqr(), 14.0);
    }

    #[test]
    fn tensor_inverse_roundtrip() {
        let t = Tensor::new(2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 4.0);
        let prod = t.inner(&t.inv());
        let i = Tensor::identity();
        for r in 0..3 {
            assert_vec_close(prod.row(r), i.row(r));
        }
    }

    #[test]
    fn symm_skew_decomposition() {
        let t = Tensor::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let recomposed = t.symm().to_tensor() + t.skew();
        for r in 0..3 {
            assert_vec_close(recomposed.row(r), t.row(r));
        }
    }

    #[test]
    fn dev_removes_trace() {
        let t = Tensor::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert!(approx_eq!(f64, t.dev().trace(), 0.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, t.dev2().trace(), -t.trace(), epsilon = 1e-12));
    }

    #[test]
    fn eigen_values_of_diagonal() {
        let t = Tensor::new(3.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0);
        assert_vec_close(t.eigen_values(), Vector::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn eigen_of_symmetric() {
        let y = SymmTensor::new(2.0, 1.0, 0.0, 2.0, 0.0, 3.0);
        let eigs = y.eigen_values();
        assert_vec_close_eps(eigs, Vector::new(1.0, 3.0, 3.0), 1e-7);

        let vecs = y.eigen_vectors();
        // each row must satisfy T v = lambda v
        let t = y.to_tensor();
        for (i, lambda) in [eigs.x, eigs.y, eigs.z].into_iter().enumerate() {
            let v = vecs.row(i);
            let tv = t.dot_vec(&v);
            assert_vec_close_eps(tv, v * lambda, 1e-7);
        }
    }

    #[test]
    fn spherical_conversions() {
        let h = SphericalTensor::new(2.0);
        assert_eq!(h.trace(), 6.0);
        assert_eq!(h.det(), 8.0);
        assert_eq!(h.inv().ii, 0.5);
        assert_eq!(h.to_tensor().trace(), 6.0);
        assert_eq!(h.to_symm().trace(), 6.0);
    }

    #[test]
    fn cofactor_matches_det_times_inverse_transpose() {
        let t = Tensor::new(2.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0, 2.0);
        let expected = t.inv().transpose() * t.det();
        let cof = t.cof();
        for r in 0..3 {
            assert_vec_close(cof.row(r), expected.row(r));
        }
    }
}
