// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

/// Scalar transcendental functions of one argument. Each maps elementwise
/// over a scalar field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryMathFn {
    Log,
    Log10,
    Exp,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Erf,
    Erfc,
    LGamma,
    BesselJ0,
    BesselJ1,
    BesselY0,
    BesselY1,
    Sign,
    Pos,
    Neg,
}

impl UnaryMathFn {
    pub fn from_name(name: &str) -> Option<Self> {
        use UnaryMathFn::*;
        let f = match name {
            "log" => Log,
            "log10" => Log10,
            "exp" => Exp,
            "sqrt" => Sqrt,
            "sin" => Sin,
            "cos" => Cos,
            "tan" => Tan,
            "asin" => Asin,
            "acos" => Acos,
            "atan" => Atan,
            "sinh" => Sinh,
            "cosh" => Cosh,
            "tanh" => Tanh,
            "asinh" => Asinh,
            "acosh" => Acosh,
            "atanh" => Atanh,
            "erf" => Erf,
            "erfc" => Erfc,
            "lgamma" => LGamma,
            "besselJ0" => BesselJ0,
            "besselJ1" => BesselJ1,
            "besselY0" => BesselY0,
            "besselY1" => BesselY1,
            "sign" => Sign,
            "pos" => Pos,
            "neg" => Neg,
            _ => return None,
        };
        Some(f)
    }

    pub fn apply(&self, x: f64) -> f64 {
        use UnaryMathFn::*;
        match self {
            Log => x.ln(),
            Log10 => x.log10(),
            Exp => x.exp(),
            Sqrt => x.sqrt(),
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => x.tan(),
            Asin => x.asin(),
            Acos => x.acos(),
            Atan => x.atan(),
            Sinh => x.sinh(),
            Cosh => x.cosh(),
            Tanh => x.tanh(),
            Asinh => x.asinh(),
            Acosh => x.acosh(),
            Atanh => x.atanh(),
            Erf => libm::erf(x),
            Erfc => libm::erfc(x),
            LGamma => libm::lgamma(x),
            BesselJ0 => libm::j0(x),
            BesselJ1 => libm::j1(x),
            BesselY0 => libm::y0(x),
            BesselY1 => libm::y1(x),
            Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Pos => {
                if x >= 0.0 { 1.0 } else { 0.0 }
            }
            Neg => {
                if x < 0.0 { 1.0 } else { 0.0 }
            }
        }
    }
}

/// Reductions collapse a whole field to one value; the driver owns the
/// cross-process combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
    Average,
}

pub fn is_0_arity_builtin_fn(name: &str) -> bool {
    matches!(
        name,
        "pi" | "time"
            | "deltaT"
            | "id"
            | "cpu"
            | "weight"
            | "position"
            | "normal"
            | "area"
            | "volume"
            | "vol"
            | "Sf"
            | "unitTensor"
            | "rand"
            | "randFixed"
            | "randNormal"
            | "randNormalFixed"
    )
}

pub fn is_builtin_fn(name: &str) -> bool {
    is_0_arity_builtin_fn(name)
        || UnaryMathFn::from_name(name).is_some()
        || matches!(
            name,
            // sort-polymorphic elementwise
            "pow"
        | "sqr"
        | "mag"
        | "magSqr"
        // tensor algebra
        | "transpose"
        | "diag"
        | "row"
        | "col"
        | "tr"
        | "dev"
        | "dev2"
        | "symm"
        | "twoSymm"
        | "skew"
        | "det"
        | "cof"
        | "inv"
        | "sph"
        | "eigenValues"
        | "eigenVectors"
        // reductions (1-arg) and elementwise extrema (2-arg)
        | "min"
        | "max"
        | "sum"
        | "average"
        | "minPosition"
        | "maxPosition"
        // aggregate constructors
        | "vector"
        | "tensor"
        | "symmTensor"
        | "sphericalTensor"
        // table machinery
        | "lookup"
        | "timeline"
        )
}

#[test]
fn test_is_builtin_fn() {
    assert!(is_builtin_fn("mag"));
    assert!(is_builtin_fn("eigenValues"));
    assert!(is_builtin_fn("row"));
    assert!(is_builtin_fn("col"));
    assert!(is_builtin_fn("besselJ0"));
    assert!(is_builtin_fn("rand"));
    assert!(!is_builtin_fn("magz"));
    assert!(!is_builtin_fn("myPlugin"));
}

#[test]
fn test_is_0_arity_builtin_fn() {
    assert!(is_0_arity_builtin_fn("pi"));
    assert!(is_0_arity_builtin_fn("deltaT"));
    assert!(!is_0_arity_builtin_fn("lookup"));
}

#[test]
fn test_unary_math() {
    assert_eq!(Some(UnaryMathFn::Erf), UnaryMathFn::from_name("erf"));
    assert_eq!(None, UnaryMathFn::from_name("ERF"));
    assert_eq!(1.0, UnaryMathFn::Sign.apply(3.5));
    assert_eq!(-1.0, UnaryMathFn::Sign.apply(-3.5));
    assert_eq!(1.0, UnaryMathFn::Pos.apply(0.0));
    assert_eq!(0.0, UnaryMathFn::Neg.apply(0.0));
    assert_eq!(0.0, UnaryMathFn::Log.apply(1.0));
}
