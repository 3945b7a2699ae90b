// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! fieldexpr parses and evaluates textual expressions over mesh fields:
//! scalars, vectors, tensors, symmetric and spherical tensors, and logical
//! masks, each living on either the cell mesh or the point mesh.
//!
//! The embedding application implements [`Driver`] to supply named fields,
//! mesh geometry, and time state; [`evaluate`] runs one expression against
//! it. Externally registered [`PluginFunction`]s may take over lexing for
//! their own argument syntax and hand control back by reporting how many
//! bytes they consumed.
//!
//! ```
//! use fieldexpr::{ParseMode, StaticDriver, Value, evaluate};
//!
//! let mut driver = StaticDriver::new(3);
//! driver.insert_field("T", Value::scalar(vec![300.0, 350.0, 400.0], false));
//!
//! let v = evaluate("T > 325 ? T : 0", ParseMode::any_cell(), &driver).unwrap();
//! assert_eq!(Some(&[0.0, 350.0, 400.0][..]), v.as_scalar());
//! ```

#![forbid(unsafe_code)]

pub mod builtins;
pub mod common;
pub mod driver;
pub mod eval;
mod field;
pub mod parser;
pub mod tensor;
mod token;
pub mod value;

pub use crate::common::{EquationError, EquationResult, ErrorCode, Loc};
pub use crate::driver::{Driver, PluginFunction, StaticDriver, interpolate};
pub use crate::field::HUGE;
pub use crate::parser::{ParseMode, Terminator, evaluate, parse_partial};
pub use crate::tensor::{SphericalTensor, SymmTensor, Tensor, Vector};
pub use crate::value::{FieldData, Sort, Value};
