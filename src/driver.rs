// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The driver owns field storage, mesh geometry, and time state; the parser
//! only ever borrows it. Cross-process reduction discipline also lives
//! behind this trait -- the evaluator hands over a local (sentinel-seeded)
//! result and the driver combines it however its execution model requires.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use float_cmp::approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::builtins::ReduceOp;
use crate::common::EquationResult;
use crate::tensor::Vector;
use crate::value::Value;

/// A named, externally-registered function invoked via `name(args)` syntax.
///
/// The main grammar does not know a plugin's argument syntax: the plugin is
/// handed the raw text suffix beginning at the opening paren and reports how
/// many bytes it consumed, so the outer lexer can resume right after them.
pub trait PluginFunction {
    fn evaluate(
        &self,
        text: &str,
        on_points: bool,
        driver: &dyn Driver,
    ) -> EquationResult<(Value, usize)>;
}

pub trait Driver {
    /// Number of cell-mesh elements.
    fn size(&self) -> usize;

    /// Number of point-mesh elements.
    fn point_size(&self) -> usize {
        0
    }

    /// Resolve a named field of any sort.
    fn field(&self, name: &str, on_points: bool) -> Option<Value>;

    fn positions(&self, _on_points: bool) -> Option<Vec<Vector>> {
        None
    }

    fn face_normals(&self) -> Option<Vec<Vector>> {
        None
    }

    fn face_areas(&self) -> Option<Vec<f64>> {
        None
    }

    fn cell_volumes(&self) -> Option<Vec<f64>> {
        None
    }

    fn weights(&self, _on_points: bool) -> Option<Vec<f64>> {
        None
    }

    fn run_time(&self) -> f64 {
        0.0
    }

    fn delta_t(&self) -> f64 {
        0.0
    }

    fn processor_id(&self) -> usize {
        0
    }

    fn n_processors(&self) -> usize {
        1
    }

    /// Interpolation table for `lookup(name, expr)`.
    fn lookup_table(&self, _name: &str) -> Option<&[(f64, f64)]> {
        None
    }

    /// Time series for `timeline(name)`, evaluated at the given time.
    fn timeline(&self, _name: &str, _time: f64) -> Option<f64> {
        None
    }

    /// Cross-process combine for a scalar reduction. The local value has
    /// already been sentinel-seeded for empty fields; a single-process
    /// driver returns it unchanged.
    fn reduce(&self, _op: ReduceOp, local: f64) -> f64 {
        local
    }

    /// Cross-process combine for position-of-extremum queries: which
    /// process's `local` extreme wins decides which position is returned.
    fn reduce_position(&self, _op: ReduceOp, _local: f64, position: Vector) -> Vector {
        position
    }

    fn plugin(&self, _name: &str) -> Option<&dyn PluginFunction> {
        None
    }

    fn trace_parsing(&self) -> bool {
        false
    }

    /// Uniform or Gaussian random field. Fixed variants are deterministic
    /// in the seed; otherwise the seed is an offset mixed with wall-clock
    /// time, so distinct seeds still give distinct streams within one
    /// evaluation.
    fn random_field(&self, gaussian: bool, fixed: bool, seed: u32, on_points: bool) -> Vec<f64> {
        let n = if on_points {
            self.point_size()
        } else {
            self.size()
        };
        let seed = if fixed {
            seed as u64
        } else {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
                .unwrap_or(0)
                .wrapping_add(self.processor_id() as u64)
                .wrapping_add((seed as u64) << 32)
        };
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                if gaussian {
                    sample_standard_normal(&mut rng)
                } else {
                    rng.random::<f64>()
                }
            })
            .collect()
    }
}

/// Sample from the standard normal distribution using the Box-Muller
/// transform.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    // Avoid ln(0) by clamping u1 away from zero. random() returns [0, 1),
    // so u1=0 is possible and would produce -infinity.
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Piecewise-linear interpolation through a table sorted by its first
/// column, clamping outside the table's range.
pub fn interpolate(table: &[(f64, f64)], index: f64) -> f64 {
    if table.is_empty() || index.is_nan() {
        return f64::NAN;
    }

    {
        let (x, y) = table[0];
        if index < x {
            return y;
        }
    }

    let size = table.len();
    {
        let (x, y) = table[size - 1];
        if index > x {
            return y;
        }
    }

    let mut low = 0;
    let mut high = size;
    while low < high {
        let mid = low + (high - low) / 2;
        if table[mid].0 < index {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    let i = low;
    if approx_eq!(f64, table[i].0, index) || i == 0 {
        table[i].1
    } else {
        // slope = deltaY/deltaX
        let slope = (table[i].1 - table[i - 1].1) / (table[i].0 - table[i - 1].0);
        // y = m*x + b
        (index - table[i - 1].0) * slope + table[i - 1].1
    }
}

/// A map-backed driver with no live mesh behind it: named fields, tables,
/// timelines, geometry, and plugins are all registered by hand. The test
/// suite is built on it, and embedders that only need expression evaluation
/// over plain arrays can use it directly.
#[derive(Default)]
pub struct StaticDriver {
    size: usize,
    point_size: usize,
    time: f64,
    delta_t: f64,
    fields: HashMap<String, Value>,
    point_fields: HashMap<String, Value>,
    tables: HashMap<String, Vec<(f64, f64)>>,
    timelines: HashMap<String, Vec<(f64, f64)>>,
    plugins: HashMap<String, Box<dyn PluginFunction>>,
    positions: Option<Vec<Vector>>,
    point_positions: Option<Vec<Vector>>,
    face_normals: Option<Vec<Vector>>,
    face_areas: Option<Vec<f64>>,
    cell_volumes: Option<Vec<f64>>,
    weights: Option<Vec<f64>>,
    trace: bool,
}

impl StaticDriver {
    pub fn new(size: usize) -> Self {
        StaticDriver {
            size,
            ..Default::default()
        }
    }

    pub fn with_point_size(mut self, point_size: usize) -> Self {
        self.point_size = point_size;
        self
    }

    pub fn with_time(mut self, time: f64, delta_t: f64) -> Self {
        self.time = time;
        self.delta_t = delta_t;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn insert_field<S: Into<String>>(&mut self, name: S, value: Value) {
        if value.on_points {
            self.point_fields.insert(name.into(), value);
        } else {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn insert_table<S: Into<String>>(&mut self, name: S, table: Vec<(f64, f64)>) {
        self.tables.insert(name.into(), table);
    }

    pub fn insert_timeline<S: Into<String>>(&mut self, name: S, series: Vec<(f64, f64)>) {
        self.timelines.insert(name.into(), series);
    }

    pub fn insert_plugin<S: Into<String>>(&mut self, name: S, plugin: Box<dyn PluginFunction>) {
        self.plugins.insert(name.into(), plugin);
    }

    pub fn set_positions(&mut self, positions: Vec<Vector>) {
        self.positions = Some(positions);
    }

    pub fn set_point_positions(&mut self, positions: Vec<Vector>) {
        self.point_positions = Some(positions);
    }

    pub fn set_face_normals(&mut self, normals: Vec<Vector>) {
        self.face_normals = Some(normals);
    }

    pub fn set_face_areas(&mut self, areas: Vec<f64>) {
        self.face_areas = Some(areas);
    }

    pub fn set_cell_volumes(&mut self, volumes: Vec<f64>) {
        self.cell_volumes = Some(volumes);
    }

    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = Some(weights);
    }
}

impl Driver for StaticDriver {
    fn size(&self) -> usize {
        self.size
    }

    fn point_size(&self) -> usize {
        self.point_size
    }

    fn field(&self, name: &str, on_points: bool) -> Option<Value> {
        let map = if on_points {
            &self.point_fields
        } else {
            &self.fields
        };
        map.get(name).cloned()
    }

    fn positions(&self, on_points: bool) -> Option<Vec<Vector>> {
        if on_points {
            self.point_positions.clone()
        } else {
            self.positions.clone()
        }
    }

    fn face_normals(&self) -> Option<Vec<Vector>> {
        self.face_normals.clone()
    }

    fn face_areas(&self) -> Option<Vec<f64>> {
        self.face_areas.clone()
    }

    fn cell_volumes(&self) -> Option<Vec<f64>> {
        self.cell_volumes.clone()
    }

    fn weights(&self, _on_points: bool) -> Option<Vec<f64>> {
        self.weights.clone()
    }

    fn run_time(&self) -> f64 {
        self.time
    }

    fn delta_t(&self) -> f64 {
        self.delta_t
    }

    fn lookup_table(&self, name: &str) -> Option<&[(f64, f64)]> {
        self.tables.get(name).map(|t| t.as_slice())
    }

    fn timeline(&self, name: &str, time: f64) -> Option<f64> {
        self.timelines.get(name).map(|t| interpolate(t, time))
    }

    fn plugin(&self, name: &str) -> Option<&dyn PluginFunction> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    fn trace_parsing(&self) -> bool {
        self.trace
    }
}
