//! Exact linear bound solver
//!
//! Minimizes and maximizes linear functionals over a polyhedron
//! `{x ∈ Rⁿ : constraints}` using a two-phase simplex method on an exact
//! rational tableau.
//!
//! The user-facing variables x are free. During [`OptimizeBuilder::build`]
//! every constraint row gets a slack, each x_j is eliminated by a
//! Gauss-Jordan pivot and recorded in `transform` (x = T·[y; 1]) so that
//! the tableau only contains non-negative variables y. A variable that
//! cannot be eliminated is split into y⁺ - y⁻.
//!
//! An [`Optimize`] never changes after it is built. [`Optimize::with_strict_bound`]
//! returns an independent solver with one more equality, re-solved from the
//! parent's feasible basis. Parent and child share `transform`.

use std::sync::Arc;

use log::{debug, trace};

use crate::error::{check_dim, check_index, LatticeError, Result};
use crate::matrix::{Matrix, MatrixLike, MatrixLikeMut};
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike};

/// Comparison of a constraint row against its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    AtMost,
    AtLeast,
    Equal,
}

#[derive(Debug, Clone)]
enum Lhs {
    Coordinate(usize),
    Gradient(Vector),
}

#[derive(Debug, Clone)]
struct Constraint {
    lhs: Lhs,
    relation: Relation,
    rhs: Rational,
}

/// Collects constraints for an [`Optimize`]
#[derive(Debug, Clone)]
pub struct OptimizeBuilder {
    size: usize,
    constraints: Vec<Constraint>,
}

impl OptimizeBuilder {
    /// Constraints over `size` free variables
    pub fn of_size(size: usize) -> Self {
        Self {
            size,
            constraints: Vec::new(),
        }
    }

    fn coordinate(mut self, index: usize, relation: Relation, value: Rational) -> Self {
        self.constraints.push(Constraint {
            lhs: Lhs::Coordinate(index),
            relation,
            rhs: value,
        });
        self
    }

    /// x_index ≥ value
    pub fn with_lower_bound(self, index: usize, value: Rational) -> Self {
        self.coordinate(index, Relation::AtLeast, value)
    }

    /// x_index ≤ value
    pub fn with_upper_bound(self, index: usize, value: Rational) -> Self {
        self.coordinate(index, Relation::AtMost, value)
    }

    /// x_index = value
    pub fn with_strict_bound(self, index: usize, value: Rational) -> Self {
        self.coordinate(index, Relation::Equal, value)
    }

    /// lhs · x (relation) rhs
    pub fn with_constraint(mut self, lhs: Vector, relation: Relation, rhs: Rational) -> Self {
        self.constraints.push(Constraint {
            lhs: Lhs::Gradient(lhs),
            relation,
            rhs,
        });
        self
    }

    /// Fails with [`LatticeError::Infeasible`] if no point satisfies every
    /// constraint.
    pub fn build(self) -> Result<Optimize> {
        let n = self.size;
        if n == 0 {
            return Err(LatticeError::EmptyShape);
        }

        // Columns: x_0..x_{n-1}, then one slack per inequality
        let slack_count = self
            .constraints
            .iter()
            .filter(|c| c.relation != Relation::Equal)
            .count();
        let width = n + slack_count;
        let mut rows: Vec<Vec<Rational>> = Vec::with_capacity(self.constraints.len());
        let mut rhs: Vec<Rational> = Vec::with_capacity(self.constraints.len());
        let mut next_slack = n;
        for constraint in &self.constraints {
            let mut row = vec![Rational::zero(); width];
            match &constraint.lhs {
                Lhs::Coordinate(i) => {
                    check_index(*i, n)?;
                    row[*i] = Rational::one();
                }
                Lhs::Gradient(g) => {
                    check_dim(n, g.dim())?;
                    for (j, x) in g.iter().enumerate() {
                        row[j] = x.clone();
                    }
                }
            }
            match constraint.relation {
                Relation::AtMost => {
                    row[next_slack] = Rational::one();
                    next_slack += 1;
                }
                Relation::AtLeast => {
                    row[next_slack] = -Rational::one();
                    next_slack += 1;
                }
                Relation::Equal => {}
            }
            rows.push(row);
            rhs.push(constraint.rhs.clone());
        }

        // Gauss-Jordan: pivot each x_j into some row with a nonzero coefficient
        let mut pivot_row: Vec<Option<usize>> = vec![None; n];
        let mut used = vec![false; rows.len()];
        for j in 0..n {
            let Some(r) = (0..rows.len()).find(|&r| !used[r] && !rows[r][j].is_zero()) else {
                continue;
            };
            used[r] = true;
            pivot_row[j] = Some(r);

            let inv = rows[r][j].recip()?;
            for x in rows[r].iter_mut() {
                *x = &*x * &inv;
            }
            rhs[r] = &rhs[r] * &inv;

            for i in 0..rows.len() {
                if i == r || rows[i][j].is_zero() {
                    continue;
                }
                let factor = rows[i][j].clone();
                for c in 0..width {
                    let delta = &factor * &rows[r][c];
                    rows[i][c] -= &delta;
                }
                let delta = &factor * &rhs[r];
                rhs[i] -= &delta;
            }
        }

        // Non-negative variables: slacks, then a (+, -) pair per free x_j
        let free: Vec<usize> = (0..n).filter(|&j| pivot_row[j].is_none()).collect();
        let num_vars = slack_count + 2 * free.len();
        let terms = |column: usize| -> Vec<(usize, Rational)> {
            if column >= n {
                vec![(column - n, Rational::one())]
            } else if let Some(p) = free.iter().position(|&j| j == column) {
                vec![
                    (slack_count + 2 * p, Rational::one()),
                    (slack_count + 2 * p + 1, -Rational::one()),
                ]
            } else {
                Vec::new()
            }
        };

        let mut transform = Matrix::zeros(n, num_vars + 1);
        for j in 0..n {
            match pivot_row[j] {
                Some(r) => {
                    *transform.at_mut(j, num_vars) = rhs[r].clone();
                    for c in (0..width).filter(|&c| c != j && !rows[r][c].is_zero()) {
                        for (y, sign) in terms(c) {
                            let delta = &rows[r][c] * &sign;
                            *transform.at_mut(j, y) -= &delta;
                        }
                    }
                }
                None => {
                    for (y, sign) in terms(j) {
                        *transform.at_mut(j, y) = sign;
                    }
                }
            }
        }

        // Whatever was not used as a pivot row constrains y alone
        let mut tableau = Tableau {
            rows: Vec::new(),
            rhs: Vec::new(),
            basics: Vec::new(),
            nonbasics: (0..num_vars).collect(),
        };
        for (r, row) in rows.iter().enumerate().filter(|(r, _)| !used[*r]) {
            let mut coefficients = vec![Rational::zero(); num_vars];
            for (c, x) in row.iter().enumerate().filter(|(_, x)| !x.is_zero()) {
                for (y, sign) in terms(c) {
                    coefficients[y] += &(x * &sign);
                }
            }
            let mut value = rhs[r].clone();
            if value.is_negative() {
                coefficients = coefficients.iter().map(|x| -x).collect();
                value = -value;
            }
            tableau.basics.push(num_vars + tableau.rows.len());
            tableau.rows.push(coefficients);
            tableau.rhs.push(value);
        }

        // Phase one: minimize the sum of the artificials
        let artificials = tableau.rows.len();
        let mut cost = vec![Rational::zero(); num_vars + artificials];
        for c in cost.iter_mut().skip(num_vars) {
            *c = Rational::one();
        }
        tableau.solve(&cost)?;
        if !tableau.objective(&cost).is_zero() {
            return Err(LatticeError::Infeasible);
        }
        tableau.drive_out(|v| v >= num_vars)?;

        debug!(
            "built optimizer: {} variables, {} constraints, {} eliminated, {} free, {} tableau rows",
            n,
            self.constraints.len(),
            n - free.len(),
            free.len(),
            tableau.rows.len()
        );

        Ok(Optimize {
            size: n,
            num_vars,
            transform: Arc::new(transform),
            tableau,
        })
    }
}

/// Optimum of a linear functional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// A point attaining the optimum
    pub point: Vector,
    pub value: Rational,
}

/// Feasible region bounded by linear constraints
#[derive(Debug, Clone)]
pub struct Optimize {
    size: usize,
    num_vars: usize,
    /// x = transform · [y; 1]
    transform: Arc<Matrix>,
    tableau: Tableau,
}

impl Optimize {
    /// Number of user-facing variables
    pub fn dimension(&self) -> usize {
        self.size
    }

    /// Number of rows left in the tableau after eliminating the free
    /// variables
    pub fn constraint_count(&self) -> usize {
        self.tableau.rows.len()
    }

    pub fn minimize<V: VectorLike + ?Sized>(&self, gradient: &V) -> Result<Solution> {
        check_dim(self.size, gradient.dim())?;
        let (cost, _) = self.pull_back(gradient)?;
        let mut tableau = self.tableau.clone();
        tableau.solve(&cost)?;

        let point = self.transform.multiply_vector(&tableau.point(self.num_vars))?;
        let value = gradient.dot(&point)?;
        Ok(Solution { point, value })
    }

    pub fn maximize<V: VectorLike + ?Sized>(&self, gradient: &V) -> Result<Solution> {
        let negated = gradient.neg();
        let Solution { point, .. } = self.minimize(&negated)?;
        let value = gradient.dot(&point)?;
        Ok(Solution { point, value })
    }

    /// Independent solver restricted to `lhs · x = rhs`
    pub fn with_strict_bound<V: VectorLike + ?Sized>(&self, lhs: &V, rhs: &Rational) -> Result<Optimize> {
        check_dim(self.size, lhs.dim())?;
        let (over_y, constant) = self.pull_back(lhs)?;
        let tableau = &self.tableau;

        // Substitute the basic variables to get a row over the nonbasic ones
        let mut row: Vec<Rational> = tableau.nonbasics.iter().map(|&v| over_y[v].clone()).collect();
        let mut target = rhs - &constant;
        for (i, &basic) in tableau.basics.iter().enumerate() {
            let weight = &over_y[basic];
            if weight.is_zero() {
                continue;
            }
            for (entry, x) in row.iter_mut().zip(tableau.rows[i].iter()) {
                *entry -= &(weight * x);
            }
            target -= &(weight * &tableau.rhs[i]);
        }

        if row.iter().all(Rational::is_zero) {
            return if target.is_zero() {
                Ok(self.clone())
            } else {
                Err(LatticeError::Infeasible)
            };
        }
        if target.is_negative() {
            row = row.iter().map(|x| -x).collect();
            target = -target;
        }

        let artificial = self.num_vars;
        let mut child = self.clone();
        child.tableau.rows.push(row);
        child.tableau.rhs.push(target);
        child.tableau.basics.push(artificial);

        let mut cost = vec![Rational::zero(); self.num_vars + 1];
        cost[artificial] = Rational::one();
        child.tableau.solve(&cost)?;
        if !child.tableau.objective(&cost).is_zero() {
            return Err(LatticeError::Infeasible);
        }
        child.tableau.drive_out(|v| v == artificial)?;
        Ok(child)
    }

    /// Coefficients of `g · x` over y, and its constant part
    fn pull_back<V: VectorLike + ?Sized>(&self, g: &V) -> Result<(Vec<Rational>, Rational)> {
        let cost = (0..self.num_vars)
            .map(|y| self.transform.column(y).and_then(|col| col.dot(g)))
            .collect::<Result<Vec<_>>>()?;
        let constant = self.transform.column(self.num_vars)?.dot(g)?;
        Ok((cost, constant))
    }
}

#[derive(Debug, Clone, Copy)]
struct PivotInfo {
    row: usize,
    col: usize,
}

/// Dictionary form: for each row i,
/// `y[basics[i]] + Σ_c rows[i][c] · y[nonbasics[c]] = rhs[i]`
#[derive(Debug, Clone)]
struct Tableau {
    rows: Vec<Vec<Rational>>,
    rhs: Vec<Rational>,
    basics: Vec<usize>,
    nonbasics: Vec<usize>,
}

impl Tableau {
    fn objective(&self, cost: &[Rational]) -> Rational {
        self.basics
            .iter()
            .zip(self.rhs.iter())
            .fold(Rational::zero(), |acc, (&b, value)| &acc + &(&cost[b] * value))
    }

    /// Values of the first `num_vars` variables followed by a trailing 1
    fn point(&self, num_vars: usize) -> Vector {
        let mut y = Vector::zeros(num_vars + 1);
        y[num_vars] = Rational::one();
        for (&b, value) in self.basics.iter().zip(self.rhs.iter()) {
            if b < num_vars {
                y[b] = value.clone();
            }
        }
        y
    }

    fn reduced_costs(&self, cost: &[Rational]) -> Vec<Rational> {
        (0..self.nonbasics.len())
            .map(|c| {
                let mut d = cost[self.nonbasics[c]].clone();
                for (i, &b) in self.basics.iter().enumerate() {
                    if !cost[b].is_zero() && !self.rows[i][c].is_zero() {
                        d -= &(&cost[b] * &self.rows[i][c]);
                    }
                }
                d
            })
            .collect()
    }

    /// Runs primal simplex from the current (feasible) basis
    fn solve(&mut self, cost: &[Rational]) -> Result<()> {
        for iter in 0.. {
            match self.choose_pivot(cost)? {
                Some(pivot) => {
                    trace!(
                        "simplex iter {}: y{} enters, y{} leaves",
                        iter,
                        self.nonbasics[pivot.col],
                        self.basics[pivot.row]
                    );
                    self.pivot(pivot)?;
                }
                None => {
                    trace!("found optimum in {} iterations, obj.: {}", iter + 1, self.objective(cost));
                    break;
                }
            }
        }
        Ok(())
    }

    /// Most negative reduced cost enters; Bland's rule on degenerate bases.
    /// The leaving row has the minimum ratio, ties going to the larger
    /// pivot element (or the smaller basic index under Bland's rule).
    fn choose_pivot(&self, cost: &[Rational]) -> Result<Option<PivotInfo>> {
        let bland = self.rhs.iter().any(Rational::is_zero);
        let reduced = self.reduced_costs(cost);
        let improving = (0..self.nonbasics.len()).filter(|&c| reduced[c].is_negative());
        let entering = if bland {
            improving.min_by_key(|&c| self.nonbasics[c])
        } else {
            improving.fold(None, |best: Option<usize>, c| match best {
                Some(b) if reduced[b] <= reduced[c] => Some(b),
                _ => Some(c),
            })
        };
        let Some(col) = entering else {
            return Ok(None);
        };

        let mut best: Option<(usize, Rational)> = None;
        for row in 0..self.rows.len() {
            let a = &self.rows[row][col];
            if !a.is_positive() {
                continue;
            }
            let ratio = self.rhs[row].checked_div(a)?;
            let better = match &best {
                None => true,
                Some((r, best_ratio)) => match ratio.cmp(best_ratio) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal if bland => self.basics[row] < self.basics[*r],
                    std::cmp::Ordering::Equal => *a > self.rows[*r][col],
                },
            };
            if better {
                best = Some((row, ratio));
            }
        }
        match best {
            Some((row, _)) => Ok(Some(PivotInfo { row, col })),
            None => Err(LatticeError::Unbounded),
        }
    }

    fn pivot(&mut self, PivotInfo { row: r, col: c }: PivotInfo) -> Result<()> {
        let inv = self.rows[r][c].recip()?;
        for (k, x) in self.rows[r].iter_mut().enumerate() {
            *x = if k == c { inv.clone() } else { &*x * &inv };
        }
        self.rhs[r] = &self.rhs[r] * &inv;

        let pivot_row = self.rows[r].clone();
        let pivot_rhs = self.rhs[r].clone();
        for i in 0..self.rows.len() {
            if i == r || self.rows[i][c].is_zero() {
                continue;
            }
            let factor = self.rows[i][c].clone();
            for (k, x) in self.rows[i].iter_mut().enumerate() {
                if k == c {
                    *x = -(&factor * &pivot_row[c]);
                } else if !pivot_row[k].is_zero() {
                    *x -= &(&factor * &pivot_row[k]);
                }
            }
            self.rhs[i] -= &(&factor * &pivot_rhs);
        }

        std::mem::swap(&mut self.basics[r], &mut self.nonbasics[c]);
        Ok(())
    }

    /// Removes the variables matched by `is_artificial`, which must all be
    /// zero: basic ones are pivoted out or their (redundant) rows dropped,
    /// nonbasic columns are deleted.
    fn drive_out(&mut self, is_artificial: impl Fn(usize) -> bool) -> Result<()> {
        let mut r = 0;
        while r < self.rows.len() {
            if !is_artificial(self.basics[r]) {
                r += 1;
                continue;
            }
            let replacement = (0..self.nonbasics.len())
                .find(|&c| !is_artificial(self.nonbasics[c]) && !self.rows[r][c].is_zero());
            match replacement {
                Some(col) => {
                    self.pivot(PivotInfo { row: r, col })?;
                    r += 1;
                }
                None => {
                    self.rows.remove(r);
                    self.rhs.remove(r);
                    self.basics.remove(r);
                }
            }
        }

        let keep: Vec<usize> = (0..self.nonbasics.len())
            .filter(|&c| !is_artificial(self.nonbasics[c]))
            .collect();
        if keep.len() < self.nonbasics.len() {
            for row in self.rows.iter_mut() {
                *row = keep.iter().map(|&c| row[c].clone()).collect();
            }
            self.nonbasics = keep.iter().map(|&c| self.nonbasics[c]).collect();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64) -> Rational {
        Rational::from(n)
    }

    fn v(values: &[i64]) -> Vector {
        Vector::from_ints(values)
    }

    #[test]
    fn test_single_variable_bounds() {
        let optimize = OptimizeBuilder::of_size(1)
            .with_lower_bound(0, r(3))
            .with_upper_bound(0, r(5))
            .build()
            .unwrap();

        let min = optimize.minimize(&v(&[1])).unwrap();
        assert_eq!(min.value, r(3));
        assert_eq!(min.point, v(&[3]));

        let max = optimize.maximize(&v(&[1])).unwrap();
        assert_eq!(max.value, r(5));
        assert_eq!(max.point, v(&[5]));
    }

    #[test]
    fn test_triangle() {
        // x ≥ 0, y ≥ 0, x + y ≤ 4
        let optimize = OptimizeBuilder::of_size(2)
            .with_lower_bound(0, r(0))
            .with_lower_bound(1, r(0))
            .with_constraint(v(&[1, 1]), Relation::AtMost, r(4))
            .build()
            .unwrap();

        assert_eq!(optimize.maximize(&v(&[1, 2])).unwrap().value, r(8));
        assert_eq!(optimize.minimize(&v(&[1, -1])).unwrap().value, r(-4));
        assert_eq!(optimize.maximize(&v(&[1, 1])).unwrap().value, r(4));
        let lowest = optimize.minimize(&v(&[1, 1])).unwrap();
        assert_eq!(lowest.point, v(&[0, 0]));
    }

    #[test]
    fn test_rational_vertex() {
        // 2x + y ≤ 3, x + 3y ≤ 4, x, y ≥ 0: max x + y at (1, 1)
        let optimize = OptimizeBuilder::of_size(2)
            .with_constraint(v(&[2, 1]), Relation::AtMost, r(3))
            .with_constraint(v(&[1, 3]), Relation::AtMost, r(4))
            .with_lower_bound(0, r(0))
            .with_lower_bound(1, r(0))
            .build()
            .unwrap();
        let best = optimize.maximize(&v(&[1, 1])).unwrap();
        assert_eq!(best.point, v(&[1, 1]));
        // max y alone at (0, 4/3)
        let best = optimize.maximize(&v(&[0, 1])).unwrap();
        assert_eq!(best.value, Rational::new(4, 3).unwrap());
    }

    #[test]
    fn test_infeasible_and_unbounded() {
        let empty = OptimizeBuilder::of_size(1)
            .with_lower_bound(0, r(5))
            .with_upper_bound(0, r(3))
            .build();
        assert!(matches!(empty, Err(LatticeError::Infeasible)));

        let half_line = OptimizeBuilder::of_size(2)
            .with_lower_bound(0, r(0))
            .with_upper_bound(1, r(1))
            .with_lower_bound(1, r(-1))
            .build()
            .unwrap();
        assert!(matches!(half_line.maximize(&v(&[1, 0])), Err(LatticeError::Unbounded)));
        assert_eq!(half_line.minimize(&v(&[1, 0])).unwrap().value, r(0));
        // x_1 is never mentioned alone but is still bounded
        assert_eq!(half_line.maximize(&v(&[0, 1])).unwrap().value, r(1));

        let unconstrained = OptimizeBuilder::of_size(1).build().unwrap();
        assert!(matches!(unconstrained.minimize(&v(&[1])), Err(LatticeError::Unbounded)));
    }

    #[test]
    fn test_strict_bound_restricts_child_only() {
        let square = OptimizeBuilder::of_size(2)
            .with_lower_bound(0, r(0))
            .with_upper_bound(0, r(4))
            .with_lower_bound(1, r(0))
            .with_upper_bound(1, r(4))
            .build()
            .unwrap();

        let diagonal = square.with_strict_bound(&v(&[1, -1]), &r(2)).unwrap();
        assert_eq!(diagonal.maximize(&v(&[1, 0])).unwrap().value, r(4));
        assert_eq!(diagonal.minimize(&v(&[1, 0])).unwrap().value, r(2));
        assert_eq!(diagonal.maximize(&v(&[0, 1])).unwrap().value, r(2));

        // the parent is untouched
        assert_eq!(square.minimize(&v(&[1, 0])).unwrap().value, r(0));

        let point = diagonal.with_strict_bound(&v(&[0, 1]), &r(1)).unwrap();
        assert_eq!(point.maximize(&v(&[1, 1])).unwrap().point, v(&[3, 1]));

        assert!(matches!(
            diagonal.with_strict_bound(&v(&[1, 0]), &r(1)),
            Err(LatticeError::Infeasible)
        ));
        // implied by the existing equality
        let same = diagonal.with_strict_bound(&v(&[2, -2]), &r(4)).unwrap();
        assert_eq!(same.constraint_count(), diagonal.constraint_count());
        assert!(matches!(
            diagonal.with_strict_bound(&v(&[2, -2]), &r(5)),
            Err(LatticeError::Infeasible)
        ));
    }

    #[test]
    fn test_equality_constraints() {
        // x + y + z = 6, x - y = 0, bounds 0..=10
        let mut builder = OptimizeBuilder::of_size(3)
            .with_constraint(v(&[1, 1, 1]), Relation::Equal, r(6))
            .with_constraint(v(&[1, -1, 0]), Relation::Equal, r(0));
        for i in 0..3 {
            builder = builder.with_lower_bound(i, r(0)).with_upper_bound(i, r(10));
        }
        let optimize = builder.build().unwrap();
        assert_eq!(optimize.maximize(&v(&[1, 0, 0])).unwrap().value, r(3));
        assert_eq!(optimize.maximize(&v(&[0, 0, 1])).unwrap().value, r(6));
        assert_eq!(optimize.dimension(), 3);

        let fixed = OptimizeBuilder::of_size(1).with_strict_bound(0, r(7)).build().unwrap();
        assert_eq!(fixed.minimize(&v(&[1])).unwrap().value, r(7));
        assert_eq!(fixed.maximize(&v(&[1])).unwrap().value, r(7));
    }

    #[test]
    fn test_redundant_constraints() {
        let optimize = OptimizeBuilder::of_size(1)
            .with_strict_bound(0, r(2))
            .with_constraint(v(&[2]), Relation::Equal, r(4))
            .with_upper_bound(0, r(2))
            .build()
            .unwrap();
        assert_eq!(optimize.maximize(&v(&[1])).unwrap().value, r(2));
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(OptimizeBuilder::of_size(0).build(), Err(LatticeError::EmptyShape)));
        assert!(matches!(
            OptimizeBuilder::of_size(2).with_lower_bound(2, r(0)).build(),
            Err(LatticeError::IndexOutOfRange { index: 2, len: 2 })
        ));
        let optimize = OptimizeBuilder::of_size(2).with_lower_bound(0, r(0)).build().unwrap();
        assert!(matches!(
            optimize.minimize(&v(&[1])),
            Err(LatticeError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
