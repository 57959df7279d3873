//! `reduce` and `enumerate`: the lattice engine on its own

use std::time::Instant;

use anyhow::{bail, Context, Result};
use lcg_reverse_core::{
    enumerate, Lll, LllConfig, Matrix, MatrixLike, OptimizeBuilder, SearchSpace, Vector, VectorLike,
};
use log::info;
use rayon::iter::ParallelIterator;

pub fn run_reduce(matrix: &str, config: &LllConfig) -> Result<()> {
    let lattice: Matrix = matrix.parse().context("Failed to parse --matrix")?;

    let reduced = Lll::reduce(&lattice, config).context("LLL reduction failed")?;
    let stats = &reduced.stats;

    println!("Reduced basis ({}x{}):", reduced.basis.row_count(), reduced.basis.col_count());
    for row in reduced.basis.rows() {
        println!("  {}", row);
    }
    println!();
    println!("Transformation (H · input = basis, then zero rows):");
    for row in reduced.transformations.rows() {
        println!("  {}", row);
    }
    println!();
    println!("Dependent rows:   {:>8}", reduced.dependent_rows);
    println!("Iterations:       {:>8}", stats.iterations);
    println!("Swaps:            {:>8} ({} degenerate)", stats.swaps, stats.degenerate_swaps);
    println!("Size reductions:  {:>8}", stats.size_reductions);
    println!("Time:             {:>8.2} ms", stats.total_time * 1000.0);
    Ok(())
}

pub fn run_enumerate(
    basis: &str,
    origin: &str,
    lower: &str,
    upper: &str,
    parallel: bool,
    count_only: bool,
) -> Result<()> {
    let basis: Matrix = basis.parse().context("Failed to parse --basis")?;
    let origin: Vector = origin.parse().context("Failed to parse --origin")?;
    let lower: Vector = lower.parse().context("Failed to parse --lower")?;
    let upper: Vector = upper.parse().context("Failed to parse --upper")?;
    let n = basis.row_count();
    if lower.dim() != n || upper.dim() != n {
        bail!(
            "box corners have {} and {} entries, basis has dimension {}",
            lower.dim(),
            upper.dim(),
            n
        );
    }

    let mut builder = OptimizeBuilder::of_size(n);
    for i in 0..n {
        builder = builder
            .with_lower_bound(i, lower[i].clone())
            .with_upper_bound(i, upper[i].clone());
    }
    let region = builder.build().context("Failed to build the box")?;
    let space = SearchSpace::new(&basis, &origin).context("Invalid basis")?;

    let start = Instant::now();
    let enumeration = enumerate(&basis, &origin, &region).context("Enumeration failed")?;
    let mut coordinates: Vec<Vector> = if parallel {
        enumeration.par().collect()
    } else {
        enumeration.collect()
    };
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    info!("enumerated {} points in {:.2} ms", coordinates.len(), elapsed);

    if !count_only {
        if parallel {
            coordinates.sort_by(|a, b| a.as_slice().cmp(b.as_slice()));
        }
        for x in &coordinates {
            let point = space.point(x)?;
            println!("{}  x = {}", point, x);
        }
    }
    println!("{} point(s)", coordinates.len());
    Ok(())
}
