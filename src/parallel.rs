//! Row-parallel dispatch over 2D grids.
//!
//! Each worker receives whole rows together with their row index. Every call
//! blocks until all rows are finished.

use ndarray::{Array2, ArrayViewMut1, Axis};
use rayon::prelude::*;

/// Run `body` once per row of `grid`, rows spread over the worker pool.
pub fn for_each_row<T, F>(grid: &mut Array2<T>, body: F)
where
    T: Send + Sync,
    F: Fn(usize, ArrayViewMut1<'_, T>) + Sync + Send,
{
    grid.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, row)| body(i, row));
}

/// Like [`for_each_row`], but hands out matching rows of two equally shaped grids.
pub fn for_each_row_pair<A, B, F>(first: &mut Array2<A>, second: &mut Array2<B>, body: F)
where
    A: Send + Sync,
    B: Send + Sync,
    F: Fn(usize, ArrayViewMut1<'_, A>, ArrayViewMut1<'_, B>) + Sync + Send,
{
    debug_assert_eq!(first.dim(), second.dim());
    first
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(second.axis_iter_mut(Axis(0)).into_par_iter())
        .enumerate()
        .for_each(|(i, (a, b))| body(i, a, b));
}

/// Evaluate `body` for every row index and collect the per-row results in order.
pub fn map_rows<T, F>(rows: usize, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..rows).into_par_iter().map(body).collect()
}

/// Size the global worker pool. `None` keeps rayon's default (all cores).
/// Returns the number of workers actually available.
pub fn configure_pool(threads: Option<usize>) -> Result<usize, rayon::ThreadPoolBuildError> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()?;
    }
    Ok(rayon::current_num_threads())
}
