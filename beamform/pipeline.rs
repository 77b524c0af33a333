// ========================================================================================
//
//                     The dispatch layer: a fork-join grid on native threads
//
// ========================================================================================
//
// The kernel itself makes no scheduling decisions; this module makes all of them. It is
// the native-thread rendition of a GPU compute dispatch: the output buffer is split
// into the disjoint contiguous chunks the grid assigns to its cells, every cell runs
// the kernel over its own chunk under rayon, and the join happens before this function
// returns. Those two edges (dispatch and join) are the only synchronization in the
// engine; the inputs are shared read-only and the output chunks never alias, so there
// are no locks and no atomics anywhere on the hot path.
//
// Configuration problems are rejected here, eagerly, before a single element is
// computed. Once dispatch begins nothing can fail.

use crate::complex::Complex32;
use crate::grid::{ComputeGrid, GridError};
use crate::kernel::{self, BufferError, DelayTables};
use crate::types::{BeamformerParameters, ParameterError};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BeamformError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(
        "The grid was built for {grid_elements} output elements, but this geometry has \
         {output_elements}."
    )]
    GridMismatch {
        grid_elements: usize,
        output_elements: usize,
    },
}

/// Runs the full beamforming grid to completion.
///
/// Each grid cell's slice of `output` is computed by exactly one rayon task; skipped
/// elements (sentinel delay or cutoff violation) keep whatever value `output` held on
/// entry. The call returns only after every cell has joined, so the caller may read
/// `output` immediately afterwards.
pub fn beamform_with_grid(
    params: &BeamformerParameters,
    grid: &ComputeGrid,
    raw_samples: &[Complex32],
    tables: &DelayTables,
    output: &mut [Complex32],
) -> Result<(), BeamformError> {
    kernel::check_sample_buffers(params, raw_samples, output)?;
    if grid.total_elements() != output.len() {
        return Err(BeamformError::GridMismatch {
            grid_elements: grid.total_elements(),
            output_elements: output.len(),
        });
    }

    log::debug!(
        "Dispatching beamforming grid: {} threadgroups x {} threads, {} elements per thread",
        grid.threadgroup_count(),
        grid.threads_per_threadgroup(),
        grid.samples_per_thread()
    );

    let samples_per_thread = grid.samples_per_thread();
    // chunks_mut with an exact divisor yields one chunk per grid cell, in linear
    // dispatch order, which is precisely the partition `thread_range` describes.
    output
        .par_chunks_mut(samples_per_thread)
        .enumerate()
        .for_each(|(linear_offset, chunk)| {
            let start = linear_offset * samples_per_thread;
            kernel::interpolate_range(params, raw_samples, tables, chunk, start);
        });

    Ok(())
}

/// Runs the kernel over the whole output space on a machine-sized grid.
///
/// Uses one threadgroup of `num_cpus::get()` threads when the core count divides the
/// element count evenly; otherwise falls back to the degenerate 1 x 1 grid rather
/// than reject a perfectly valid geometry over an accident of the host's core count.
pub fn beamform(
    params: &BeamformerParameters,
    raw_samples: &[Complex32],
    tables: &DelayTables,
    output: &mut [Complex32],
) -> Result<(), BeamformError> {
    let threads = num_cpus::get();
    let grid = if threads > 1 && params.output_element_count() % threads == 0 {
        ComputeGrid::new(params, 1, threads)?
    } else {
        ComputeGrid::sequential(params)
    };
    beamform_with_grid(params, &grid, raw_samples, tables, output)
}
