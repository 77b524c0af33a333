// ========================================================================================
//
//                 THE COMPUTE GRID: GPU-STYLE WORK PARTITIONING, VALIDATED
//
// ========================================================================================
//
// The kernel was written to run unchanged under a GPU compute dispatch or on native
// threads. Both substrates see the same two-level grid: a number of threadgroups, each
// holding a number of threads, every (threadgroup, thread) cell owning one contiguous
// slice of the flattened (channel x pixel) output space. This module is the pure index
// arithmetic for that mapping and nothing else; it performs ZERO beamforming logic.
//
// The mapping only covers the whole output when the element count divides evenly
// through both grid levels. A configuration where it does not would silently leave the
// trailing elements of the image unwritten, so the constructor rejects it before any
// compute is dispatched.

use crate::types::BeamformerParameters;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("threadgroup_count must be strictly positive, but was 0.")]
    ZeroThreadgroups,
    #[error("threads_per_threadgroup must be strictly positive, but was 0.")]
    ZeroThreadsPerThreadgroup,
    #[error(
        "Cannot partition {total_elements} output elements into {threadgroup_count} \
         threadgroups: the division leaves a remainder of {remainder} elements that no \
         threadgroup would ever process."
    )]
    IndivisibleByThreadgroups {
        total_elements: usize,
        threadgroup_count: usize,
        remainder: usize,
    },
    #[error(
        "Cannot partition {samples_per_group} elements per threadgroup across \
         {threads_per_threadgroup} threads: the division leaves a remainder of \
         {remainder} elements that no thread would ever process."
    )]
    IndivisibleByThreads {
        samples_per_group: usize,
        threads_per_threadgroup: usize,
        remainder: usize,
    },
}

/// One execution unit's coordinates within the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub threadgroup_id: usize,
    pub thread_id: usize,
}

/// A validated two-level partition of `[0, output_element_count)`.
///
/// This struct's constructor guarantees that an instance can only exist if the
/// output element count divides exactly through both grid levels, which makes a
/// gap-leaving or overlapping partition an unrepresentable state. Every consumer
/// downstream (the kernel's grid-cell entry point, the rayon dispatcher) leans on
/// that guarantee instead of re-checking bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeGrid {
    total_elements: usize,
    threadgroup_count: usize,
    threads_per_threadgroup: usize,
    samples_per_thread: usize,
}

impl ComputeGrid {
    /// The sole entry point for creating a grid. Rejects empty grid dimensions and
    /// any configuration whose division leaves a remainder at either level.
    pub fn new(
        params: &BeamformerParameters,
        threadgroup_count: usize,
        threads_per_threadgroup: usize,
    ) -> Result<Self, GridError> {
        if threadgroup_count == 0 {
            return Err(GridError::ZeroThreadgroups);
        }
        if threads_per_threadgroup == 0 {
            return Err(GridError::ZeroThreadsPerThreadgroup);
        }

        let total_elements = params.output_element_count();
        let remainder = total_elements % threadgroup_count;
        if remainder != 0 {
            return Err(GridError::IndivisibleByThreadgroups {
                total_elements,
                threadgroup_count,
                remainder,
            });
        }

        let samples_per_group = total_elements / threadgroup_count;
        let remainder = samples_per_group % threads_per_threadgroup;
        if remainder != 0 {
            return Err(GridError::IndivisibleByThreads {
                samples_per_group,
                threads_per_threadgroup,
                remainder,
            });
        }

        Ok(Self {
            total_elements,
            threadgroup_count,
            threads_per_threadgroup,
            samples_per_thread: samples_per_group / threads_per_threadgroup,
        })
    }

    /// The degenerate single-threadgroup, single-thread grid. Always valid: one
    /// cell owning the entire output range.
    pub fn sequential(params: &BeamformerParameters) -> Self {
        Self {
            total_elements: params.output_element_count(),
            threadgroup_count: 1,
            threads_per_threadgroup: 1,
            samples_per_thread: params.output_element_count(),
        }
    }

    /// Maps a cell to its contiguous slice of the flattened output space.
    ///
    /// All threads are laid out linearly, threadgroup-major, and each owns
    /// `samples_per_thread` consecutive elements. Cells must belong to this grid;
    /// the dispatcher only ever produces in-range coordinates.
    #[inline]
    pub fn thread_range(&self, cell: GridCell) -> Range<usize> {
        debug_assert!(cell.threadgroup_id < self.threadgroup_count);
        debug_assert!(cell.thread_id < self.threads_per_threadgroup);
        let linear_offset = cell.threadgroup_id * self.threads_per_threadgroup + cell.thread_id;
        let start = linear_offset * self.samples_per_thread;
        start..start + self.samples_per_thread
    }

    #[inline(always)]
    pub fn samples_per_thread(&self) -> usize {
        self.samples_per_thread
    }

    #[inline(always)]
    pub fn threadgroup_count(&self) -> usize {
        self.threadgroup_count
    }

    #[inline(always)]
    pub fn threads_per_threadgroup(&self) -> usize {
        self.threads_per_threadgroup
    }

    /// Total number of execution units in the grid.
    #[inline(always)]
    pub fn cell_count(&self) -> usize {
        self.threadgroup_count * self.threads_per_threadgroup
    }

    /// Total number of output elements the grid partitions.
    #[inline(always)]
    pub fn total_elements(&self) -> usize {
        self.total_elements
    }

    /// Iterates every cell in linear dispatch order (threadgroup-major).
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.threadgroup_count).flat_map(move |threadgroup_id| {
            (0..self.threads_per_threadgroup).map(move |thread_id| GridCell {
                threadgroup_id,
                thread_id,
            })
        })
    }
}
