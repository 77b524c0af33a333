// ========================================================================================
//
//                  The kernel: delay interpolation and apodization
//
// ========================================================================================
//
// This module contains the innermost loop of the beamformer. For each (channel, pixel)
// slot it reads one delay-table entry, linearly interpolates between the two adjacent
// raw IQ samples at that delay, applies the per-element complex correction factor, and
// writes the result. It is allocation-free in the hot path and contains zero dispatch
// or partitioning decisions: the caller tells it exactly which contiguous slice of the
// output space to fill, either directly or via a grid cell.
//
// The single skip check (sentinel delay, or upper neighbor at the cutoff) is the
// engine's entire bounds protection for the raw buffer. It is not a correctness check
// on the interpolation weight: weights outside [0, 1) are accepted and extrapolate.

use crate::complex::Complex32;
use crate::grid::{ComputeGrid, GridCell};
use crate::types::{BeamformerParameters, INVALID_DELAY};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error(
        "The {name} buffer holds {actual} elements, but this geometry requires exactly \
         {expected}."
    )]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[inline]
fn check_length(
    name: &'static str,
    actual: usize,
    expected: usize,
) -> Result<(), BufferError> {
    if actual != expected {
        return Err(BufferError::LengthMismatch {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

/// A validated, zero-cost view over the three index-aligned per-element tables the
/// acquisition side derives from the session geometry.
///
/// This struct's constructor is the sole way to create an instance and performs a
/// single upfront check that every table spans the full (channel x pixel) output
/// space. That makes a short or mismatched table an unrepresentable state for the
/// kernel, so the hot loop can slice by range without per-element defensiveness.
#[derive(Clone, Copy, Debug)]
pub struct DelayTables<'a> {
    delay_index: &'a [i64],
    interpolation_weight: &'a [f32],
    element_weight: &'a [Complex32],
}

impl<'a> DelayTables<'a> {
    /// Creates a new, validated `DelayTables` view.
    ///
    /// `delay_index` holds the lower raw-sample index per output element, or
    /// [`INVALID_DELAY`] where the pixel falls outside the channel's aperture.
    /// `interpolation_weight` holds the fractional weight toward that lower sample.
    /// `element_weight` holds the complex apodization/steering factor applied after
    /// interpolation.
    pub fn new(
        params: &BeamformerParameters,
        delay_index: &'a [i64],
        interpolation_weight: &'a [f32],
        element_weight: &'a [Complex32],
    ) -> Result<Self, BufferError> {
        let expected = params.output_element_count();
        check_length("delay_index", delay_index.len(), expected)?;
        check_length("interpolation_weight", interpolation_weight.len(), expected)?;
        check_length("element_weight", element_weight.len(), expected)?;
        Ok(Self {
            delay_index,
            interpolation_weight,
            element_weight,
        })
    }
}

/// Checks the raw-sample and output buffers against the geometry. The kernel entry
/// points below trust their slice lengths, so every public path into them runs this
/// first.
pub fn check_sample_buffers(
    params: &BeamformerParameters,
    raw_samples: &[Complex32],
    output: &[Complex32],
) -> Result<(), BufferError> {
    check_length("raw_samples", raw_samples.len(), params.raw_sample_count())?;
    check_length("output", output.len(), params.output_element_count())?;
    Ok(())
}

/// The sequential form: fills `output`, a disjoint slice of the full output buffer
/// beginning at flat index `start`, from the tables and the shared raw IQ buffer.
///
/// Elements whose delay entry is the sentinel, or whose upper interpolation neighbor
/// would reach `valid_sample_cutoff`, are left exactly as they were; callers that
/// need a defined value there must zero-fill beforehand. Every other element is
/// overwritten with
/// `element_weight * (raw[lower] * alpha + raw[lower + 1] * (1 - alpha))`,
/// all arithmetic in single precision.
///
/// Caller contract (upheld by [`DelayTables::new`] and [`check_sample_buffers`]):
/// `start + output.len()` does not exceed the table length, and `raw_samples` spans
/// the full cutoff. A delay entry that is negative but not the sentinel violates the
/// acquisition contract and will panic on the slice index rather than read out of
/// bounds.
pub fn interpolate_range(
    params: &BeamformerParameters,
    raw_samples: &[Complex32],
    tables: &DelayTables,
    output: &mut [Complex32],
    start: usize,
) {
    let cutoff = params.valid_sample_cutoff();
    let end = start + output.len();
    let delays = &tables.delay_index[start..end];
    let weights = &tables.interpolation_weight[start..end];
    let corrections = &tables.element_weight[start..end];

    for (((out, &lower), &alpha), &correction) in output
        .iter_mut()
        .zip(delays)
        .zip(weights)
        .zip(corrections)
    {
        let upper = lower + 1;
        if lower == INVALID_DELAY || upper >= cutoff {
            continue;
        }

        let weighted_lower = raw_samples[lower as usize] * Complex32::from_real(alpha);
        let weighted_upper = raw_samples[upper as usize] * Complex32::from_real(1.0 - alpha);
        *out = correction * (weighted_lower + weighted_upper);
    }
}

/// The partition-aware form: one grid cell's worth of work. Computes its own slice
/// of the output space from the cell's coordinates and runs [`interpolate_range`]
/// over it.
///
/// `output` is the FULL output buffer; the cell writes only inside
/// `grid.thread_range(cell)`. This mirrors a GPU dispatch, where every invocation
/// sees the whole buffer and ranges never overlap by construction. The native
/// thread-pool driver in `pipeline` instead hands each worker a pre-split disjoint
/// chunk, so it calls [`interpolate_range`] directly.
pub fn interpolate_grid_cell(
    params: &BeamformerParameters,
    grid: &ComputeGrid,
    cell: GridCell,
    raw_samples: &[Complex32],
    tables: &DelayTables,
    output: &mut [Complex32],
) {
    let range = grid.thread_range(cell);
    let start = range.start;
    interpolate_range(params, raw_samples, tables, &mut output[range], start);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_samples(n: usize) -> Vec<Complex32> {
        (0..n).map(|i| Complex32::new((i + 1) as f32, 0.0)).collect()
    }

    #[test]
    fn interpolates_between_adjacent_samples() {
        // 2 channels x 4 samples, 1 pixel: cutoff 8, 2 output elements.
        let params = BeamformerParameters::new(2, 4, 1).unwrap();
        let raw = ramp_samples(8);
        let delays = [0i64, 6];
        let alphas = [0.5f32, 0.5];
        let corrections = [Complex32::new(1.0, 0.0); 2];
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();

        let mut output = [Complex32::ZERO; 2];
        interpolate_range(&params, &raw, &tables, &mut output, 0);

        // Midpoints of (raw[0], raw[1]) and (raw[6], raw[7]).
        assert_eq!(output[0], Complex32::new(1.5, 0.0));
        assert_eq!(output[1], Complex32::new(7.5, 0.0));
    }

    #[test]
    fn sentinel_and_cutoff_entries_leave_output_untouched() {
        let params = BeamformerParameters::new(2, 4, 1).unwrap();
        let raw = ramp_samples(8);
        // Second entry is out of bounds: 7 + 1 == cutoff of 8.
        let delays = [INVALID_DELAY, 7];
        let alphas = [0.5f32, 0.5];
        let corrections = [Complex32::new(1.0, 0.0); 2];
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();

        let sentinel_value = Complex32::new(-99.0, 42.0);
        let mut output = [sentinel_value; 2];
        interpolate_range(&params, &raw, &tables, &mut output, 0);

        assert_eq!(output[0], sentinel_value);
        assert_eq!(output[1], sentinel_value);
    }

    #[test]
    fn weight_endpoints_select_a_single_sample() {
        let params = BeamformerParameters::new(1, 4, 2).unwrap();
        let raw = ramp_samples(4);
        let delays = [1i64, 1];
        // alpha = 1 selects the lower sample outright, alpha = 0 the upper.
        let alphas = [1.0f32, 0.0];
        let corrections = [Complex32::new(2.0, 0.0), Complex32::new(2.0, 0.0)];
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();

        let mut output = [Complex32::ZERO; 2];
        interpolate_range(&params, &raw, &tables, &mut output, 0);

        assert_eq!(output[0], Complex32::new(4.0, 0.0)); // 2 * raw[1]
        assert_eq!(output[1], Complex32::new(6.0, 0.0)); // 2 * raw[2]
    }

    #[test]
    fn complex_correction_applies_the_full_product() {
        let params = BeamformerParameters::new(1, 2, 1).unwrap();
        let raw = vec![Complex32::new(1.0, 2.0), Complex32::new(3.0, -4.0)];
        let delays = [0i64];
        let alphas = [0.25f32];
        let corrections = [Complex32::new(0.0, 1.0)]; // pure 90-degree phase rotation
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();

        let mut output = [Complex32::ZERO; 1];
        interpolate_range(&params, &raw, &tables, &mut output, 0);

        let interpolated = raw[0] * Complex32::from_real(0.25)
            + raw[1] * Complex32::from_real(0.75);
        assert_eq!(output[0], corrections[0] * interpolated);
    }

    #[test]
    fn out_of_range_weights_extrapolate_instead_of_erroring() {
        let params = BeamformerParameters::new(1, 2, 1).unwrap();
        let raw = vec![Complex32::new(1.0, 0.0), Complex32::new(3.0, 0.0)];
        let delays = [0i64];
        let alphas = [2.0f32]; // 2*raw[0] + (-1)*raw[1] = -1
        let corrections = [Complex32::new(1.0, 0.0)];
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();

        let mut output = [Complex32::ZERO; 1];
        interpolate_range(&params, &raw, &tables, &mut output, 0);

        assert_eq!(output[0], Complex32::new(-1.0, 0.0));
    }

    #[test]
    fn grid_cell_form_writes_only_its_own_slice() {
        let params = BeamformerParameters::new(2, 4, 2).unwrap(); // 4 output elements
        let raw = ramp_samples(8);
        let delays = [0i64, 2, 4, 6];
        let alphas = [0.5f32; 4];
        let corrections = [Complex32::new(1.0, 0.0); 4];
        let tables = DelayTables::new(&params, &delays, &alphas, &corrections).unwrap();
        let grid = ComputeGrid::new(&params, 2, 1).unwrap();

        let mut output = [Complex32::ZERO; 4];
        interpolate_grid_cell(
            &params,
            &grid,
            GridCell {
                threadgroup_id: 1,
                thread_id: 0,
            },
            &raw,
            &tables,
            &mut output,
        );

        // Only the second threadgroup's half of the buffer was filled.
        assert_eq!(output[0], Complex32::ZERO);
        assert_eq!(output[1], Complex32::ZERO);
        assert_eq!(output[2], Complex32::new(5.5, 0.0));
        assert_eq!(output[3], Complex32::new(7.5, 0.0));
    }

    #[test]
    fn mismatched_table_lengths_are_rejected_by_name() {
        let params = BeamformerParameters::new(2, 4, 1).unwrap();
        let delays = [0i64; 2];
        let alphas = [0.0f32; 3]; // one too many
        let corrections = [Complex32::ZERO; 2];
        assert_eq!(
            DelayTables::new(&params, &delays, &alphas, &corrections).unwrap_err(),
            BufferError::LengthMismatch {
                name: "interpolation_weight",
                expected: 2,
                actual: 3,
            }
        );
    }
}
