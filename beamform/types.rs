// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are
// used in one file.

use thiserror::Error;

/// The sentinel the acquisition side writes into a delay table entry when no valid
/// geometric delay exists for that (channel, pixel) pair, i.e. the pixel lies outside
/// the channel's receive aperture. The kernel skips these elements without touching
/// the corresponding output.
pub const INVALID_DELAY: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("channel_count must be strictly positive, but was {0}.")]
    NonPositiveChannelCount(i64),
    #[error("samples_per_channel must be strictly positive, but was {0}.")]
    NonPositiveSamplesPerChannel(i64),
    #[error("pixel_count must be strictly positive, but was {0}.")]
    NonPositivePixelCount(i64),
}

/// The immutable geometry of one beamforming session: how many transducer channels
/// are receiving, how many raw IQ samples each channel recorded, and how many image
/// pixels each channel contributes to.
///
/// Constructed once from the session configuration and read-only thereafter. The
/// constructor is the only validation point in the engine; the kernel trusts these
/// numbers unconditionally, so an instance can only exist with all fields strictly
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamformerParameters {
    channel_count: i64,
    samples_per_channel: i64,
    pixel_count: i64,
}

impl BeamformerParameters {
    pub fn new(
        channel_count: i64,
        samples_per_channel: i64,
        pixel_count: i64,
    ) -> Result<Self, ParameterError> {
        if channel_count <= 0 {
            return Err(ParameterError::NonPositiveChannelCount(channel_count));
        }
        if samples_per_channel <= 0 {
            return Err(ParameterError::NonPositiveSamplesPerChannel(
                samples_per_channel,
            ));
        }
        if pixel_count <= 0 {
            return Err(ParameterError::NonPositivePixelCount(pixel_count));
        }
        Ok(Self {
            channel_count,
            samples_per_channel,
            pixel_count,
        })
    }

    #[inline(always)]
    pub fn channel_count(&self) -> i64 {
        self.channel_count
    }

    #[inline(always)]
    pub fn samples_per_channel(&self) -> i64 {
        self.samples_per_channel
    }

    #[inline(always)]
    pub fn pixel_count(&self) -> i64 {
        self.pixel_count
    }

    /// Exclusive upper bound on a raw-sample index across all channels. A delay
    /// table entry whose upper interpolation neighbor reaches this bound is
    /// skipped; this is the engine's only out-of-bounds protection on the raw
    /// buffer, so the kernel's guard compares against exactly this value.
    #[inline(always)]
    pub fn valid_sample_cutoff(&self) -> i64 {
        self.channel_count * self.samples_per_channel
    }

    /// Length of every per-element table and of the output buffer: one slot per
    /// (channel, pixel) pair, flattened channel-major.
    #[inline(always)]
    pub fn output_element_count(&self) -> usize {
        (self.channel_count * self.pixel_count) as usize
    }

    /// Length of the flattened raw IQ buffer.
    #[inline(always)]
    pub fn raw_sample_count(&self) -> usize {
        self.valid_sample_cutoff() as usize
    }
}
