//! Index mapping between flat matrix columns and the patch/pool layout of a frame.
//!
//! Convolution input is `num_splice` consecutive blocks of `patch_stride` columns (one block per
//! spliced frame). Patch `p` reads `patch_dim` consecutive columns starting at `p * patch_step`
//! inside every block:
//!
//! ```text
//! |----------|----------|----------|   input, 3 blocks of patch_stride
//!  xxx        xxx        xxx           patch 0
//!   xxx        xxx        xxx          patch 1 (patch_step = 1)
//! ```
//!
//! Pooling input is `num_patches` consecutive blocks of `pool_stride` channels. Pool `q` takes the
//! channel-wise max over the `pool_size` blocks starting at block `q * pool_step`.

use std::ops::Range;

/// Convolution geometry; all fields are validated by the convolutional component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGeometry {
    pub input_dim: usize,
    pub patch_dim: usize,
    pub patch_step: usize,
    pub patch_stride: usize,
}

impl PatchGeometry {
    /// Number of spliced frames (blocks of `patch_stride` columns) in one input row.
    pub fn num_splice(&self) -> usize {
        self.input_dim / self.patch_stride
    }

    /// Number of patch positions inside one block.
    pub fn num_patches(&self) -> usize {
        1 + (self.patch_stride - self.patch_dim) / self.patch_step
    }

    /// Length of a patch feature vector, i.e. the number of filter columns.
    pub fn filter_dim(&self) -> usize {
        self.num_splice() * self.patch_dim
    }

    /// Input column read by patch `patch`, block `splice`, tap `tap`.
    pub fn input_column(&self, patch: usize, splice: usize, tap: usize) -> usize {
        patch * self.patch_step + splice * self.patch_stride + tap
    }

    /// Position of (`splice`, `tap`) within the patch feature vector.
    pub fn filter_column(&self, splice: usize, tap: usize) -> usize {
        splice * self.patch_dim + tap
    }

    /// Input columns gathered into the feature vector of `patch`, in feature-vector order.
    pub fn patch_columns(&self, patch: usize) -> Vec<usize> {
        let mut columns = vec![0; self.filter_dim()];
        for splice in 0..self.num_splice() {
            for tap in 0..self.patch_dim {
                columns[self.filter_column(splice, tap)] = self.input_column(patch, splice, tap);
            }
        }
        columns
    }

    /// Output columns holding the activations of all `num_filters` filters on patch `patch`.
    pub fn output_columns(&self, patch: usize, num_filters: usize) -> Range<usize> {
        patch * num_filters..(patch + 1) * num_filters
    }
}

/// Pooling geometry; all fields are validated by the max-pooling component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolGeometry {
    pub input_dim: usize,
    pub pool_size: usize,
    pub pool_step: usize,
    pub pool_stride: usize,
}

impl PoolGeometry {
    /// Number of blocks of `pool_stride` channels in one input row.
    pub fn num_patches(&self) -> usize {
        self.input_dim / self.pool_stride
    }

    /// Number of pooling windows.
    pub fn num_pools(&self) -> usize {
        1 + (self.num_patches() - self.pool_size) / self.pool_step
    }

    /// Number of output columns.
    pub fn output_dim(&self) -> usize {
        self.num_pools() * self.pool_stride
    }

    /// Block index of the `offset`-th member of pool `pool`.
    pub fn patch_in_pool(&self, pool: usize, offset: usize) -> usize {
        pool * self.pool_step + offset
    }

    /// Input column of channel `channel` in block `patch`.
    pub fn input_column(&self, patch: usize, channel: usize) -> usize {
        patch * self.pool_stride + channel
    }

    /// Output column of channel `channel` in pool `pool`.
    pub fn output_column(&self, pool: usize, channel: usize) -> usize {
        pool * self.pool_stride + channel
    }
}
