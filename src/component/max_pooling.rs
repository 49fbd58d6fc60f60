use super::helper_functions::PoolGeometry;
use super::*;
use std::fmt::Write;

/// Threshold for deciding between parallel and sequential execution.
/// When the number of frames is >= this threshold, rows are processed in parallel.
const MAX_POOLING_PARALLEL_THRESHOLD: usize = 256;

/// Policy for routing the gradient of a pool whose maximum occurs more than once.
///
/// # Variants
///
/// - `FirstOccurrence` - Only the first maximal element in scan order (lowest block index)
///   receives the gradient
/// - `AllMaxima` - Every maximal element receives the full gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieRouting {
    #[default]
    FirstOccurrence,
    AllMaxima,
}

impl TieRouting {
    /// Returns the descriptor value of this policy (`First` or `All`).
    pub fn as_str(self) -> &'static str {
        match self {
            TieRouting::FirstOccurrence => "First",
            TieRouting::AllMaxima => "All",
        }
    }

    /// Parses the value of a `<TieRouting>` option.
    pub fn from_str_value(value: &str) -> Result<Self, ModelError> {
        match value {
            "First" => Ok(TieRouting::FirstOccurrence),
            "All" => Ok(TieRouting::AllMaxima),
            other => Err(ModelError::unexpected(other, "First or All for <TieRouting>")),
        }
    }
}

/// Max pooling over interleaved channel groups.
///
/// The input row is `input_dim / pool_stride` consecutive blocks of `pool_stride` channels
/// (e.g. the outputs of the filters of one convolution patch). Pool `q` takes, channel by
/// channel, the maximum over the `pool_size` blocks starting at block `q * pool_step`, and
/// writes it to output column `q * pool_stride + channel`.
///
/// In backpropagation the gradient of a pooled value is routed, unmodified, to the input element
/// that equals it (see [`TieRouting`]); the position is found again from `input` and `output`.
/// Where pools overlap, contributions to the same input element are summed.
///
/// NaN inputs never win a comparison: a pool ignores them, a pool whose values are all NaN
/// outputs `-inf`, and no NaN element receives a gradient.
///
/// # Example
/// ```rust
/// use acoustic_nnet::prelude::*;
/// use ndarray::array;
///
/// // 2 channels, 4 blocks, non-overlapping pools of 2 blocks
/// let component = MaxPoolingComponent::new(8, 4, 2, 2, 2).unwrap();
/// let input = array![[1.0, 8.0, 5.0, 2.0, 3.0, 4.0, 7.0, 0.0]];
/// let output = component.propagate(&input);
/// assert_eq!(output, array![[5.0, 8.0, 7.0, 4.0]]);
///
/// let input_diff = component.backpropagate(&input, &output, &array![[1.0, 2.0, 3.0, 4.0]]);
/// assert_eq!(input_diff, array![[0.0, 2.0, 1.0, 0.0, 0.0, 4.0, 3.0, 0.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct MaxPoolingComponent {
    input_dim: usize,
    output_dim: usize,
    pool_size: usize,
    pool_step: usize,
    pool_stride: usize,
    tie_routing: TieRouting,
}

impl MaxPoolingComponent {
    /// Creates a new max pooling component.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Number of input columns, a multiple of `pool_stride`
    /// - `output_dim` - Number of output columns, `num_pools * pool_stride`
    /// - `pool_size` - Number of blocks reduced by one pool
    /// - `pool_step` - Shift, in blocks, between successive pools
    /// - `pool_stride` - Number of channels in a block
    ///
    /// # Returns
    ///
    /// * `Result<MaxPoolingComponent, ModelError>` - The component or a `ConfigError`
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        pool_size: usize,
        pool_step: usize,
        pool_stride: usize,
    ) -> Result<Self, ModelError> {
        let kind = ComponentType::MaxPooling;
        validate_positive(pool_size, "<PoolSize>", kind)?;
        validate_positive(pool_step, "<PoolStep>", kind)?;
        validate_positive(pool_stride, "<PoolStride>", kind)?;
        validate_positive(input_dim, "<InputDim>", kind)?;
        validate_divisible(input_dim, "<InputDim>", pool_stride, "<PoolStride>", kind)?;

        let geometry = PoolGeometry {
            input_dim,
            pool_size,
            pool_step,
            pool_stride,
        };
        validate_window(
            pool_size,
            "<PoolSize>",
            pool_step,
            "<PoolStep>",
            geometry.num_patches(),
            "number of blocks",
            kind,
        )?;
        validate_dim_matches(output_dim, geometry.output_dim(), "<OutputDim>", kind)?;

        Ok(MaxPoolingComponent {
            input_dim,
            output_dim,
            pool_size,
            pool_step,
            pool_stride,
            tie_routing: TieRouting::default(),
        })
    }

    /// Returns the component with a different tie routing policy.
    pub fn with_tie_routing(mut self, tie_routing: TieRouting) -> Self {
        self.tie_routing = tie_routing;
        self
    }

    pub(crate) fn from_descriptor(descriptor: &mut ComponentDescriptor) -> Result<Self, ModelError> {
        let pool_size = descriptor.require_usize("<PoolSize>")?;
        let pool_step = descriptor.take_usize("<PoolStep>")?.unwrap_or(pool_size);
        let pool_stride = descriptor.require_usize("<PoolStride>")?;
        let tie_routing = match descriptor.take_word("<TieRouting>") {
            Some(value) => TieRouting::from_str_value(&value)?,
            None => TieRouting::default(),
        };
        Ok(Self::new(
            descriptor.input_dim(),
            descriptor.output_dim(),
            pool_size,
            pool_step,
            pool_stride,
        )?
        .with_tie_routing(tie_routing))
    }

    get_field!(get_pool_size, pool_size, usize);
    get_field!(get_pool_step, pool_step, usize);
    get_field!(get_pool_stride, pool_stride, usize);
    get_field!(get_tie_routing, tie_routing, TieRouting);

    /// Returns the pooling geometry of this component.
    pub fn geometry(&self) -> PoolGeometry {
        PoolGeometry {
            input_dim: self.input_dim,
            pool_size: self.pool_size,
            pool_step: self.pool_step,
            pool_stride: self.pool_stride,
        }
    }
}

impl Component for MaxPoolingComponent {
    fn component_type(&self) -> ComponentType {
        ComponentType::MaxPooling
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn propagate_fnc(&self, input: &Matrix, output: &mut Matrix) {
        let geometry = self.geometry();
        let num_frames = input.nrows();
        execute_parallel_or_sequential!(
            Zip::from(output.rows_mut()).and(input.rows()),
            num_frames,
            MAX_POOLING_PARALLEL_THRESHOLD,
            |mut out, x| {
                for q in 0..geometry.num_pools() {
                    for c in 0..geometry.pool_stride {
                        let mut max_val = f32::NEG_INFINITY;
                        for r in 0..geometry.pool_size {
                            let v = x[geometry.input_column(geometry.patch_in_pool(q, r), c)];
                            if v > max_val {
                                max_val = v;
                            }
                        }
                        out[geometry.output_column(q, c)] = max_val;
                    }
                }
            }
        );
    }

    fn backpropagate_fnc(
        &self,
        input: &Matrix,
        output: &Matrix,
        output_diff: &Matrix,
        input_diff: &mut Matrix,
    ) {
        let geometry = self.geometry();
        let tie_routing = self.tie_routing;
        let num_frames = input.nrows();
        execute_parallel_or_sequential!(
            Zip::from(input_diff.rows_mut())
                .and(input.rows())
                .and(output.rows())
                .and(output_diff.rows()),
            num_frames,
            MAX_POOLING_PARALLEL_THRESHOLD,
            |mut in_diff, x, y, out_diff| {
                for q in 0..geometry.num_pools() {
                    for c in 0..geometry.pool_stride {
                        let pooled = y[geometry.output_column(q, c)];
                        let grad = out_diff[geometry.output_column(q, c)];
                        for r in 0..geometry.pool_size {
                            let column = geometry.input_column(geometry.patch_in_pool(q, r), c);
                            if x[column] == pooled {
                                in_diff[column] += grad;
                                if tie_routing == TieRouting::FirstOccurrence {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        );
    }

    fn write_data(&self, out: &mut String) {
        let _ = write!(
            out,
            " <PoolSize> {} <PoolStep> {} <PoolStride> {}",
            self.pool_size, self.pool_step, self.pool_stride
        );
        if self.tie_routing != TieRouting::default() {
            let _ = write!(out, " <TieRouting> {}", self.tie_routing.as_str());
        }
    }

    fn info(&self) -> String {
        let geometry = self.geometry();
        format!(
            "\n  pool_size {}, pool_step {}, pool_stride {}, num_pools {}, tie_routing {}",
            self.pool_size,
            self.pool_step,
            self.pool_stride,
            geometry.num_pools(),
            self.tie_routing.as_str()
        )
    }

    fn box_clone(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}
