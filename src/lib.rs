//! Neural-network component primitives for acoustic models.
//!
//! Each component is a single differentiable layer operating on batches of frames
//! (rows of a [`Matrix`](component::Matrix)). Components are built from a textual descriptor,
//! propagate a batch forward and backpropagate a gradient without keeping any state between
//! the two calls.
//!
//! # Example
//! ```rust
//! use acoustic_nnet::prelude::*;
//! use ndarray::array;
//!
//! let component = parse_component("<LengthNormComponent> 5 5").unwrap();
//! let input = array![[1.0, 2.0, 3.0, 4.0, 5.0], [2.0, 3.0, 5.0, 6.0, 8.0]];
//! let output = component.propagate(&input);
//!
//! for row in output.rows() {
//!     let norm = row.dot(&row).sqrt();
//!     assert!((norm - 1.0).abs() < 1e-6);
//! }
//! ```

/// A macro that generates a getter method for any `Copy` field.
///
/// # Parameters
///
/// - `$method_name` - The name of the getter method (e.g., get_patch_dim)
/// - `$field_name` - The name of the field to access (e.g., patch_dim)
/// - `$return_type` - The return type of the getter method
macro_rules! get_field {
    ($method_name:ident, $field_name:ident, $return_type:ty) => {
        #[doc = concat!("Gets the `", stringify!($field_name), "` field.\n\n")]
        #[doc = "# Returns\n\n"]
        #[doc = concat!("* `", stringify!($return_type), "` - The value of the `", stringify!($field_name), "` field")]
        pub fn $method_name(&self) -> $return_type {
            self.$field_name
        }
    };
}

/// A macro that generates a public getter method returning a reference to a field.
///
/// # Parameters
///
/// - `$method_name` - The identifier for the generated getter method name
/// - `$field_name` - The identifier of the struct field to access
/// - `$return_type` - The reference type returned (e.g., `&Matrix`)
macro_rules! get_field_as_ref {
    ($method_name:ident, $field_name:ident, $return_type:ty) => {
        #[doc = concat!("Gets the `", stringify!($field_name), "` field.\n\n")]
        #[doc = "# Returns\n\n"]
        #[doc = concat!("* `", stringify!($return_type), "` - The value of the `", stringify!($field_name), "` field as a reference")]
        pub fn $method_name(&self) -> $return_type {
            &self.$field_name
        }
    };
}

/// Error type returned when a component cannot be built
pub mod error;
pub use error::ModelError;

/// Module `component` contains the component abstraction, the descriptor factory and
/// the concrete components.
///
/// # Components
///
/// - `LengthNormComponent` - scales every row to unit L2 norm
/// - `ConvolutionalComponent` - patch convolution over spliced frames with a filter bank
/// - `MaxPoolingComponent` - max pooling over interleaved channel groups
///
/// # Descriptor entry points
///
/// - `parse_component` / `init_component` - build a component, randomly initialising
///   missing parameters
/// - `read_component` - build a component whose parameters are all given inline
/// - `write_component` - serialize a component back into descriptor text
pub mod component;

/// Convenience re-exports of the most used types and functions
pub mod prelude;
