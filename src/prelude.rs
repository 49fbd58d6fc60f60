pub use crate::ModelError;
pub use crate::component::convolutional::ConvolutionalComponent;
pub use crate::component::factory::{
    ComponentDescriptor, init_component, init_component_with_rng, parse_component,
    read_component, write_component,
};
pub use crate::component::length_norm::LengthNormComponent;
pub use crate::component::max_pooling::{MaxPoolingComponent, TieRouting};
pub use crate::component::updatable::{ParameterGradients, TrainOptions, UpdatableComponent};
pub use crate::component::{Component, ComponentType, Matrix, Vector};
