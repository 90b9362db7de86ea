//! Architecture configuration structures
//!
//! This module describes the classifier under attack in JSON: an ordered list
//! of layers, each optionally carrying its trained weights. Layers without
//! weights are Xavier-initialized from a seeded generator, which is enough for
//! smoke-testing an attack without a trained model.

use crate::layers::{Conv2DLayer, Conv2DShape, DenseLayer, Layer, ReluLayer};
use crate::model::Sequential;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Configuration for a single layer of the classifier.
///
/// Different layer types require different fields:
///
/// - **Dense**: Requires `input_size` and `output_size`
/// - **Conv2D**: Requires `in_channels`, `out_channels`, `kernel_size`, `input_height`, `input_width`,
///   and optional `padding` (default 0), `stride` (default 1)
/// - **ReLU**: Requires `size`
///
/// Dense and Conv2D layers accept optional `weights` and `biases`. Both must be
/// given together; dense weights are row-major (input × output), conv weights
/// are (out_channels × in_channels × kernel_size × kernel_size).
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "dense",
///   "input_size": 48,
///   "output_size": 10
/// }
/// ```
///
/// ```json
/// {
///   "layer_type": "conv2d",
///   "in_channels": 3,
///   "out_channels": 4,
///   "kernel_size": 3,
///   "padding": 1,
///   "input_height": 4,
///   "input_width": 4
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "dense", "conv2d", or "relu"
    pub layer_type: String,

    // Dense layer parameters
    /// Input size for Dense layer
    pub input_size: Option<usize>,
    /// Output size for Dense layer
    pub output_size: Option<usize>,

    // Conv2D layer parameters
    /// Number of input channels for Conv2D layer
    pub in_channels: Option<usize>,
    /// Number of output channels (filters) for Conv2D layer
    pub out_channels: Option<usize>,
    /// Kernel size for Conv2D layer (assumes square kernel)
    pub kernel_size: Option<usize>,
    /// Zero-padding for Conv2D layer (default: 0)
    pub padding: Option<isize>,
    /// Stride for Conv2D layer (default: 1)
    pub stride: Option<usize>,
    /// Input height for Conv2D layer
    pub input_height: Option<usize>,
    /// Input width for Conv2D layer
    pub input_width: Option<usize>,

    /// Feature count for ReLU layers
    pub size: Option<usize>,

    /// Trained weights (Dense and Conv2D)
    pub weights: Option<Vec<f32>>,
    /// Trained biases (Dense and Conv2D)
    pub biases: Option<Vec<f32>>,
}

/// Configuration for the entire classifier.
///
/// Layers are applied in the order they appear in the configuration.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     { "layer_type": "dense", "input_size": 48, "output_size": 16 },
///     { "layer_type": "relu", "size": 16 },
///     { "layer_type": "dense", "input_size": 16, "output_size": 10 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

fn invalid_data(message: impl Into<String>) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into an `ArchitectureConfig` and
/// validates it.
///
/// # Examples
///
/// ```no_run
/// use rust_adversarial_attacks::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/linear_3x4x4.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn required(value: Option<usize>, index: usize, layer: &str, field: &str) -> Result<usize, Box<dyn Error>> {
    match value {
        Some(0) => Err(invalid_data(format!(
            "Layer {}: {} must be greater than 0",
            index, field
        ))),
        Some(v) => Ok(v),
        None => Err(invalid_data(format!(
            "Layer {}: {} layer requires '{}'",
            index, layer, field
        ))),
    }
}

fn conv_shape(layer: &LayerConfig, index: usize) -> Result<Conv2DShape, Box<dyn Error>> {
    let stride = layer.stride.unwrap_or(1);
    if stride == 0 {
        return Err(invalid_data(format!(
            "Layer {}: stride must be greater than 0",
            index
        )));
    }
    let padding = layer.padding.unwrap_or(0);
    if padding < 0 {
        return Err(invalid_data(format!(
            "Layer {}: padding must be non-negative",
            index
        )));
    }

    let shape = Conv2DShape {
        in_channels: required(layer.in_channels, index, "Conv2D", "in_channels")?,
        out_channels: required(layer.out_channels, index, "Conv2D", "out_channels")?,
        kernel_size: required(layer.kernel_size, index, "Conv2D", "kernel_size")?,
        padding,
        stride,
        input_height: required(layer.input_height, index, "Conv2D", "input_height")?,
        input_width: required(layer.input_width, index, "Conv2D", "input_width")?,
    };

    let k = shape.kernel_size as isize;
    if shape.input_height as isize + 2 * padding < k || shape.input_width as isize + 2 * padding < k {
        return Err(invalid_data(format!(
            "Layer {}: kernel_size {} does not fit a padded {}x{} input",
            index, shape.kernel_size, shape.input_height, shape.input_width
        )));
    }

    Ok(shape)
}

/// Input and output feature counts of a layer configuration.
fn layer_sizes(layer: &LayerConfig, index: usize) -> Result<(usize, usize), Box<dyn Error>> {
    match layer.layer_type.to_lowercase().as_str() {
        "dense" => Ok((
            required(layer.input_size, index, "Dense", "input_size")?,
            required(layer.output_size, index, "Dense", "output_size")?,
        )),
        "conv2d" => {
            let shape = conv_shape(layer, index)?;
            let k = shape.kernel_size as isize;
            let pad = 2 * shape.padding;
            let out_h = ((shape.input_height as isize + pad - k) / shape.stride as isize + 1) as usize;
            let out_w = ((shape.input_width as isize + pad - k) / shape.stride as isize + 1) as usize;
            Ok((
                shape.in_channels * shape.input_height * shape.input_width,
                shape.out_channels * out_h * out_w,
            ))
        }
        "relu" => {
            let size = required(layer.size, index, "ReLU", "size")?;
            Ok((size, size))
        }
        _ => Err(invalid_data(format!(
            "Layer {}: Invalid layer type '{}'. Must be one of: dense, conv2d, relu",
            index, layer.layer_type
        ))),
    }
}

/// Validates a single layer configuration.
///
/// Checks required fields, positive sizes and, when weights are inlined, that
/// both arrays are present.
fn validate_layer(layer: &LayerConfig, index: usize) -> Result<(), Box<dyn Error>> {
    layer_sizes(layer, index)?;

    if layer.weights.is_some() != layer.biases.is_some() {
        return Err(invalid_data(format!(
            "Layer {}: 'weights' and 'biases' must be given together",
            index
        )));
    }
    if layer.layer_type.eq_ignore_ascii_case("relu") && layer.weights.is_some() {
        return Err(invalid_data(format!(
            "Layer {}: ReLU layer has no parameters",
            index
        )));
    }

    Ok(())
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Each layer has the required fields for its type
/// - Layer connections are valid (output size of layer i matches input size of layer i+1)
fn validate_architecture(config: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid_data("Architecture must have at least one layer"));
    }

    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
    }

    for i in 0..config.layers.len() - 1 {
        let (_, current_output) = layer_sizes(&config.layers[i], i)?;
        let (next_input, _) = layer_sizes(&config.layers[i + 1], i + 1)?;

        if current_output != next_input {
            return Err(invalid_data(format!(
                "Layer connection mismatch: Layer {} output size ({}) does not match Layer {} input size ({})",
                i, current_output, i + 1, next_input
            )));
        }
    }

    Ok(())
}

/// Builds a classifier from an architecture configuration.
///
/// Layers with inline `weights`/`biases` use them (lengths are checked);
/// the rest are Xavier-initialized from `rng`.
///
/// # Examples
///
/// ```no_run
/// use rand::{rngs::StdRng, SeedableRng};
/// use rust_adversarial_attacks::architecture::{build_model, load_architecture};
///
/// let config = load_architecture("config/architectures/linear_3x4x4.json").unwrap();
/// let mut rng = StdRng::seed_from_u64(42);
/// let model = build_model(&config, &mut rng).unwrap();
/// assert_eq!(model.len(), config.layers.len());
/// ```
pub fn build_model(
    config: &ArchitectureConfig,
    rng: &mut StdRng,
) -> Result<Sequential, Box<dyn Error>> {
    validate_architecture(config)?;

    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.layers.len());

    for (i, layer_config) in config.layers.iter().enumerate() {
        let parameters = layer_config.weights.clone().zip(layer_config.biases.clone());

        match layer_config.layer_type.to_lowercase().as_str() {
            "dense" => {
                let (input_size, output_size) = layer_sizes(layer_config, i)?;
                let layer = match parameters {
                    Some((weights, biases)) => {
                        DenseLayer::from_parameters(input_size, output_size, weights, biases)
                            .map_err(|err| invalid_data(format!("Layer {}: {}", i, err)))?
                    }
                    None => DenseLayer::new(input_size, output_size, rng),
                };
                layers.push(Box::new(layer));
            }
            "conv2d" => {
                let shape = conv_shape(layer_config, i)?;
                let layer = match parameters {
                    Some((weights, biases)) => Conv2DLayer::from_parameters(shape, weights, biases)
                        .map_err(|err| invalid_data(format!("Layer {}: {}", i, err)))?,
                    None => Conv2DLayer::new(shape, rng),
                };
                layers.push(Box::new(layer));
            }
            "relu" => {
                let (size, _) = layer_sizes(layer_config, i)?;
                layers.push(Box::new(ReluLayer::new(size)));
            }
            _ => {
                return Err(invalid_data(format!(
                    "Layer {}: Invalid layer type '{}'. Must be one of: dense, conv2d, relu",
                    i, layer_config.layer_type
                )));
            }
        }
    }

    Ok(Sequential::new(layers)?)
}
