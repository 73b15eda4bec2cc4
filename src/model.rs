//! Description of the feed-forward classifier trained on the feature
//! matrices.
//!
//! Building and training the network is left to a machine-learning backend;
//! this module only fixes the shape of the network and the contract a
//! backend implements.

use serde::{Deserialize, Serialize};

use crate::types::{Result, SessionError};

/// Number of classes predicted by the readout layer.
pub const READOUT_UNITS: usize = 2;

/// Hidden-layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

/// Optimizer used when compiling the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimizer {
    Rmsprop,
    Adam,
    Sgd,
}

/// Training loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    CategoricalCrossentropy,
    BinaryCrossentropy,
    MeanSquaredError,
}

/// A fully connected layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Number of units
    pub units: usize,
    /// Layer name
    pub name: String,
    /// Activation of the layer
    pub activation: Activation,
}

/// Shape and training setup of a dense binary classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Number of input features
    pub input_dim: usize,
    /// Hidden layers as (units, name), input side first
    pub hidden: Vec<(usize, String)>,
    /// Activation of every hidden layer
    pub activation: Activation,
    /// Optimizer
    pub optimizer: Optimizer,
    /// Loss
    pub loss: Loss,
}

impl NetworkSpec {
    /// The default 50-20-5 network over `input_dim` features.
    pub fn new(input_dim: usize) -> Self {
        NetworkSpec {
            input_dim,
            hidden: vec![
                (50, "Dense_1".to_string()),
                (20, "Dense_2".to_string()),
                (5, "Dense_3".to_string()),
            ],
            activation: Activation::Relu,
            optimizer: Optimizer::Rmsprop,
            loss: Loss::CategoricalCrossentropy,
        }
    }

    /// Every layer after the input, ending with the softmax readout.
    pub fn layers(&self) -> Result<Vec<DenseLayer>> {
        if self.input_dim == 0 {
            return Err(SessionError::InvalidNetwork("input has no features".into()));
        }
        let mut layers = Vec::with_capacity(self.hidden.len() + 1);
        for (units, name) in &self.hidden {
            if *units == 0 {
                return Err(SessionError::InvalidNetwork(format!("layer `{}` has no units", name)));
            }
            if name == "readout" || layers.iter().any(|l: &DenseLayer| &l.name == name) {
                return Err(SessionError::InvalidNetwork(format!(
                    "duplicate layer name `{}`",
                    name
                )));
            }
            layers.push(DenseLayer {
                units: *units,
                name: name.clone(),
                activation: self.activation,
            });
        }
        layers.push(DenseLayer {
            units: READOUT_UNITS,
            name: "readout".to_string(),
            activation: Activation::Softmax,
        });
        Ok(layers)
    }
}

/// A backend that turns a [`NetworkSpec`] into a compiled classifier.
///
/// Implementations must add the readout returned by
/// [`NetworkSpec::layers`] and report accuracy as a training metric.
pub trait ClassifierBuilder {
    /// The compiled model
    type Model;

    /// Builds and compiles the network.
    fn build(&self, spec: &NetworkSpec) -> Result<Self::Model>;
}
