//! Deep (stacked) RBM composition.
//!
//! A [`DeepRbm`] is an ordered stack of [`RbmLayer`]s. Each layer holds
//! several independent RBMs that jointly partition a wide input across
//! narrower sub-models:
//!
//! ```text
//! h_2     (o   o   o   o)
//!           [X   X   X]
//! h_1     (o   o) (o   o)
//!           [X   X   X]
//! v       (o) (o) (o) (o)
//! ```
//!
//! Layer widths must chain: layer L's total hidden width (hidden units per
//! RBM times RBM count) is layer L+1's total visible width. The check runs at
//! construction, before any training, and failures name the offending layer.

use crate::matrix::Matrix;
use crate::rbm::{RandomRbmFactory, Rbm, RbmError, RbmResult};

/// Shape of one deep layer: how many RBMs, and the visible/hidden width of
/// each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerParameters {
    pub num_rbms: usize,
    pub visible_units_per_rbm: usize,
    pub hidden_units_per_rbm: usize,
}

impl LayerParameters {
    pub fn new(num_rbms: usize, visible_units_per_rbm: usize, hidden_units_per_rbm: usize) -> Self {
        Self {
            num_rbms,
            visible_units_per_rbm,
            hidden_units_per_rbm,
        }
    }

    /// Total visible width of the layer.
    pub fn visible_width(&self) -> usize {
        self.num_rbms * self.visible_units_per_rbm
    }

    /// Total hidden width of the layer.
    pub fn hidden_width(&self) -> usize {
        self.num_rbms * self.hidden_units_per_rbm
    }
}

/// One horizontal slice of the stack: an ordered list of independent RBMs.
///
/// No state is shared between the RBMs of a layer, which is what lets the
/// multi-threaded trainer run them concurrently.
#[derive(Debug, Clone)]
pub struct RbmLayer<M: Matrix> {
    rbms: Vec<Rbm<M>>,
}

impl<M: Matrix> RbmLayer<M> {
    pub fn new(rbms: Vec<Rbm<M>>) -> Self {
        Self { rbms }
    }

    pub fn size(&self) -> usize {
        self.rbms.len()
    }

    pub fn rbm(&self, r: usize) -> &Rbm<M> {
        &self.rbms[r]
    }

    pub fn rbms(&self) -> &[Rbm<M>] {
        &self.rbms
    }

    pub fn rbms_mut(&mut self) -> &mut [Rbm<M>] {
        &mut self.rbms
    }

    /// Sum of the visible widths of the layer's RBMs.
    pub fn visible_width(&self) -> usize {
        self.rbms.iter().map(Rbm::visible_size).sum()
    }

    /// Sum of the hidden widths of the layer's RBMs.
    pub fn hidden_width(&self) -> usize {
        self.rbms.iter().map(Rbm::hidden_size).sum()
    }
}

/// An ordered stack of RBM layers, validated so that each layer's hidden
/// width equals the next layer's visible width.
#[derive(Debug, Clone)]
pub struct DeepRbm<M: Matrix> {
    layers: Vec<RbmLayer<M>>,
    visible_size: usize,
    hidden_size: usize,
}

impl<M: Matrix> DeepRbm<M> {
    /// Build the stack from per-layer shape parameters, drawing fresh RBMs
    /// from the factory. Validation happens before any RBM is built.
    pub fn from_layer_parameters(
        layer_parameters: &[LayerParameters],
        factory: &mut RandomRbmFactory,
    ) -> RbmResult<Self> {
        check_layer_parameters(layer_parameters)?;

        let layers = layer_parameters
            .iter()
            .map(|p| {
                RbmLayer::new(
                    (0..p.num_rbms)
                        .map(|_| factory.build(p.visible_units_per_rbm, p.hidden_units_per_rbm))
                        .collect(),
                )
            })
            .collect();

        Ok(Self {
            layers,
            visible_size: layer_parameters[0].visible_width(),
            hidden_size: layer_parameters[layer_parameters.len() - 1].hidden_width(),
        })
    }

    /// Wrap pre-built layers (e.g. reloaded from disk), re-running the width
    /// chain validation.
    pub fn new(layers: Vec<RbmLayer<M>>) -> RbmResult<Self> {
        if layers.is_empty() {
            return Err(RbmError::InvalidConfig("deep RBM with no layers".to_string()));
        }
        for (l, layer) in layers.iter().enumerate() {
            if layer.size() == 0 {
                return Err(RbmError::InvalidConfig(format!("layer {} has no RBMs", l)));
            }
        }
        for l in 1..layers.len() {
            let hidden_out = layers[l - 1].hidden_width();
            let visible_in = layers[l].visible_width();
            if hidden_out != visible_in {
                return Err(RbmError::LayerMismatch {
                    layer: l,
                    hidden_out,
                    visible_in,
                });
            }
        }

        let visible_size = layers[0].visible_width();
        let hidden_size = layers[layers.len() - 1].hidden_width();
        Ok(Self {
            layers,
            visible_size,
            hidden_size,
        })
    }

    pub fn layers(&self) -> &[RbmLayer<M>] {
        &self.layers
    }

    pub fn layer_mut(&mut self, l: usize) -> &mut RbmLayer<M> {
        &mut self.layers[l]
    }

    /// Aggregate visible width of the first layer.
    pub fn visible_size(&self) -> usize {
        self.visible_size
    }

    /// Aggregate hidden width of the last layer.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

fn check_layer_parameters(layer_parameters: &[LayerParameters]) -> RbmResult<()> {
    if layer_parameters.is_empty() {
        return Err(RbmError::InvalidConfig("deep RBM with no layers".to_string()));
    }
    if let Some(p) = layer_parameters
        .iter()
        .find(|p| p.num_rbms == 0 || p.visible_units_per_rbm == 0 || p.hidden_units_per_rbm == 0)
    {
        return Err(RbmError::InvalidConfig(format!(
            "layer parameters with a zero width: {:?}",
            p
        )));
    }
    for l in 1..layer_parameters.len() {
        let hidden_out = layer_parameters[l - 1].hidden_width();
        let visible_in = layer_parameters[l].visible_width();
        if hidden_out != visible_in {
            return Err(RbmError::LayerMismatch {
                layer: l,
                hidden_out,
                visible_in,
            });
        }
    }
    Ok(())
}
