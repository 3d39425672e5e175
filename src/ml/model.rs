use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::{MseLoss, Reduction},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Which published layer stack to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    /// NVIDIA end-to-end driving network (Bojarski et al., 2016)
    Nvidia,
    /// comma.ai steering model
    Comma,
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::Nvidia => write!(f, "nvidia"),
            Architecture::Comma  => write!(f, "comma"),
        }
    }
}

impl std::str::FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nvidia" => Ok(Architecture::Nvidia),
            "comma"  => Ok(Architecture::Comma),
            other    => Err(format!("unknown architecture '{other}' (expected nvidia or comma)")),
        }
    }
}

/// One convolution in the stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvSpec {
    pub out_channels: usize,
    pub kernel:       usize,
    pub stride:       usize,
    pub padding:      usize,
}

const fn conv(out_channels: usize, kernel: usize, stride: usize, padding: usize) -> ConvSpec {
    ConvSpec { out_channels, kernel, stride, padding }
}

// Padding on the comma stack reproduces "same" output sizes
// (ceil(in / stride)) for a 66x200 input.
const NVIDIA_CONVS: [ConvSpec; 5] = [
    conv(24, 5, 2, 0),
    conv(36, 5, 2, 0),
    conv(48, 5, 2, 0),
    conv(64, 3, 1, 0),
    conv(64, 3, 1, 0),
];
const COMMA_CONVS: [ConvSpec; 3] = [
    conv(16, 8, 4, 3),
    conv(32, 5, 2, 2),
    conv(64, 5, 2, 2),
];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SteeringModelConfig {
    pub architecture: Architecture,
    #[config(default = 66)]
    pub input_height: usize,
    #[config(default = 200)]
    pub input_width: usize,
}

impl SteeringModelConfig {
    pub fn convs(&self) -> &'static [ConvSpec] {
        match self.architecture {
            Architecture::Nvidia => &NVIDIA_CONVS,
            Architecture::Comma  => &COMMA_CONVS,
        }
    }

    /// Hidden dense widths, each followed by (dropout, activation)
    pub fn hidden(&self) -> &'static [(usize, f64)] {
        match self.architecture {
            Architecture::Nvidia => &[(100, 0.0), (50, 0.0), (10, 0.0)],
            Architecture::Comma  => &[(512, 0.5)],
        }
    }

    fn flatten_dropout(&self) -> f64 {
        match self.architecture {
            Architecture::Nvidia => 0.5,
            Architecture::Comma  => 0.2,
        }
    }

    /// (scale, offset) applied to raw 0..255 pixels
    fn input_normalisation(&self) -> (f64, f64) {
        match self.architecture {
            Architecture::Nvidia => (1.0 / 255.0, -0.5),
            Architecture::Comma  => (1.0 / 127.5, -1.0),
        }
    }

    /// Spatial size after each convolution, starting from the input.
    pub fn feature_maps(&self) -> Vec<(usize, usize, usize)> {
        let mut maps = Vec::with_capacity(self.convs().len() + 1);
        let (mut c, mut h, mut w) = (3, self.input_height, self.input_width);
        maps.push((c, h, w));
        for spec in self.convs() {
            h = conv_out(h, spec);
            w = conv_out(w, spec);
            c = spec.out_channels;
            maps.push((c, h, w));
        }
        maps
    }

    pub fn flattened_size(&self) -> usize {
        self.feature_maps()
            .last()
            .map(|&(c, h, w)| c * h * w)
            .unwrap_or(0)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SteeringModel<B> {
        let mut in_channels = 3;
        let convs = self
            .convs()
            .iter()
            .map(|spec| {
                let padding = match spec.padding {
                    0 => PaddingConfig2d::Valid,
                    p => PaddingConfig2d::Explicit(p, p),
                };
                let layer = Conv2dConfig::new([in_channels, spec.out_channels], [spec.kernel, spec.kernel])
                    .with_stride([spec.stride, spec.stride])
                    .with_padding(padding)
                    .init(device);
                in_channels = spec.out_channels;
                layer
            })
            .collect();

        let mut width = self.flattened_size();
        let mut hidden = Vec::new();
        let mut hidden_dropout = Vec::new();
        for &(units, p) in self.hidden() {
            hidden.push(LinearConfig::new(width, units).init(device));
            hidden_dropout.push(DropoutConfig::new(p).init());
            width = units;
        }

        let (input_scale, input_offset) = self.input_normalisation();
        SteeringModel {
            convs,
            flatten_dropout: DropoutConfig::new(self.flatten_dropout()).init(),
            hidden,
            hidden_dropout,
            head: LinearConfig::new(width, 1).init(device),
            elu: self.architecture == Architecture::Comma,
            input_scale,
            input_offset,
        }
    }

    /// Layer-by-layer description for the summary command.
    pub fn describe(&self) -> Vec<String> {
        let act = match self.architecture {
            Architecture::Nvidia => "relu",
            Architecture::Comma  => "elu",
        };
        let (scale, offset) = self.input_normalisation();
        let maps = self.feature_maps();

        let mut lines = vec![format!(
            "input      {}x{}x3 → x*{scale:.5}{offset:+}",
            self.input_height, self.input_width
        )];
        for (i, spec) in self.convs().iter().enumerate() {
            let (c, h, w) = maps[i + 1];
            lines.push(format!(
                "conv{}      {}@{}x{}/{} → {}x{}x{}",
                i + 1, spec.out_channels, spec.kernel, spec.kernel, spec.stride, h, w, c
            ));
        }
        lines.push(format!(
            "flatten    {} → dropout {} → {act}",
            self.flattened_size(),
            self.flatten_dropout()
        ));
        for &(units, p) in self.hidden() {
            lines.push(format!("dense      {units} → dropout {p} → {act}"));
        }
        lines.push("dense      1".to_string());
        lines
    }
}

fn conv_out(size: usize, spec: &ConvSpec) -> usize {
    (size + 2 * spec.padding).saturating_sub(spec.kernel) / spec.stride + 1
}

#[derive(Module, Debug)]
pub struct SteeringModel<B: Backend> {
    pub convs:           Vec<Conv2d<B>>,
    pub flatten_dropout: Dropout,
    pub hidden:          Vec<Linear<B>>,
    pub hidden_dropout:  Vec<Dropout>,
    pub head:            Linear<B>,
    /// ELU (comma) instead of ReLU (nvidia)
    pub elu:             bool,
    pub input_scale:     f64,
    pub input_offset:    f64,
}

impl<B: Backend> SteeringModel<B> {
    /// images: [batch, 3, height, width] raw pixels → angles: [batch, 1]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images * self.input_scale + self.input_offset;

        // No activation after the last convolution; it comes after flatten.
        let last = self.convs.len().saturating_sub(1);
        for (i, conv) in self.convs.iter().enumerate() {
            x = conv.forward(x);
            if i < last {
                x = self.activate(x);
            }
        }

        let mut x = self.activate(self.flatten_dropout.forward(x.flatten::<2>(1, 3)));
        for (dense, dropout) in self.hidden.iter().zip(&self.hidden_dropout) {
            x = self.activate(dropout.forward(dense.forward(x)));
        }
        self.head.forward(x)
    }

    pub fn forward_loss(&self, images: Tensor<B, 4>, angles: Tensor<B, 2>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let predictions = self.forward(images);
        let loss = MseLoss::new().forward(predictions.clone(), angles, Reduction::Mean);
        (loss, predictions)
    }

    fn activate<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        if self.elu {
            elu(x)
        } else {
            burn::tensor::activation::relu(x)
        }
    }
}

/// elu(x) = x for x > 0, exp(x) - 1 otherwise
fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone().clamp_min(0.0) + x.clamp_max(0.0).exp() - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nvidia_feature_maps() {
        let cfg = SteeringModelConfig::new(Architecture::Nvidia);
        let maps = cfg.feature_maps();
        assert_eq!(maps[1], (24, 31, 98));
        assert_eq!(maps[3], (48, 5, 22));
        assert_eq!(*maps.last().unwrap(), (64, 1, 18));
        assert_eq!(cfg.flattened_size(), 1152);
    }

    #[test]
    fn test_comma_matches_same_padding() {
        let cfg  = SteeringModelConfig::new(Architecture::Comma);
        let maps = cfg.feature_maps();
        assert_eq!(maps[1], (16, 17, 50));
        assert_eq!(maps[2], (32, 9, 25));
        assert_eq!(maps[3], (64, 5, 13));
        assert_eq!(cfg.flattened_size(), 4160);
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        for arch in [Architecture::Nvidia, Architecture::Comma] {
            let model: SteeringModel<TestBackend> =
                SteeringModelConfig::new(arch).init(&device);
            let images = Tensor::<TestBackend, 4>::zeros([2, 3, 66, 200], &device);
            assert_eq!(model.forward(images).dims(), [2, 1], "{arch}");
        }
    }

    #[test]
    fn test_parameter_counts() {
        let device = Default::default();
        let nvidia: SteeringModel<TestBackend> =
            SteeringModelConfig::new(Architecture::Nvidia).init(&device);
        // conv: 1824 + 21636 + 43248 + 27712 + 36928
        // dense: 115300 + 5050 + 510 + 11
        assert_eq!(nvidia.num_params(), 252_219);
    }

    #[test]
    fn test_elu_values() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([-1.0, 0.0, 2.0], &device);
        let y = elu(x).into_data().to_vec::<f32>().unwrap();
        assert!((y[0] - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
        assert!(y[1].abs() < 1e-6);
        assert!((y[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_architecture_parsing() {
        assert_eq!("NVIDIA".parse::<Architecture>(), Ok(Architecture::Nvidia));
        assert_eq!("comma".parse::<Architecture>(), Ok(Architecture::Comma));
        assert!("lenet".parse::<Architecture>().is_err());
    }
}
