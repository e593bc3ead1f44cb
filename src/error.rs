use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use image::ImageError;
use machine_learning::MlErr;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, GanErr>;

/// Every way a training or labeling run can fail. None of them is recovered from, the run is
/// aborted and the last written checkpoint is left as the usable artifact.
#[derive(Debug)]
pub enum GanErr {
    /// A dataset or checkpoint couldn't be read.
    DataLoad { source: String, msg: String },
    /// A latent dimension or image shape doesn't fit the model it's fed to.
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    /// A loss became NaN or infinite.
    NumericInstability {
        what: &'static str,
        epoch: usize,
        batch: usize,
        value: f32,
    },
    /// Caught before any training starts.
    InvalidConfig(String),
    Image(ImageError),
    Ml(MlErr),
    Io(io::Error),
}

impl GanErr {
    pub fn data_load(source: impl Display, msg: impl Display) -> Self {
        Self::DataLoad {
            source: source.to_string(),
            msg: msg.to_string(),
        }
    }
}

impl Display for GanErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataLoad { source, msg } => write!(f, "failed to load {source}: {msg}"),
            Self::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch in {what}, got {got:?} and expected {expected:?}"),
            Self::NumericInstability {
                what,
                epoch,
                batch,
                value,
            } => write!(
                f,
                "{what} became {value} at epoch {}, batch {}",
                epoch + 1,
                batch + 1
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Ml(e) => write!(f, "model error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for GanErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for GanErr {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => Self::ShapeMismatch {
                what,
                got,
                expected,
            },
            e => Self::Ml(e),
        }
    }
}

impl From<ImageError> for GanErr {
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<io::Error> for GanErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
