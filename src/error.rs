use thiserror::Error;

pub type SynthResult<T> = std::result::Result<T, SynthError>;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("unsupported {axis} kind '{name}'")]
    UnsupportedKind { axis: &'static str, name: String },

    #[error("shape mismatch: {left} channel(s) x {left_frames} frames vs {right} channel(s) x {right_frames} frames")]
    ShapeMismatch {
        left: u16,
        left_frames: usize,
        right: u16,
        right_frames: usize,
    },

    #[error("invalid color '{0}'")]
    InvalidColor(String),

    #[error("invalid tempo {0} BPM (must be > 0)")]
    InvalidTempo(f64),

    #[error("frame sequence is empty")]
    EmptySequence,

    #[error("cannot normalize a silent buffer")]
    SilentBuffer,

    #[error("sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("MIDI render failed: {0}")]
    RenderFailure(String),

    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    #[error("filter design failed: {0}")]
    Filter(String),

    #[error("frame {frame}: {source}")]
    AtFrame {
        frame: usize,
        #[source]
        source: Box<SynthError>,
    },
}

impl SynthError {
    pub fn at_frame(self, frame: usize) -> Self {
        SynthError::AtFrame {
            frame,
            source: Box::new(self),
        }
    }
}
