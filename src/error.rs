use thiserror::Error;

use crate::codec::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open frame source `{0}`")]
    SourceUnavailable(String),

    #[error("ground truth line {line}: {source}")]
    GroundTruth {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("no ground truth for frame {frame} ({available} boxes available)")]
    InsufficientGroundTruth { frame: usize, available: usize },

    #[error("unknown tracker `{0}`")]
    TrackerUnavailable(String),

    #[error("frame source ended at frame {frame}, expected {expected} frames")]
    SourceExhausted { frame: usize, expected: usize },

    #[error("frame area {frame_area} is smaller than the union of the boxes ({union})")]
    InvalidFrameArea { frame_area: f64, union: f64 },

    #[error("cannot encode box {0}")]
    Encode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("tracker failure: {0}")]
    Tracker(String),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCvError(#[from] opencv::Error),
}
