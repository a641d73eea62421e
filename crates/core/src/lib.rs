pub mod concat;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod probe;
pub mod process;
pub mod provider;
pub mod rasterize;
pub mod reconcile;
pub mod render;
pub mod scheduler;
pub mod speech;
pub mod store;
pub mod timeline;
pub mod types;
pub mod workdir;

pub use concat::{Concatenator, FfmpegConcatenator};
pub use config::{PipelineConfig, RenderSettings, Timeouts};
pub use convert::{DeckFormat, OfficeConverter};
pub use error::{LectureVideoError, Result, SynthesisError};
pub use format::{format_quiz_timestamps, format_timestamp};
pub use pipeline::{LecturePipeline, PipelineBuilder};
pub use probe::{FfprobeProbe, MediaProbe, WavProbe};
pub use provider::{AudioEncoding, ProviderError, SpeechProvider};
pub use rasterize::{PdftoppmRasterizer, Rasterizer};
pub use render::{FfmpegRenderer, SegmentRenderer};
pub use speech::{
    FixedVoice, GoogleSpeechClient, GoogleVoiceDirectory, SpeechRequest, SpeechSynthesizer,
    VoiceDirectory,
};
pub use store::{BlobStore, LocalDirStore};
pub use types::{
    AudioSegment, LectureRequest, LectureSpeed, LectureVideo, SlideImage, SlideScript,
    VideoSegment, VoiceGender,
};
pub use workdir::{JobLayout, WorkDir, get_root_work_dir};
