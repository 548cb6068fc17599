//! Encoder selection, the engine seam and the FFmpeg implementation.

pub mod adapter;
pub mod engine;
pub mod ffmpeg;
pub mod options;
pub mod progress;

pub use engine::{EncodingEngine, EngineEvent, EngineHandle, EngineRun, KillSignal};
pub use ffmpeg::FfmpegEngine;
pub use options::EncodeCommand;
