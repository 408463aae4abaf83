use std::path::PathBuf;

use thiserror::Error;

use crate::display::NodeId;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("No compatible GPU adapter: {0}")]
    NoAdapter(String),
    #[error("Failed to create GPU device: {0}")]
    RequestDevice(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Node {0:?} does not exist")]
    InvalidNode(NodeId),
    #[error("Invalid tree operation: {0}")]
    InvalidTreeOperation(String),
    #[error("Child index {index} out of range (length {len})")]
    ChildIndexOutOfRange { index: usize, len: usize },
    #[error("Texture frame {x},{y} {width}x{height} does not fit inside the base texture ({base_width}x{base_height})")]
    InvalidFrame {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        base_width: u32,
        base_height: u32,
    },
    #[error("Pixel buffer of {actual} bytes does not match {width}x{height} RGBA ({expected} bytes)")]
    PixelBufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Failed to load resource '{name}' from {path}: {reason}")]
    Load {
        name: String,
        path: PathBuf,
        reason: String,
    },
    #[error("Failed to read back pixels: {0}")]
    Readback(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, StageError>;
