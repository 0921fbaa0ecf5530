//! Rendered frame buffers
//!
//! The engine emits raw, uncompressed pixel rows bottom-up (OpenGL order).
//! Frames here are stored top-down; the conversions below flip rows.

use crate::error::{Result, ThorError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image channel a frame was rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameKind {
    Rgb,
    Depth,
    Normals,
    Flow,
    InstanceSegmentation,
    SemanticSegmentation,
}

impl FrameKind {
    /// Bytes per pixel on the wire
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameKind::Depth => 4,
            _ => 3,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Rgb => "rgb",
            FrameKind::Depth => "depth",
            FrameKind::Normals => "normals",
            FrameKind::Flow => "flow",
            FrameKind::InstanceSegmentation => "instance segmentation",
            FrameKind::SemanticSegmentation => "semantic segmentation",
        };
        f.write_str(name)
    }
}

fn check_len(kind: FrameKind, got: usize, width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize * kind.bytes_per_pixel();
    if got != expected {
        return Err(ThorError::Protocol(format!(
            "{kind} frame is {got} bytes, expected {expected} for {width}x{height}"
        )));
    }
    Ok(())
}

fn flip_rows<T: Clone>(data: &[T], row_len: usize) -> Vec<T> {
    if row_len == 0 {
        return Vec::new();
    }
    data.chunks_exact(row_len).rev().flatten().cloned().collect()
}

/// 8-bit multi-channel image, rows top-down
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Decode a 3-channel wire buffer
    pub fn from_wire(kind: FrameKind, bytes: &[u8], width: u32, height: u32) -> Result<Self> {
        check_len(kind, bytes.len(), width, height)?;
        Ok(Self {
            width,
            height,
            channels: 3,
            data: flip_rows(bytes, width as usize * 3),
        })
    }

    /// Encode to the wire's bottom-up row order
    pub fn to_wire(&self) -> Vec<u8> {
        flip_rows(&self.data, (self.width * self.channels) as usize)
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        self.data.get(start..start + c)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Per-pixel depth in meters, rows top-down
#[derive(Clone, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl DepthFrame {
    /// Decode a little-endian f32 wire buffer
    pub fn from_wire(bytes: &[u8], width: u32, height: u32) -> Result<Self> {
        check_len(FrameKind::Depth, bytes.len(), width, height)?;
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self {
            width,
            height,
            data: flip_rows(&values, width as usize),
        })
    }

    pub fn to_wire(&self) -> Vec<u8> {
        flip_rows(&self.data, self.width as usize)
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect()
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    pub fn at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl fmt::Debug for DepthFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
