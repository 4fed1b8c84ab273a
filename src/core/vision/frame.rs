use std::path::Path;
use std::time::Duration;

use super::error::DetectionError;

/// 帧数据结构（RGBA 格式）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// 创建帧并校验数据长度
    pub fn from_rgba(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, DetectionError> {
        let frame = Self::new(width, height, data, timestamp_ms, frame_number);
        frame.validate()?;
        Ok(frame)
    }

    /// 解码图片（jpeg/png/bmp）为帧
    pub fn open<P: AsRef<Path>>(path: P, frame_number: u64) -> Result<Self, DetectionError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::new(width, height, img.into_raw(), 0, frame_number))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn expected_len(&self) -> usize {
        self.pixel_count() * 4
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.data.len() != self.expected_len() {
            return Err(DetectionError::InvalidFrame {
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }
}

/// 原始 YUV 帧（I420 格式）
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn to_rgba(&self) -> Result<Frame, DetectionError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_w = w.div_ceil(2);
        let chroma_len = chroma_w * h.div_ceil(2);

        if self.y_plane.len() < w * h {
            return Err(DetectionError::InvalidFrame {
                expected: w * h,
                actual: self.y_plane.len(),
            });
        }
        for plane in [&self.u_plane, &self.v_plane] {
            if plane.len() < chroma_len {
                return Err(DetectionError::InvalidFrame {
                    expected: chroma_len,
                    actual: plane.len(),
                });
            }
        }

        let mut rgba_data = vec![0u8; w * h * 4];

        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * chroma_w + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let rgba_idx = y_idx * 4;
                rgba_data[rgba_idx] = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                rgba_data[rgba_idx + 1] =
                    (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                rgba_data[rgba_idx + 2] = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;
                rgba_data[rgba_idx + 3] = 255;
            }
        }

        Ok(Frame::new(
            self.width,
            self.height,
            rgba_data,
            self.timestamp_ms,
            self.frame_number,
        ))
    }
}
