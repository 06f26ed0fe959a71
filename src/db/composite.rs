//! Domain value types produced by decoding composite and geometric columns.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// 2D point (`point`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

impl GeoPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Axis aligned box stored as its upper-right and lower-left corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeoBox {
    pub high: GeoPoint,
    pub low: GeoPoint,
}

impl GeoBox {
    pub fn new(high: GeoPoint, low: GeoPoint) -> Self {
        Self { high, low }
    }

    /// Corners in wire order: high x, high y, low x, low y.
    pub fn coords(&self) -> [f64; 4] {
        [self.high.x, self.high.y, self.low.x, self.low.y]
    }

    pub fn from_coords(c: [f64; 4]) -> Self {
        Self {
            high: GeoPoint::new(c[0], c[1]),
            low: GeoPoint::new(c[2], c[3]),
        }
    }
}

impl fmt::Display for GeoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.high, self.low)
    }
}

/// Byte size of one channel for each OpenCV depth code (CV_8U .. CV_16F).
const DEPTH_SIZES: [usize; 8] = [1, 1, 2, 2, 4, 4, 8, 2];

/// N-dimensional matrix in OpenCV layout (`cvmat`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    /// OpenCV type code: depth in the low 3 bits, channels - 1 above.
    pub element_type: i32,
    pub dims: Vec<i32>,
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
}

impl Matrix {
    /// Zero-filled matrix of the given shape, or `None` when the shape's byte length
    /// overflows or cannot be allocated.
    pub fn new(element_type: i32, dims: Vec<i32>) -> Option<Self> {
        Self::from_parts(element_type, dims, &[])
    }

    /// Build a matrix from decoded parts. The buffer is always sized to the shape; shorter
    /// wire data is zero padded and longer data truncated.
    pub fn from_parts(element_type: i32, dims: Vec<i32>, bytes: &[u8]) -> Option<Self> {
        let Some(len) = Self::byte_len(element_type, &dims) else {
            tracing::warn!(?dims, element_type, "matrix size overflows");
            return None;
        };
        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            tracing::warn!(len, "cannot allocate matrix data");
            return None;
        }
        if !bytes.is_empty() && bytes.len() != len {
            tracing::warn!(
                expected = len,
                actual = bytes.len(),
                "matrix data size does not match its dimensions"
            );
        }
        let n = bytes.len().min(len);
        data.extend_from_slice(&bytes[..n]);
        data.resize(len, 0);
        Some(Self {
            element_type,
            dims,
            data,
        })
    }

    pub fn element_size(element_type: i32) -> usize {
        let depth = (element_type & 7) as usize;
        let channels = ((element_type >> 3) & 0x1ff) as usize + 1;
        DEPTH_SIZES[depth] * channels
    }

    /// `product(dims) * element_size`, with negative dims counted as zero.
    pub fn byte_len(element_type: i32, dims: &[i32]) -> Option<usize> {
        dims.iter()
            .map(|d| (*d).max(0) as usize)
            .try_fold(Self::element_size(element_type), usize::checked_mul)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(
            f,
            "({},{{{}}},{})",
            self.element_type,
            dims.join(","),
            hex::encode(&self.data)
        )
    }
}

/// Detected event over an interval of a sequence (`vtevent`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntervalEvent {
    pub group_id: i32,
    pub class_id: i32,
    pub is_root: bool,
    pub region: GeoBox,
    pub score: f64,
    #[serde(serialize_with = "serialize_hex")]
    pub user_data: Vec<u8>,
}

impl fmt::Display for IntervalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{},{},{})",
            self.group_id,
            self.class_id,
            self.is_root,
            self.region,
            self.score,
            hex::encode(&self.user_data)
        )
    }
}

/// Lifecycle status of a processing worker (`pstatus` enum).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Unknown,
    Created,
    Running,
    Suspended,
    Finished,
    Error,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Unknown => "",
            ProcessStatus::Created => "created",
            ProcessStatus::Running => "running",
            ProcessStatus::Suspended => "suspended",
            ProcessStatus::Finished => "finished",
            ProcessStatus::Error => "error",
        }
    }

    /// Map a wire label; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl FromStr for ProcessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ProcessStatus::Created),
            "running" => Ok(ProcessStatus::Running),
            "suspended" => Ok(ProcessStatus::Suspended),
            "finished" => Ok(ProcessStatus::Finished),
            "error" => Ok(ProcessStatus::Error),
            other => Err(format!("Unknown process status: {}", other)),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of a processing worker (`pstate`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessState {
    pub status: ProcessStatus,
    pub progress: f32,
    pub current_item: String,
    pub last_error: String,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.status, self.progress, self.current_item, self.last_error
        )
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
