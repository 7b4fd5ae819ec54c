//! Delft3D-WAQ map files.
//!
//! A map file holds one value per (segment, variable) pair for every output time. The layout is
//! little-endian without record markers:
//!
//! | offset | content |
//! | --- | --- |
//! | 0 | title, 4 lines of 40 ASCII bytes |
//! | 160 | `nvar: i32`, `nseg: i32` |
//! | 168 | `nvar` names of 20 ASCII bytes, space padded |
//! | ... | per time: `time: i32` seconds, then `nseg * nvar` `f32`, segment-major |
//!
//! The number of times is not stored; it follows from the payload size.
use std::fs;
use std::path::Path;

use ndarray::{Array, Array1, Array2, Array3, ArrayView, Axis, Dimension, Ix1, Ix2, RemoveAxis, s};
use tracing::debug;

use crate::error::{MapAxis, Result, WaqError};

pub const TITLE_LINES: usize = 4;
pub const TITLE_WIDTH: usize = 40;
pub const NAME_WIDTH: usize = 20;
pub const SECONDS_PER_DAY: f64 = 86400.0;

const HEADER_BYTES: usize = TITLE_LINES * TITLE_WIDTH + 8;

/// Converts a map time stamp in seconds to fractional days.
pub fn seconds_to_days(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}

/// A copied block of map values whose first axis is the segment axis.
///
/// Segments are addressed by their 1-based id.
#[derive(Debug, Clone, PartialEq)]
pub struct BySegment<D: Dimension> {
    values: Array<f32, D>,
}

impl<D: Dimension + RemoveAxis> BySegment<D> {
    pub fn segment_count(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Everything stored for `seg`, `None` if the id is out of range.
    pub fn segment(&self, seg: usize) -> Option<ArrayView<'_, f32, D::Smaller>> {
        if seg == 0 || seg > self.segment_count() {
            return None;
        }
        Some(self.values.index_axis(Axis(0), seg - 1))
    }

    /// Underlying array, row `i` holding segment `i + 1`.
    pub fn into_array(self) -> Array<f32, D> {
        self.values
    }
}

impl BySegment<Ix1> {
    pub fn value(&self, seg: usize) -> Option<f32> {
        if seg == 0 {
            return None;
        }
        self.values.get(seg - 1).copied()
    }

    /// Like [`value`](Self::value) but reports an out of range id as an index error.
    pub fn try_value(&self, seg: usize) -> Result<f32> {
        self.value(seg).ok_or(WaqError::Index {
            axis: MapAxis::Segment,
            value: seg,
            start: 1,
            end: self.segment_count() + 1,
        })
    }
}

/// Contents of one map file, read completely into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStore {
    title: [String; TITLE_LINES],
    variables: Vec<String>,
    times: Vec<f64>,
    /// Indexed `[time, segment - 1, variable]`, the order of the file.
    values: Array3<f32>,
}

/// Hands out consecutive slices of the input and reports truncation.
struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    name: &'a str,
}

impl<'a> ByteCursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(n).filter(|&end| end <= self.bytes.len()).ok_or_else(|| {
            WaqError::format(
                self.name,
                format!(
                    "truncated {what}: need {n} bytes at offset {}, file has {}",
                    self.offset,
                    self.bytes.len()
                ),
            )
        })?;
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn take_i32(&mut self, what: &str) -> Result<i32> {
        let b = self.take(4, what)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

fn text_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .trim_start()
        .to_string()
}

fn padded(text: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = text.bytes().take(width).collect();
    out.resize(width, b' ');
    out
}

impl MapStore {
    /// Builds a store from its parts. `values` is indexed `[time, segment - 1, variable]`.
    ///
    /// Times are whole seconds that fit the `i32` stamps of the file format, in non-decreasing order.
    pub fn new(
        title: [String; TITLE_LINES],
        variables: Vec<String>,
        times: Vec<f64>,
        values: Array3<f32>,
    ) -> Result<Self> {
        let (ntime, nseg, nvar) = values.dim();
        if ntime != times.len() || nvar != variables.len() {
            return Err(WaqError::format(
                "map store",
                format!(
                    "values have shape {:?} but there are {} times and {} variables",
                    values.dim(),
                    times.len(),
                    variables.len()
                ),
            ));
        }
        if nseg == 0 || nvar == 0 {
            return Err(WaqError::format("map store", "needs at least one segment and one variable"));
        }
        if let Some((i, t)) = times
            .iter()
            .enumerate()
            .find(|(_, t)| !(t.fract() == 0.0 && **t >= i32::MIN as f64 && **t <= i32::MAX as f64))
        {
            return Err(WaqError::format(
                "map store",
                format!("time {t} at step {i} is not a whole number of seconds within the i32 range"),
            ));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(WaqError::format(
                "map store",
                format!("time {} at step {} precedes {} at step {}", times[i + 1], i + 1, times[i], i),
            ));
        }
        Ok(Self { title, variables, times, values })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes, &path.display().to_string())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes, "map file")
    }

    fn parse(bytes: &[u8], name: &str) -> Result<Self> {
        let mut cursor = ByteCursor { bytes, offset: 0, name };

        let title_bytes = cursor.take(TITLE_LINES * TITLE_WIDTH, "title")?;
        let title: [String; TITLE_LINES] =
            std::array::from_fn(|i| text_field(&title_bytes[i * TITLE_WIDTH..(i + 1) * TITLE_WIDTH]));

        let nvar = cursor.take_i32("variable count")?;
        let nseg = cursor.take_i32("segment count")?;
        if nvar <= 0 || nseg <= 0 {
            return Err(WaqError::format(name, format!("header declares nvar={nvar}, nseg={nseg}")));
        }
        let (nvar, nseg) = (nvar as usize, nseg as usize);

        let names_len = nvar
            .checked_mul(NAME_WIDTH)
            .ok_or_else(|| WaqError::format(name, format!("nvar={nvar} overflows the name table")))?;
        let names = cursor.take(names_len, "variable names")?;
        let variables: Vec<String> = names.chunks_exact(NAME_WIDTH).map(text_field).collect();

        let block = nseg
            .checked_mul(nvar)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| WaqError::format(name, format!("nseg={nseg} x nvar={nvar} overflows")))?;
        let record = block + 4;
        let payload = cursor.remaining();
        if payload % record != 0 {
            return Err(WaqError::format(
                name,
                format!(
                    "payload of {payload} bytes is not a whole number of {record}-byte records \
                     (nseg={nseg}, nvar={nvar})"
                ),
            ));
        }
        let ntime = payload / record;

        let mut times = Vec::with_capacity(ntime);
        let mut data: Vec<f32> = Vec::with_capacity(ntime * nseg * nvar);
        for _ in 0..ntime {
            times.push(cursor.take_i32("time stamp")? as f64);
            let raw: Vec<u32> = bytemuck::pod_collect_to_vec(cursor.take(block, "record")?);
            data.extend(raw.into_iter().map(|bits| f32::from_bits(u32::from_le(bits))));
        }
        let values = Array3::from_shape_vec((ntime, nseg, nvar), data)
            .map_err(|e| WaqError::format(name, e.to_string()))?;

        debug!(source = name, nseg, nvar, ntime, "loaded map file");
        Self::new(title, variables, times, values).map_err(|e| match e {
            WaqError::Format { reason, .. } => WaqError::format(name, reason),
            other => other,
        })
    }

    /// Serialises the store in the layout it was read from.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (ntime, nseg, nvar) = self.values.dim();
        let mut out = Vec::with_capacity(HEADER_BYTES + nvar * NAME_WIDTH + ntime * (4 + 4 * nseg * nvar));
        for line in &self.title {
            out.extend(padded(line, TITLE_WIDTH));
        }
        out.extend((nvar as i32).to_le_bytes());
        out.extend((nseg as i32).to_le_bytes());
        for name in &self.variables {
            out.extend(padded(name, NAME_WIDTH));
        }
        for (t, step) in self.times.iter().zip(self.values.outer_iter()) {
            out.extend((*t as i32).to_le_bytes());
            for v in step.iter() {
                out.extend(v.to_le_bytes());
            }
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn title(&self) -> &[String; TITLE_LINES] {
        &self.title
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Output times in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn times_in_days(&self) -> Vec<f64> {
        self.times.iter().copied().map(seconds_to_days).collect()
    }

    pub fn nseg(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn nvar(&self) -> usize {
        self.variables.len()
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    pub fn variable_index(&self, name: &str) -> Result<usize> {
        self.variables.iter().position(|v| v == name).ok_or_else(|| WaqError::UnknownVariable {
            name: name.to_string(),
            available: self.variables.clone(),
        })
    }

    /// Checks a 1-based segment id and returns its row in the value array.
    pub fn check_segment(&self, seg: usize) -> Result<usize> {
        if seg == 0 || seg > self.nseg() {
            return Err(WaqError::Index { axis: MapAxis::Segment, value: seg, start: 1, end: self.nseg() + 1 });
        }
        Ok(seg - 1)
    }

    pub fn check_variable(&self, v: usize) -> Result<()> {
        if v >= self.nvar() {
            return Err(WaqError::Index { axis: MapAxis::Variable, value: v, start: 0, end: self.nvar() });
        }
        Ok(())
    }

    pub fn check_time(&self, t: usize) -> Result<()> {
        if t >= self.ntime() {
            return Err(WaqError::Index { axis: MapAxis::Time, value: t, start: 0, end: self.ntime() });
        }
        Ok(())
    }

    pub fn at(&self, seg: usize, v: usize, t: usize) -> Result<f32> {
        let s = self.check_segment(seg)?;
        self.check_variable(v)?;
        self.check_time(t)?;
        Ok(self.values[[t, s, v]])
    }

    /// All values at time `t`, shaped segment x variable.
    pub fn at_time(&self, t: usize) -> Result<BySegment<Ix2>> {
        self.check_time(t)?;
        Ok(BySegment { values: self.values.index_axis(Axis(0), t).to_owned() })
    }

    /// All values of segment `seg`, shaped variable x time.
    pub fn at_segment(&self, seg: usize) -> Result<Array2<f32>> {
        let s = self.check_segment(seg)?;
        Ok(self.values.index_axis(Axis(1), s).t().to_owned())
    }

    /// All values of variable `v`, shaped segment x time.
    pub fn at_variable(&self, v: usize) -> Result<BySegment<Ix2>> {
        self.check_variable(v)?;
        Ok(BySegment { values: self.values.index_axis(Axis(2), v).t().to_owned() })
    }

    /// Variable `v` at time `t` for every segment.
    pub fn at_variable_time(&self, v: usize, t: usize) -> Result<BySegment<Ix1>> {
        self.check_variable(v)?;
        self.check_time(t)?;
        Ok(BySegment { values: self.values.slice(s![t, .., v]).to_owned() })
    }

    /// Variable `v` at segment `seg` across every time.
    pub fn series(&self, seg: usize, v: usize) -> Result<Array1<f32>> {
        let s = self.check_segment(seg)?;
        self.check_variable(v)?;
        Ok(self.values.slice(s![.., s, v]).to_owned())
    }
}
