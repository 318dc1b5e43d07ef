// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Dataset identity: where a lane's data lives, what it is called and how
//! its axes are labeled.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{invalid, Error, Result};

// Files whose contents are addressed with an internal path suffix, as in
// "volume.h5/group/data".
const HIERARCHICAL_EXTENSIONS: [&str; 7] = ["h5", "hdf5", "ilp", "n5", "zarr", "npz", "klb"];

/// A dataset location split at the container file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathComponents {
    pub external_path: String,
    pub internal_path: Option<String>,
}

impl PathComponents {
    pub fn split(path: &str) -> PathComponents {
        let mut offset = 0;
        for segment in path.split('/') {
            let end = offset + segment.len();
            let is_container = Path::new(segment).extension()
                .and_then(|e| e.to_str())
                .map(|e| HIERARCHICAL_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if is_container && end < path.len() {
                let internal = &path[end..];
                return PathComponents{
                    external_path: path[..end].to_string(),
                    internal_path: if internal.trim_matches('/').is_empty() {
                        None
                    } else {
                        Some(internal.to_string())
                    },
                };
            }
            offset = end + 1;
        }
        PathComponents{external_path: path.to_string(), internal_path: None}
    }

    /// File stem of the external path, followed by the internal path with
    /// every '/' replaced by '-'.
    pub fn nickname(&self) -> String {
        let mut nickname = Path::new(&self.external_path).file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(internal) = &self.internal_path {
            let internal = if internal.starts_with('/') {
                internal.clone()
            } else {
                format!("/{}", internal)
            };
            nickname.push_str(&internal.replace('/', "-"));
        }
        nickname
    }
}

pub fn nickname(path: &str) -> String {
    PathComponents::split(path).nickname()
}

/// Axis along which a list of files is stacked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SequenceAxis {
    Channel,
    Z,
    Time,
}

impl SequenceAxis {
    pub fn key(&self) -> char {
        match self {
            SequenceAxis::Channel => 'c',
            SequenceAxis::Z => 'z',
            SequenceAxis::Time => 't',
        }
    }
}

impl FromStr for SequenceAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "c" => Ok(SequenceAxis::Channel),
            "z" => Ok(SequenceAxis::Z),
            "t" => Ok(SequenceAxis::Time),
            _ => Err(invalid(format!("unknown sequence axis '{}'", s))),
        }
    }
}

/// Ordered axis keys drawn from `t`, `z`, `y`, `x`, `c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxisTags {
    keys: String,
}

impl AxisTags {
    pub fn parse(keys: &str) -> Result<Self> {
        let mut seen = String::new();
        for k in keys.chars() {
            if !"tzyxc".contains(k) {
                return Err(invalid(format!("unknown axis '{}' in '{}'", k, keys)));
            }
            if seen.contains(k) {
                return Err(invalid(format!("duplicate axis '{}' in '{}'", k, keys)));
            }
            seen.push(k);
        }
        Ok(AxisTags{keys: seen})
    }

    pub fn default_for(ndim: usize) -> AxisTags {
        let keys = match ndim {
            0 => "",
            1 => "x",
            2 => "yx",
            3 => "yxc",
            4 => "zyxc",
            _ => "tzyxc",
        };
        AxisTags{keys: keys.to_string()}
    }

    pub fn keys(&self) -> &str {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_of(&self, key: char) -> Option<usize> {
        self.keys.find(key)
    }

    /// Fails with a dataset constraint error if these tags cannot label
    /// data of the given shape.
    pub fn check_compatible(&self, shape: &[usize]) -> Result<()> {
        if self.keys.len() != shape.len() {
            return Err(Error::DatasetConstraint(format!(
                "axis tags '{}' do not fit data of shape {:?}", self.keys, shape)));
        }
        Ok(())
    }

    /// Fails unless the tags carry the 2D spatial axes this engine needs.
    pub fn require_spatial_2d(&self) -> Result<()> {
        for key in ['y', 'x'] {
            if self.index_of(key).is_none() {
                return Err(Error::DatasetConstraint(format!(
                    "axis tags '{}' lack required axis '{}'", self.keys, key)));
            }
        }
        for key in ['z', 't'] {
            if self.index_of(key).is_some() {
                return Err(Error::DatasetConstraint(format!(
                    "axis tags '{}' describe more than 2 spatial dimensions",
                    self.keys)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for AxisTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys)
    }
}

/// Metadata for one lane's dataset, as shown in the lane table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetInfo {
    pub nickname: String,
    pub location: String,
    pub internal_paths: Vec<String>,
    pub axis_keys: String,
    pub lane_shape: Vec<usize>,
    pub drange: Option<(f64, f64)>,
    /// Resolution levels: key and dimensions in x, y, z order.
    pub scales: Vec<(String, Vec<usize>)>,
    pub working_scale: String,
    pub scale_locked: bool,
}

impl DatasetInfo {
    /// Describes a file at `path` whose data has `shape` labeled by `tags`.
    pub fn from_path(path: &str, tags: &AxisTags, shape: &[usize]) -> Result<Self> {
        tags.check_compatible(shape)?;
        let components = PathComponents::split(path);
        Ok(DatasetInfo{
            nickname: components.nickname(),
            location: components.external_path.clone(),
            internal_paths: components.internal_path.into_iter().collect(),
            axis_keys: tags.keys().to_string(),
            lane_shape: shape.to_vec(),
            ..Default::default()
        })
    }

    pub fn scale_dims(&self, key: &str) -> Option<&[usize]> {
        self.scales.iter().find(|(k, _)| k == key).map(|(_, dims)| dims.as_slice())
    }
}
