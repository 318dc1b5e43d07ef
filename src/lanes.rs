// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Toolkit-independent model of the per-lane dataset table.
//!
//! One row per lane, fixed columns. Views observe the table through
//! [LaneTable::subscribe()]; events are delivered synchronously, in
//! subscription order, on the thread that mutated the table.

use log::debug;

use crate::dataset::DatasetInfo;
use crate::error::{invalid, Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DatasetColumn {
    Nickname,
    Location,
    InternalID,
    TaggedShape,
    Scale,
    Range,
}

pub const COLUMN_COUNT: usize = 6;

impl DatasetColumn {
    pub const ALL: [DatasetColumn; COLUMN_COUNT] = [
        DatasetColumn::Nickname, DatasetColumn::Location, DatasetColumn::InternalID,
        DatasetColumn::TaggedShape, DatasetColumn::Scale, DatasetColumn::Range];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<DatasetColumn> {
        Self::ALL.get(index).copied()
    }

    pub fn header(&self) -> &'static str {
        match self {
            DatasetColumn::Nickname => "Nickname",
            DatasetColumn::Location => "Location",
            DatasetColumn::InternalID => "Internal Path",
            DatasetColumn::TaggedShape => "Shape",
            DatasetColumn::Scale => "Resolution Level",
            DatasetColumn::Range => "Data Range",
        }
    }

    fn uninitialized_display(&self) -> &'static str {
        match self {
            DatasetColumn::Nickname => "<empty>",
            _ => "",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaneEvent {
    Inserting(usize),
    Inserted(usize),
    Removing(usize),
    Removed(usize),
    Changed { lane: usize, first_column: usize, last_column: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&LaneEvent)>;

/// Scale dimensions are given in x, y, z order; they are shown in the
/// order the lane's axes appear, skipping non-spatial axes.
fn dims_to_display_string(dims: &[usize], axis_keys: &str) -> String {
    axis_keys.chars()
        .filter_map(|k| "xyz".find(k).and_then(|i| dims.get(i)))
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Default)]
pub struct LaneTable {
    lanes: Vec<Option<DatasetInfo>>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl LaneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where F: FnMut(&LaneEvent) + 'static
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: LaneEvent) {
        debug!("Lane event {:?}", event);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.lanes.len() {
            return Err(Error::OutOfRange{what: "lane", index: (row, 0),
                                         limit: (self.lanes.len(), COLUMN_COUNT)});
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    /// Inserts an empty lane at `index`; later lanes shift down.
    pub fn insert_lane(&mut self, index: usize) -> Result<()> {
        if index > self.lanes.len() {
            return Err(Error::OutOfRange{what: "lane insert", index: (index, 0),
                                         limit: (self.lanes.len(), COLUMN_COUNT)});
        }
        self.emit(LaneEvent::Inserting(index));
        self.lanes.insert(index, None);
        self.emit(LaneEvent::Inserted(index));
        Ok(())
    }

    pub fn remove_lane(&mut self, index: usize) -> Result<()> {
        self.check_row(index)?;
        self.emit(LaneEvent::Removing(index));
        self.lanes.remove(index);
        self.emit(LaneEvent::Removed(index));
        Ok(())
    }

    fn changed(&mut self, lane: usize) {
        self.emit(LaneEvent::Changed{lane, first_column: 0,
                                     last_column: COLUMN_COUNT - 1});
    }

    pub fn set_dataset(&mut self, row: usize, info: DatasetInfo) -> Result<()> {
        self.check_row(row)?;
        self.lanes[row] = Some(info);
        self.changed(row);
        Ok(())
    }

    pub fn clear_dataset(&mut self, row: usize) -> Result<()> {
        self.check_row(row)?;
        self.lanes[row] = None;
        self.changed(row);
        Ok(())
    }

    pub fn dataset(&self, row: usize) -> Option<&DatasetInfo> {
        self.lanes.get(row).and_then(|l| l.as_ref())
    }

    pub fn is_empty_row(&self, row: usize) -> bool {
        self.dataset(row).is_none()
    }

    /// Only the scale column of a lane with data can be edited.
    pub fn is_editable(&self, row: usize, column: DatasetColumn) -> bool {
        column == DatasetColumn::Scale && !self.is_empty_row(row)
    }

    pub fn display(&self, row: usize, column: DatasetColumn) -> String {
        let Some(info) = self.dataset(row) else {
            return column.uninitialized_display().to_string();
        };
        match column {
            DatasetColumn::Nickname => info.nickname.clone(),
            DatasetColumn::Location => info.location.clone(),
            DatasetColumn::InternalID => info.internal_paths.join("\n"),
            DatasetColumn::TaggedShape => info.axis_keys.chars()
                .zip(&info.lane_shape)
                .map(|(axis, size)| format!("{}: {}", axis, size))
                .collect::<Vec<_>>()
                .join(", "),
            DatasetColumn::Range => match info.drange {
                Some((lo, hi)) => format!("({:?}, {:?})", lo, hi),
                None => String::new(),
            },
            DatasetColumn::Scale => match info.scale_dims(&info.working_scale) {
                Some(dims) => dims_to_display_string(dims, &info.axis_keys),
                None => column.uninitialized_display().to_string(),
            },
        }
    }

    /// Scale keys with their display strings, in the dataset's order.
    /// Empty for lanes without data or without scales.
    pub fn scale_options(&self, row: usize) -> Vec<(String, String)> {
        match self.dataset(row) {
            Some(info) => info.scales.iter()
                .map(|(key, dims)| (key.clone(),
                                    dims_to_display_string(dims, &info.axis_keys)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_scale_locked(&self, row: usize) -> bool {
        self.dataset(row).map(|info| info.scale_locked).unwrap_or(false)
    }

    pub fn set_working_scale(&mut self, row: usize, key: &str) -> Result<()> {
        self.check_row(row)?;
        let info = self.lanes[row].as_mut()
            .ok_or_else(|| invalid(format!("lane {} has no dataset", row)))?;
        if info.scale_locked {
            return Err(invalid(format!("scale of lane {} is locked", row)));
        }
        if info.scale_dims(key).is_none() {
            return Err(invalid(format!("lane {} has no scale '{}'", row, key)));
        }
        info.working_scale = key.to_string();
        self.changed(row);
        Ok(())
    }
}
