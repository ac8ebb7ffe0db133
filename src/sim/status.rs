//! Per-category assignment status.

use std::fmt;

use serde::Serialize;

/// Resource categories in the order they are assigned to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    SolarResource,
    Modules,
    Inverters,
    SystemDesign,
    Layout,
    Shading,
    Losses,
    BatterySystem,
    BatteryCell,
    BatteryDispatch,
    Lifetime,
    Load,
    PriceSignal,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Self::SolarResource,
        Self::Modules,
        Self::Inverters,
        Self::SystemDesign,
        Self::Layout,
        Self::Shading,
        Self::Losses,
        Self::BatterySystem,
        Self::BatteryCell,
        Self::BatteryDispatch,
        Self::Lifetime,
        Self::Load,
        Self::PriceSignal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SolarResource => "solar_resource",
            Self::Modules => "modules",
            Self::Inverters => "inverters",
            Self::SystemDesign => "system_design",
            Self::Layout => "layout",
            Self::Shading => "shading",
            Self::Losses => "losses",
            Self::BatterySystem => "battery_system",
            Self::BatteryCell => "battery_cell",
            Self::BatteryDispatch => "battery_dispatch",
            Self::Lifetime => "lifetime",
            Self::Load => "load",
            Self::PriceSignal => "price_signal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AssignmentStatus {
    #[default]
    Unset,
    Assigned,
}

impl AssignmentStatus {
    /// Numeric flag: -1 unset, 1 assigned.
    pub fn code(self) -> i8 {
        match self {
            Self::Unset => -1,
            Self::Assigned => 1,
        }
    }
}

/// One status per category, all unset at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
    statuses: [AssignmentStatus; 13],
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> AssignmentStatus {
        self.statuses[category as usize]
    }

    pub(crate) fn mark_assigned(&mut self, category: Category) {
        self.statuses[category as usize] = AssignmentStatus::Assigned;
    }

    pub fn is_assigned(&self, category: Category) -> bool {
        self.get(category) == AssignmentStatus::Assigned
    }

    pub fn assigned_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == AssignmentStatus::Assigned)
            .count()
    }

    /// `(category, status)` in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, AssignmentStatus)> + '_ {
        Category::ALL.iter().map(|&c| (c, self.get(c)))
    }
}
