// Static directory of learning centers and the areas they report under.
//
// The tables never change at runtime, so a single instance is built lazily
// and shared by every report generation.
use crate::errors::{ReportError, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};

const CENTER_AREA: [(&str, &str); 22] = [
    ("PP", "JKT 1"),
    ("SDC", "JKT 1"),
    ("KG", "JKT 1"),
    ("NEO", "JKT 1"),
    ("GC", "JKT 2"),
    ("LW", "JKT 2"),
    ("BSD", "JKT 2"),
    ("TBS", "JKT 2"),
    ("CP", "JKT 2"),
    ("KK", "JKT 3"),
    ("CBB", "JKT 3"),
    ("SMB", "JKT 3"),
    ("DG", "BDG"),
    ("PKW", "SBY"),
    ("CIK", "CIK"),
    ("HO", "HO"),
    ("Street Talk", "Street Talk"),
    ("Corporate", "Corporate"),
    ("Online Center", "Online Center"),
    ("Curioo", "Curioo"),
    ("RST", "RST"),
    ("NST", "NST"),
];

const CENTER_ID: [(&str, &str); 15] = [
    ("ID000", "Corporate"),
    ("ID001", "PP"),
    ("ID002", "SDC"),
    ("ID003", "GC"),
    ("ID005", "KK"),
    ("ID007", "DG"),
    ("ID008", "PKW"),
    ("ID009", "CBB"),
    ("ID010", "BSD"),
    ("ID011", "SMB"),
    ("ID013", "TBS"),
    ("ID100", "Curioo"),
    ("ID666", "Online Center"),
    ("ID777", "RST"),
    ("ID888", "NST"),
];

static GLOBAL: Lazy<CenterMap> = Lazy::new(CenterMap::new);

#[derive(Debug, Clone)]
pub struct CenterMap {
    center_area: BTreeMap<&'static str, &'static str>,
    center_id: BTreeMap<&'static str, &'static str>,
}

impl Default for CenterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CenterMap {
    pub fn new() -> Self {
        Self {
            center_area: CENTER_AREA.into_iter().collect(),
            center_id: CENTER_ID.into_iter().collect(),
        }
    }

    /// Shared process-wide directory.
    pub fn global() -> &'static CenterMap {
        &GLOBAL
    }

    pub fn centers(&self) -> BTreeSet<&'static str> {
        self.center_area.keys().copied().collect()
    }

    pub fn areas(&self) -> BTreeSet<&'static str> {
        self.center_area.values().copied().collect()
    }

    pub fn center_id_map(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.center_id
    }

    pub fn center_area_map(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.center_area
    }

    /// Area for a center code, or `None` when the code is unknown.
    ///
    /// This is the lenient form the report pipeline uses; `lookup_area` is the
    /// strict one.
    pub fn area_of(&self, center: &str) -> Option<&'static str> {
        self.center_area.get(center).copied()
    }

    pub fn lookup_area(&self, center: &str) -> Result<&'static str> {
        self.area_of(center).ok_or_else(|| ReportError::UnknownCenter {
            center: center.to_string(),
            valid: self.centers().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn lookup_centers(&self, area: &str) -> Result<BTreeSet<&'static str>> {
        let centers: BTreeSet<&'static str> = self
            .center_area
            .iter()
            .filter(|(_, a)| **a == area)
            .map(|(c, _)| *c)
            .collect();
        if centers.is_empty() {
            return Err(ReportError::UnknownArea {
                area: area.to_string(),
                valid: self.areas().into_iter().map(str::to_string).collect(),
            });
        }
        Ok(centers)
    }
}
