//! Device ("system") and category models

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::status::Status;

/// Device note written while any checklist item is NOK
pub const FAULT_MARKER: &str = "Detailed checklist has faults";

/// Equipment grouping shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// A monitored piece of equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Device {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    pub name: String,
    /// Derived from the checklist; `null` until first inspected
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub inspector_name: Option<String>,
}

impl Device {
    pub fn new(id: &str, category_id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            category_id: category_id.to_string(),
            name: name.to_string(),
            status: None,
            note: String::new(),
            timestamp: None,
            inspector_name: None,
        }
    }
}

/// Create device request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDevice {
    /// Unique alphanumeric id, normalised to upper case
    #[validate(length(min = 1, max = 16, message = "Device id must be 1-16 characters"))]
    pub id: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category_id: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Update device request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDevice {
    pub name: Option<String>,
    pub category_id: Option<String>,
}

/// Dashboard counters
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DeviceSummary {
    pub total: usize,
    pub ok: usize,
    pub nok: usize,
    pub na: usize,
    pub unchecked: usize,
    /// Categories holding at least one NOK device
    pub failed_categories: Vec<Category>,
}

/// Order ids the way people read them: "A2" before "A10"
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let mut ln = String::new();
                while let Some(c) = left.peek().copied().filter(char::is_ascii_digit) {
                    ln.push(c);
                    left.next();
                }
                let mut rn = String::new();
                while let Some(c) = right.peek().copied().filter(char::is_ascii_digit) {
                    rn.push(c);
                    right.next();
                }
                let ln = ln.trim_start_matches('0');
                let rn = rn.trim_start_matches('0');
                let ord = ln.len().cmp(&rn.len()).then_with(|| ln.cmp(rn));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Categories seeded into an empty store
pub fn default_categories() -> Vec<Category> {
    [
        ("CAT1", "A. Passenger boarding bridges"),
        ("CAT2", "B. Aircraft docking guidance"),
        ("CAT3", "C. X-ray screening"),
        ("CAT4", "D. Walk-through metal detectors"),
        ("CAT5", "E. Flight information display (TDS)"),
        ("CAT6", "F. Access control (ACS)"),
        ("CAT7", "G. Telephony (TEL)"),
        ("CAT8", "H. CCTV"),
        ("CAT9", "I. ETC toll collection"),
        ("CAT10", "J. Motorbike toll collection"),
        ("CAT11", "K. Automatic sliding doors"),
    ]
    .into_iter()
    .map(|(id, name)| Category {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Devices seeded into an empty store
pub fn default_devices() -> Vec<Device> {
    let mut devices: Vec<Device> = (1..=5)
        .map(|n| Device::new(&format!("A{}", n), "CAT1", &format!("Bridge {}", n)))
        .collect();

    let pairs = [
        ('B', "CAT2", "Docking guidance D"),
        ('C', "CAT3", "X-ray "),
        ('D', "CAT4", "Metal detector "),
        ('E', "CAT5", "TDS "),
        ('F', "CAT6", "ACS "),
        ('G', "CAT7", "TEL "),
        ('H', "CAT8", "CCTV "),
        ('I', "CAT9", "ETC "),
        ('J', "CAT10", "Motorbike toll "),
        ('K', "CAT11", "Sliding door "),
    ];
    for (prefix, category, label) in pairs {
        for n in 1..=2 {
            devices.push(Device::new(
                &format!("{}{}", prefix, n),
                category,
                &format!("{}{}", label, n),
            ));
        }
    }
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp() {
        let mut ids = vec!["A10", "B1", "A2", "A1", "a3"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["A1", "A2", "a3", "A10", "B1"]);
        assert_eq!(natural_cmp("CAT2", "CAT11"), Ordering::Less);
        assert_eq!(natural_cmp("A01", "A1"), Ordering::Equal);
    }

    #[test]
    fn test_default_fixtures() {
        let categories = default_categories();
        let devices = default_devices();
        assert_eq!(categories.len(), 11);
        assert_eq!(devices.len(), 25);
        assert!(devices
            .iter()
            .all(|d| categories.iter().any(|c| c.id == d.category_id)));
        assert!(devices.iter().all(|d| d.status.is_none()));
    }
}
