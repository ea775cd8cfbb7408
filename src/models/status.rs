//! Inspection status shared by devices, checklist items and logs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of an inspection. `None` on the owning record means unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Nok,
    Na,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Nok => "NOK",
            Status::Na => "NA",
        }
    }

    pub fn is_nok(status: Option<Status>) -> bool {
        status == Some(Status::Nok)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NOK" => Ok(Status::Nok),
            "NA" => Ok(Status::Na),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Status::Nok).unwrap(), "\"NOK\"");
        let parsed: Option<Status> = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, None);
        assert_eq!("na".parse::<Status>().unwrap(), Status::Na);
    }
}
