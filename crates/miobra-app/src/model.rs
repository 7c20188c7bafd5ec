// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Active,
    OnHold,
    Finished,
    Inactive,
}

impl ProjectStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Finished => "finished",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "on_hold" => Some(Self::OnHold),
            "finished" => Some(Self::Finished),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakeoffStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TakeoffStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub tax_id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ClientStatus,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub client_id: String,
    pub client_name: String,
    pub location: String,
    pub start_date: Option<Date>,
    pub delivery_date: Option<Date>,
    pub status: ProjectStatus,
    pub amount_cents: Option<i64>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Takeoff {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub project_name: String,
    pub description: String,
    pub takeoff_date: Option<Date>,
    pub status: TakeoffStatus,
    pub total_cents: Option<i64>,
    pub item_count: Option<i64>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffProduct {
    pub id: String,
    pub takeoff_id: String,
    pub code: String,
    pub description: String,
    pub product_type: String,
    pub quantity: Option<i64>,
    pub total_area_m2: Option<f64>,
    pub unit_price_cents: Option<i64>,
    pub total_price_cents: Option<i64>,
    pub image: String,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::{ClientStatus, ProjectStatus, TakeoffStatus};

    #[test]
    fn client_status_round_trips() {
        for status in [ClientStatus::Active, ClientStatus::Inactive] {
            assert_eq!(ClientStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ClientStatus::parse("archived"), None);
    }

    #[test]
    fn project_status_round_trips() {
        for status in [
            ProjectStatus::Active,
            ProjectStatus::OnHold,
            ProjectStatus::Finished,
            ProjectStatus::Inactive,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn takeoff_status_round_trips() {
        for status in [
            TakeoffStatus::Draft,
            TakeoffStatus::Submitted,
            TakeoffStatus::Approved,
            TakeoffStatus::Rejected,
        ] {
            assert_eq!(TakeoffStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TakeoffStatus::parse(""), None);
    }
}
