// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::model::{ClientStatus, ProjectStatus, TakeoffStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFormInput {
    pub name: String,
    pub tax_id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ClientStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFormInput {
    pub name: String,
    pub client_id: String,
    pub location: String,
    pub start_date: Option<Date>,
    pub delivery_date: Option<Date>,
    pub status: ProjectStatus,
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeoffFormInput {
    pub name: String,
    pub project_id: String,
    pub description: String,
    pub takeoff_date: Option<Date>,
    pub status: TakeoffStatus,
    pub total_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductFormInput {
    pub takeoff_id: String,
    pub code: String,
    pub description: String,
    pub product_type: String,
    pub quantity: Option<i64>,
    pub total_area_m2: Option<f64>,
    pub unit_price_cents: Option<i64>,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPayload {
    Client(ClientFormInput),
    Project(ProjectFormInput),
    Takeoff(TakeoffFormInput),
    Product(ProductFormInput),
}

impl FormPayload {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Client(client) => client.validate(),
            Self::Project(project) => project.validate(),
            Self::Takeoff(takeoff) => takeoff.validate(),
            Self::Product(product) => product.validate(),
        }
    }
}

impl ClientFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("client name is required -- enter a name and retry");
        }
        if self.tax_id.trim().is_empty() {
            bail!("client tax id is required -- enter a tax id and retry");
        }
        Ok(())
    }
}

impl ProjectFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("project name is required -- enter a name and retry");
        }
        if self.client_id.trim().is_empty() {
            bail!("project client is required -- choose a client and retry");
        }
        if let (Some(start_date), Some(delivery_date)) = (self.start_date, self.delivery_date)
            && delivery_date < start_date
        {
            bail!("project delivery date must be on/after start date");
        }
        if let Some(amount) = self.amount_cents
            && amount < 0
        {
            bail!("project amount cannot be negative");
        }
        Ok(())
    }
}

impl TakeoffFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("take-off name is required -- enter a name and retry");
        }
        if self.project_id.trim().is_empty() {
            bail!("take-off project is required -- choose a project and retry");
        }
        if let Some(total) = self.total_cents
            && total < 0
        {
            bail!("take-off total cannot be negative");
        }
        Ok(())
    }
}

impl ProductFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.takeoff_id.trim().is_empty() {
            bail!("product take-off is required");
        }
        if self.code.trim().is_empty() {
            bail!("product code is required -- enter a code and retry");
        }
        if let Some(quantity) = self.quantity
            && quantity < 0
        {
            bail!("product quantity cannot be negative");
        }
        if let Some(area) = self.total_area_m2
            && area < 0.0
        {
            bail!("product surface cannot be negative");
        }
        if let Some(unit_price) = self.unit_price_cents
            && unit_price < 0
        {
            bail!("product unit price cannot be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClientFormInput, FormPayload, ProductFormInput, ProjectFormInput, TakeoffFormInput,
    };
    use crate::model::{ClientStatus, ProjectStatus, TakeoffStatus};
    use time::{Date, Month};

    fn valid_client() -> ClientFormInput {
        ClientFormInput {
            name: "Constructora Andes".to_owned(),
            tax_id: "76.123.456-7".to_owned(),
            email: "contacto@andes.cl".to_owned(),
            phone: "+56 9 1234 5678".to_owned(),
            address: "Av. Providencia 1234".to_owned(),
            status: ClientStatus::Active,
        }
    }

    #[test]
    fn client_validation_rejects_blank_required_fields() {
        let mut client = valid_client();
        assert!(FormPayload::Client(client.clone()).validate().is_ok());

        client.name = "  ".to_owned();
        assert!(client.validate().is_err());

        let mut client = valid_client();
        client.tax_id = String::new();
        assert!(client.validate().is_err());
    }

    #[test]
    fn project_validation_rejects_bad_date_range() {
        let project = ProjectFormInput {
            name: "Edificio Central".to_owned(),
            client_id: "CLI-001".to_owned(),
            location: "Santiago".to_owned(),
            start_date: Some(Date::from_calendar_date(2024, Month::March, 10).expect("valid")),
            delivery_date: Some(Date::from_calendar_date(2024, Month::March, 1).expect("valid")),
            status: ProjectStatus::Active,
            amount_cents: Some(120_000_000_000),
        };
        assert!(project.validate().is_err());
    }

    #[test]
    fn takeoff_validation_rejects_negative_total() {
        let takeoff = TakeoffFormInput {
            name: "Torre Central".to_owned(),
            project_id: "PRJ-001".to_owned(),
            description: String::new(),
            takeoff_date: None,
            status: TakeoffStatus::Draft,
            total_cents: Some(-1),
        };
        assert!(takeoff.validate().is_err());
    }

    #[test]
    fn product_validation_requires_code() {
        let product = ProductFormInput {
            takeoff_id: "CUB-001".to_owned(),
            code: String::new(),
            description: "Ventana fija".to_owned(),
            product_type: "window".to_owned(),
            quantity: Some(4),
            total_area_m2: Some(6.4),
            unit_price_cents: Some(18_500_000),
            image: String::new(),
        };
        assert!(product.validate().is_err());
    }
}
