// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Deterministic fixtures for tests and demo mode: a seeded set of
//! business records plus an in-memory gateway that honors the same
//! contract as the remote service.

use anyhow::{Result, bail};
use std::collections::VecDeque;
use time::{Date, Month};

use miobra_app::{
    Client, ClientStatus, DataGateway, FormPayload, PageKind, PageQuery, Project, ProjectStatus,
    Row, Takeoff, TakeoffProduct, TakeoffStatus, client_row, product_row, project_row,
    takeoff_row,
};

pub fn sample_clients() -> Vec<Client> {
    vec![
        client("CLI-2024-001", "Constructora Andes", "76.123.456-7", "contacto@andes.cl", "+56 9 1234 5678", "Av. Providencia 1234, Santiago", ClientStatus::Active),
        client("CLI-2024-002", "Inmobiliaria Sur", "77.987.654-3", "info@sur.cl", "+56 9 8765 4321", "Calle O'Higgins 456, Concepción", ClientStatus::Active),
        client("CLI-2024-003", "Grupo Norte", "78.456.789-0", "ventas@norte.cl", "+56 9 1122 3344", "Av. Brasil 789, Antofagasta", ClientStatus::Inactive),
    ]
}

pub fn sample_projects() -> Vec<Project> {
    vec![
        project("PRJ-2024-001", "Edificio Central", "CLI-2024-001", "Constructora Andes", "Santiago", date(2024, Month::March, 1), date(2024, Month::December, 15), ProjectStatus::Active, 120_000_000_000),
        project("PRJ-2024-002", "Parque Industrial", "CLI-2024-002", "Inmobiliaria Sur", "Concepción", date(2024, Month::April, 10), date(2024, Month::November, 30), ProjectStatus::Active, 85_000_000_000),
        project("PRJ-2024-003", "Torre Norte", "CLI-2024-003", "Grupo Norte", "Antofagasta", date(2024, Month::February, 20), date(2024, Month::October, 10), ProjectStatus::Inactive, 95_000_000_000),
    ]
}

pub fn sample_takeoffs() -> Vec<Takeoff> {
    vec![
        takeoff("CUB-2023-001", "Torre Central", "PRJ-2024-001", "Edificio Central", "Cubicación estructura principal", date(2023, Month::May, 15), TakeoffStatus::Approved, 4_837_000_000, 2),
        takeoff("CUB-2023-002", "Edificio Norte", "PRJ-2024-003", "Torre Norte", "Cubicación terminaciones", date(2023, Month::May, 22), TakeoffStatus::Submitted, 7_329_050_000, 1),
        takeoff("CUB-2023-003", "Bodega Industrial", "PRJ-2024-002", "Parque Industrial", "Cubicación prefabricados", date(2023, Month::May, 30), TakeoffStatus::Draft, 8_856_075_000, 0),
    ]
}

pub fn sample_products() -> Vec<TakeoffProduct> {
    vec![
        product("PRD-001", "CUB-2023-001", "V-120", "Ventana fija 1.2m", "window", 4, 6.4, 18_500_000, "frames/v-120.png"),
        product("PRD-002", "CUB-2023-001", "P-090", "Puerta corredera", "door", 2, 3.8, 42_000_000, ""),
        product("PRD-003", "CUB-2023-002", "V-200", "Ventanal termopanel", "window", 6, 14.2, 31_250_000, "frames/v-200.png"),
    ]
}

fn date(year: i32, month: Month, day: u8) -> Option<Date> {
    Date::from_calendar_date(year, month, day).ok()
}

#[allow(clippy::too_many_arguments)]
fn client(
    id: &str,
    name: &str,
    tax_id: &str,
    email: &str,
    phone: &str,
    address: &str,
    status: ClientStatus,
) -> Client {
    Client {
        id: id.to_owned(),
        name: name.to_owned(),
        tax_id: tax_id.to_owned(),
        email: email.to_owned(),
        phone: phone.to_owned(),
        address: address.to_owned(),
        status,
        created_at: None,
        updated_at: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn project(
    id: &str,
    name: &str,
    client_id: &str,
    client_name: &str,
    location: &str,
    start_date: Option<Date>,
    delivery_date: Option<Date>,
    status: ProjectStatus,
    amount_cents: i64,
) -> Project {
    Project {
        id: id.to_owned(),
        name: name.to_owned(),
        client_id: client_id.to_owned(),
        client_name: client_name.to_owned(),
        location: location.to_owned(),
        start_date,
        delivery_date,
        status,
        amount_cents: Some(amount_cents),
        created_at: None,
        updated_at: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn takeoff(
    id: &str,
    name: &str,
    project_id: &str,
    project_name: &str,
    description: &str,
    takeoff_date: Option<Date>,
    status: TakeoffStatus,
    total_cents: i64,
    item_count: i64,
) -> Takeoff {
    Takeoff {
        id: id.to_owned(),
        name: name.to_owned(),
        project_id: project_id.to_owned(),
        project_name: project_name.to_owned(),
        description: description.to_owned(),
        takeoff_date,
        status,
        total_cents: Some(total_cents),
        item_count: Some(item_count),
        created_at: None,
        updated_at: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: &str,
    takeoff_id: &str,
    code: &str,
    description: &str,
    product_type: &str,
    quantity: i64,
    total_area_m2: f64,
    unit_price_cents: i64,
    image: &str,
) -> TakeoffProduct {
    TakeoffProduct {
        id: id.to_owned(),
        takeoff_id: takeoff_id.to_owned(),
        code: code.to_owned(),
        description: description.to_owned(),
        product_type: product_type.to_owned(),
        quantity: Some(quantity),
        total_area_m2: Some(total_area_m2),
        unit_price_cents: Some(unit_price_cents),
        total_price_cents: Some(unit_price_cents * quantity),
        image: image.to_owned(),
        created_at: None,
        updated_at: None,
    }
}

/// In-memory stand-in for the remote record service. Search is a
/// case-insensitive substring scan over the materialized row, matching the
/// service contract the console is written against.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    pub clients: Vec<Client>,
    pub projects: Vec<Project>,
    pub takeoffs: Vec<Takeoff>,
    pub products: Vec<TakeoffProduct>,
    /// When set, every fetch/search/mutation fails with this message.
    pub offline: Option<String>,
    next_id: u32,
    refreshes: VecDeque<PageKind>,
}

impl MemoryGateway {
    pub fn seeded() -> Self {
        Self {
            clients: sample_clients(),
            projects: sample_projects(),
            takeoffs: sample_takeoffs(),
            products: sample_products(),
            offline: None,
            next_id: 100,
            refreshes: VecDeque::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_offline(&mut self, message: &str) {
        self.offline = Some(message.to_owned());
    }

    pub fn set_online(&mut self) {
        self.offline = None;
    }

    fn check_online(&self) -> Result<()> {
        if let Some(message) = &self.offline {
            bail!("{message}");
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:03}", self.next_id)
    }

    fn rows_for(&self, query: &PageQuery) -> Vec<Row> {
        match query {
            PageQuery::Clients => self.clients.iter().map(client_row).collect(),
            PageQuery::Projects => self.projects.iter().map(project_row).collect(),
            PageQuery::Takeoffs => self.takeoffs.iter().map(takeoff_row).collect(),
            PageQuery::TakeoffProducts { takeoff_id } => self
                .products
                .iter()
                .filter(|product| &product.takeoff_id == takeoff_id)
                .map(product_row)
                .collect(),
        }
    }

    fn note_refresh(&mut self, page: PageKind) {
        self.refreshes.push_back(page);
    }

    fn recount_takeoff_items(&mut self, takeoff_id: &str) {
        let count = self
            .products
            .iter()
            .filter(|product| product.takeoff_id == takeoff_id)
            .count() as i64;
        let total: i64 = self
            .products
            .iter()
            .filter(|product| product.takeoff_id == takeoff_id)
            .filter_map(|product| product.total_price_cents)
            .sum();
        if let Some(takeoff) = self
            .takeoffs
            .iter_mut()
            .find(|takeoff| takeoff.id == takeoff_id)
        {
            takeoff.item_count = Some(count);
            takeoff.total_cents = Some(total);
        }
        self.note_refresh(PageKind::Takeoffs);
    }
}

impl DataGateway for MemoryGateway {
    fn fetch_all(&mut self, query: &PageQuery) -> Result<Vec<Row>> {
        self.check_online()?;
        Ok(self.rows_for(query))
    }

    fn search(&mut self, query: &PageQuery, term: &str) -> Result<Vec<Row>> {
        self.check_online()?;
        let needle = term.trim().to_lowercase();
        Ok(self
            .rows_for(query)
            .into_iter()
            .filter(|row| row.search_text().contains(&needle))
            .collect())
    }

    fn create(&mut self, query: &PageQuery, payload: &FormPayload) -> Result<Row> {
        self.check_online()?;
        match (query, payload) {
            (PageQuery::Clients, FormPayload::Client(input)) => {
                if self
                    .clients
                    .iter()
                    .any(|existing| existing.tax_id == input.tax_id)
                {
                    bail!("a record with these values already exists");
                }
                let id = self.next_id("CLI-2024");
                let record = Client {
                    id: id.clone(),
                    name: input.name.clone(),
                    tax_id: input.tax_id.clone(),
                    email: input.email.clone(),
                    phone: input.phone.clone(),
                    address: input.address.clone(),
                    status: input.status,
                    created_at: None,
                    updated_at: None,
                };
                self.clients.push(record);
                Ok(client_row(self.clients.last().expect("just pushed")))
            }
            (PageQuery::Projects, FormPayload::Project(input)) => {
                let client_name = self
                    .clients
                    .iter()
                    .find(|client| client.id == input.client_id)
                    .map(|client| client.name.clone())
                    .unwrap_or_default();
                let id = self.next_id("PRJ-2024");
                self.projects.push(Project {
                    id: id.clone(),
                    name: input.name.clone(),
                    client_id: input.client_id.clone(),
                    client_name,
                    location: input.location.clone(),
                    start_date: input.start_date,
                    delivery_date: input.delivery_date,
                    status: input.status,
                    amount_cents: input.amount_cents,
                    created_at: None,
                    updated_at: None,
                });
                Ok(project_row(self.projects.last().expect("just pushed")))
            }
            (PageQuery::Takeoffs, FormPayload::Takeoff(input)) => {
                let project_name = self
                    .projects
                    .iter()
                    .find(|project| project.id == input.project_id)
                    .map(|project| project.name.clone())
                    .unwrap_or_default();
                let id = self.next_id("CUB-2024");
                self.takeoffs.push(Takeoff {
                    id: id.clone(),
                    name: input.name.clone(),
                    project_id: input.project_id.clone(),
                    project_name,
                    description: input.description.clone(),
                    takeoff_date: input.takeoff_date,
                    status: input.status,
                    total_cents: input.total_cents,
                    item_count: Some(0),
                    created_at: None,
                    updated_at: None,
                });
                Ok(takeoff_row(self.takeoffs.last().expect("just pushed")))
            }
            (PageQuery::TakeoffProducts { takeoff_id }, FormPayload::Product(input)) => {
                let id = self.next_id("PRD");
                let total_price_cents = match (input.unit_price_cents, input.quantity) {
                    (Some(unit), Some(quantity)) => Some(unit * quantity),
                    _ => None,
                };
                self.products.push(TakeoffProduct {
                    id: id.clone(),
                    takeoff_id: takeoff_id.clone(),
                    code: input.code.clone(),
                    description: input.description.clone(),
                    product_type: input.product_type.clone(),
                    quantity: input.quantity,
                    total_area_m2: input.total_area_m2,
                    unit_price_cents: input.unit_price_cents,
                    total_price_cents,
                    image: input.image.clone(),
                    created_at: None,
                    updated_at: None,
                });
                let row = product_row(self.products.last().expect("just pushed"));
                self.recount_takeoff_items(takeoff_id);
                Ok(row)
            }
            _ => bail!("payload does not match the requested collection"),
        }
    }

    fn update(&mut self, query: &PageQuery, id: &str, payload: &FormPayload) -> Result<Row> {
        self.check_online()?;
        match (query, payload) {
            (PageQuery::Clients, FormPayload::Client(input)) => {
                if self
                    .clients
                    .iter()
                    .any(|existing| existing.tax_id == input.tax_id && existing.id != id)
                {
                    bail!("a record with these values already exists");
                }
                let record = self
                    .clients
                    .iter_mut()
                    .find(|client| client.id == id)
                    .ok_or_else(|| anyhow::anyhow!("no such client {id}"))?;
                record.name = input.name.clone();
                record.tax_id = input.tax_id.clone();
                record.email = input.email.clone();
                record.phone = input.phone.clone();
                record.address = input.address.clone();
                record.status = input.status;
                Ok(client_row(record))
            }
            (PageQuery::Projects, FormPayload::Project(input)) => {
                let client_name = self
                    .clients
                    .iter()
                    .find(|client| client.id == input.client_id)
                    .map(|client| client.name.clone())
                    .unwrap_or_default();
                let record = self
                    .projects
                    .iter_mut()
                    .find(|project| project.id == id)
                    .ok_or_else(|| anyhow::anyhow!("no such project {id}"))?;
                record.name = input.name.clone();
                record.client_id = input.client_id.clone();
                record.client_name = client_name;
                record.location = input.location.clone();
                record.start_date = input.start_date;
                record.delivery_date = input.delivery_date;
                record.status = input.status;
                record.amount_cents = input.amount_cents;
                Ok(project_row(record))
            }
            (PageQuery::Takeoffs, FormPayload::Takeoff(input)) => {
                let project_name = self
                    .projects
                    .iter()
                    .find(|project| project.id == input.project_id)
                    .map(|project| project.name.clone())
                    .unwrap_or_default();
                let record = self
                    .takeoffs
                    .iter_mut()
                    .find(|takeoff| takeoff.id == id)
                    .ok_or_else(|| anyhow::anyhow!("no such take-off {id}"))?;
                record.name = input.name.clone();
                record.project_id = input.project_id.clone();
                record.project_name = project_name;
                record.description = input.description.clone();
                record.takeoff_date = input.takeoff_date;
                record.status = input.status;
                record.total_cents = input.total_cents;
                Ok(takeoff_row(record))
            }
            (PageQuery::TakeoffProducts { takeoff_id }, FormPayload::Product(input)) => {
                let row = {
                    let record = self
                        .products
                        .iter_mut()
                        .find(|product| product.id == id)
                        .ok_or_else(|| anyhow::anyhow!("no such product {id}"))?;
                    record.code = input.code.clone();
                    record.description = input.description.clone();
                    record.product_type = input.product_type.clone();
                    record.quantity = input.quantity;
                    record.total_area_m2 = input.total_area_m2;
                    record.unit_price_cents = input.unit_price_cents;
                    record.total_price_cents = match (input.unit_price_cents, input.quantity) {
                        (Some(unit), Some(quantity)) => Some(unit * quantity),
                        _ => None,
                    };
                    record.image = input.image.clone();
                    product_row(record)
                };
                self.recount_takeoff_items(takeoff_id);
                Ok(row)
            }
            _ => bail!("payload does not match the requested collection"),
        }
    }

    fn delete(&mut self, query: &PageQuery, id: &str) -> Result<bool> {
        self.check_online()?;
        match query {
            // clients are deactivated, never removed
            PageQuery::Clients => {
                let Some(record) = self.clients.iter_mut().find(|client| client.id == id)
                else {
                    return Ok(false);
                };
                record.status = ClientStatus::Inactive;
                Ok(true)
            }
            PageQuery::Projects => {
                let before = self.projects.len();
                self.projects.retain(|project| project.id != id);
                Ok(self.projects.len() < before)
            }
            PageQuery::Takeoffs => {
                let before = self.takeoffs.len();
                self.takeoffs.retain(|takeoff| takeoff.id != id);
                self.products.retain(|product| product.takeoff_id != id);
                Ok(self.takeoffs.len() < before)
            }
            PageQuery::TakeoffProducts { takeoff_id } => {
                let before = self.products.len();
                self.products.retain(|product| product.id != id);
                let removed = self.products.len() < before;
                if removed {
                    self.recount_takeoff_items(takeoff_id);
                }
                Ok(removed)
            }
        }
    }

    fn poll_refresh(&mut self) -> Option<PageKind> {
        self.refreshes.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGateway;
    use miobra_app::{
        DataGateway, FormPayload, PageKind, PageQuery, ProductFormInput,
    };

    #[test]
    fn seeded_gateway_serves_every_collection() {
        let mut gateway = MemoryGateway::seeded();
        assert_eq!(
            gateway.fetch_all(&PageQuery::Clients).expect("clients").len(),
            3
        );
        assert_eq!(
            gateway
                .fetch_all(&PageQuery::TakeoffProducts {
                    takeoff_id: "CUB-2023-001".to_owned()
                })
                .expect("products")
                .len(),
            2
        );
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut gateway = MemoryGateway::seeded();
        let hits = gateway
            .search(&PageQuery::Clients, "NORTE")
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "CLI-2024-003");
    }

    #[test]
    fn offline_gateway_fails_every_operation() {
        let mut gateway = MemoryGateway::seeded();
        gateway.set_offline("connection refused");
        assert!(gateway.fetch_all(&PageQuery::Clients).is_err());
        assert!(gateway.search(&PageQuery::Projects, "x").is_err());

        gateway.set_online();
        assert!(gateway.fetch_all(&PageQuery::Clients).is_ok());
    }

    #[test]
    fn client_delete_is_a_soft_deactivation() {
        let mut gateway = MemoryGateway::seeded();
        assert!(gateway
            .delete(&PageQuery::Clients, "CLI-2024-001")
            .expect("delete"));
        assert_eq!(gateway.clients.len(), 3);
        assert_eq!(
            gateway.clients[0].status,
            miobra_app::ClientStatus::Inactive
        );

        assert!(!gateway
            .delete(&PageQuery::Clients, "CLI-9999-999")
            .expect("missing id"));
    }

    #[test]
    fn product_mutations_recount_and_signal_takeoff_refresh() {
        let mut gateway = MemoryGateway::seeded();
        let query = PageQuery::TakeoffProducts {
            takeoff_id: "CUB-2023-001".to_owned(),
        };
        gateway
            .create(
                &query,
                &FormPayload::Product(ProductFormInput {
                    takeoff_id: "CUB-2023-001".to_owned(),
                    code: "V-305".to_owned(),
                    description: "Ventana proyectante".to_owned(),
                    product_type: "window".to_owned(),
                    quantity: Some(3),
                    total_area_m2: Some(4.2),
                    unit_price_cents: Some(21_000_000),
                    image: String::new(),
                }),
            )
            .expect("create product");

        let takeoff = gateway
            .takeoffs
            .iter()
            .find(|takeoff| takeoff.id == "CUB-2023-001")
            .expect("takeoff exists");
        assert_eq!(takeoff.item_count, Some(3));
        assert_eq!(gateway.poll_refresh(), Some(PageKind::Takeoffs));
        assert_eq!(gateway.poll_refresh(), None);
    }

    #[test]
    fn duplicate_tax_id_is_rejected() {
        let mut gateway = MemoryGateway::seeded();
        let payload = FormPayload::Client(miobra_app::ClientFormInput {
            name: "Clon".to_owned(),
            tax_id: "76.123.456-7".to_owned(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            status: miobra_app::ClientStatus::Active,
        });
        let error = gateway
            .create(&PageQuery::Clients, &payload)
            .expect_err("duplicate should fail");
        assert!(error.to_string().contains("already exists"));
    }
}
