// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::collections::VecDeque;

use miobra_api::Client;
use miobra_app::{
    DataGateway, FormPayload, PageKind, PageQuery, Row, client_row, product_row, project_row,
    takeoff_row,
};

/// The console's gateway over the remote record service: fetches entities,
/// materializes them into display rows, and queues a take-off refresh
/// whenever a product mutation changes the totals shown on that page.
pub struct ApiRuntime {
    client: Client,
    refreshes: VecDeque<PageKind>,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            refreshes: VecDeque::new(),
        }
    }
}

impl DataGateway for ApiRuntime {
    fn fetch_all(&mut self, query: &PageQuery) -> Result<Vec<Row>> {
        match query {
            PageQuery::Clients => {
                Ok(self.client.list_clients()?.iter().map(client_row).collect())
            }
            PageQuery::Projects => Ok(self
                .client
                .list_projects()?
                .iter()
                .map(project_row)
                .collect()),
            PageQuery::Takeoffs => Ok(self
                .client
                .list_takeoffs()?
                .iter()
                .map(takeoff_row)
                .collect()),
            PageQuery::TakeoffProducts { takeoff_id } => Ok(self
                .client
                .list_takeoff_products(takeoff_id)?
                .iter()
                .map(product_row)
                .collect()),
        }
    }

    fn search(&mut self, query: &PageQuery, term: &str) -> Result<Vec<Row>> {
        match query {
            PageQuery::Clients => Ok(self
                .client
                .search_clients(term)?
                .iter()
                .map(client_row)
                .collect()),
            PageQuery::Projects => Ok(self
                .client
                .search_projects(term)?
                .iter()
                .map(project_row)
                .collect()),
            PageQuery::Takeoffs => Ok(self
                .client
                .search_takeoffs(term)?
                .iter()
                .map(takeoff_row)
                .collect()),
            PageQuery::TakeoffProducts { takeoff_id } => Ok(self
                .client
                .search_takeoff_products(takeoff_id, term)?
                .iter()
                .map(product_row)
                .collect()),
        }
    }

    fn create(&mut self, query: &PageQuery, payload: &FormPayload) -> Result<Row> {
        match (query, payload) {
            (PageQuery::Clients, FormPayload::Client(input)) => {
                Ok(client_row(&self.client.create_client(input)?))
            }
            (PageQuery::Projects, FormPayload::Project(input)) => {
                Ok(project_row(&self.client.create_project(input)?))
            }
            (PageQuery::Takeoffs, FormPayload::Takeoff(input)) => {
                Ok(takeoff_row(&self.client.create_takeoff(input)?))
            }
            (PageQuery::TakeoffProducts { .. }, FormPayload::Product(input)) => {
                let row = product_row(&self.client.create_product(input)?);
                self.refreshes.push_back(PageKind::Takeoffs);
                Ok(row)
            }
            _ => bail!("payload does not match the requested collection"),
        }
    }

    fn update(&mut self, query: &PageQuery, id: &str, payload: &FormPayload) -> Result<Row> {
        match (query, payload) {
            (PageQuery::Clients, FormPayload::Client(input)) => {
                Ok(client_row(&self.client.update_client(id, input)?))
            }
            (PageQuery::Projects, FormPayload::Project(input)) => {
                Ok(project_row(&self.client.update_project(id, input)?))
            }
            (PageQuery::Takeoffs, FormPayload::Takeoff(input)) => {
                Ok(takeoff_row(&self.client.update_takeoff(id, input)?))
            }
            (PageQuery::TakeoffProducts { .. }, FormPayload::Product(input)) => {
                let row = product_row(&self.client.update_product(id, input)?);
                self.refreshes.push_back(PageKind::Takeoffs);
                Ok(row)
            }
            _ => bail!("payload does not match the requested collection"),
        }
    }

    fn delete(&mut self, query: &PageQuery, id: &str) -> Result<bool> {
        match query {
            PageQuery::Clients => self.client.delete_client(id),
            PageQuery::Projects => self.client.delete_project(id),
            PageQuery::Takeoffs => self.client.delete_takeoff(id),
            PageQuery::TakeoffProducts { .. } => {
                let deleted = self.client.delete_product(id)?;
                if deleted {
                    self.refreshes.push_back(PageKind::Takeoffs);
                }
                Ok(deleted)
            }
        }
    }

    fn poll_refresh(&mut self) -> Option<PageKind> {
        self.refreshes.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use miobra_api::Client;
    use miobra_app::{
        ClientFormInput, ClientStatus, DataGateway, FormPayload, PageQuery,
    };
    use std::time::Duration;

    fn unreachable_runtime() -> ApiRuntime {
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
            .expect("client builds");
        ApiRuntime::new(client)
    }

    #[test]
    fn mismatched_payload_fails_before_the_wire() {
        let mut runtime = unreachable_runtime();
        let payload = FormPayload::Client(ClientFormInput {
            name: "Andes".to_owned(),
            tax_id: "76.123.456-7".to_owned(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            status: ClientStatus::Active,
        });
        // a client payload against the projects collection never reaches
        // the (unreachable) service
        let error = runtime
            .create(&PageQuery::Projects, &payload)
            .expect_err("mismatch should fail");
        assert!(error.to_string().contains("does not match"));
    }

    #[test]
    fn refresh_queue_starts_empty() {
        let mut runtime = unreachable_runtime();
        assert_eq!(runtime.poll_refresh(), None);
    }
}
