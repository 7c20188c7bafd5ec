// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use url::Url;

use miobra_app::{
    Client as ClientRecord, ClientFormInput, ClientStatus, ProductFormInput, Project,
    ProjectFormInput, ProjectStatus, Takeoff, TakeoffFormInput, TakeoffProduct, TakeoffStatus,
};

/// Blocking JSON client for the remote record service. One instance is
/// shared by every entity surface; endpoints are flat REST collections.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cheap reachability probe used by `--check`.
    pub fn ping(&self) -> Result<()> {
        self.get_checked("health").map(|_| ())
    }

    // --- clients --------------------------------------------------------

    pub fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let rows: Vec<ClientDto> = self.get_json("clients")?;
        rows.into_iter().map(ClientDto::into_record).collect()
    }

    pub fn search_clients(&self, term: &str) -> Result<Vec<ClientRecord>> {
        let rows: Vec<ClientDto> = self.get_json(&search_path("clients", term))?;
        rows.into_iter().map(ClientDto::into_record).collect()
    }

    pub fn create_client(&self, input: &ClientFormInput) -> Result<ClientRecord> {
        let row: ClientDto = self.post_json("clients", &ClientWriteDto::from_input(input))?;
        row.into_record()
    }

    pub fn update_client(&self, id: &str, input: &ClientFormInput) -> Result<ClientRecord> {
        let row: ClientDto =
            self.patch_json(&item_path("clients", id), &ClientWriteDto::from_input(input))?;
        row.into_record()
    }

    /// The service deactivates instead of removing; a `true` outcome means
    /// the client is now inactive.
    pub fn delete_client(&self, id: &str) -> Result<bool> {
        self.delete(&item_path("clients", id))
    }

    // --- projects -------------------------------------------------------

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let rows: Vec<ProjectDto> = self.get_json("projects")?;
        rows.into_iter().map(ProjectDto::into_record).collect()
    }

    pub fn search_projects(&self, term: &str) -> Result<Vec<Project>> {
        let rows: Vec<ProjectDto> = self.get_json(&search_path("projects", term))?;
        rows.into_iter().map(ProjectDto::into_record).collect()
    }

    pub fn create_project(&self, input: &ProjectFormInput) -> Result<Project> {
        let row: ProjectDto = self.post_json("projects", &ProjectWriteDto::from_input(input))?;
        row.into_record()
    }

    pub fn update_project(&self, id: &str, input: &ProjectFormInput) -> Result<Project> {
        let row: ProjectDto = self.patch_json(
            &item_path("projects", id),
            &ProjectWriteDto::from_input(input),
        )?;
        row.into_record()
    }

    pub fn delete_project(&self, id: &str) -> Result<bool> {
        self.delete(&item_path("projects", id))
    }

    // --- take-offs ------------------------------------------------------

    pub fn list_takeoffs(&self) -> Result<Vec<Takeoff>> {
        let rows: Vec<TakeoffDto> = self.get_json("takeoffs")?;
        rows.into_iter().map(TakeoffDto::into_record).collect()
    }

    pub fn search_takeoffs(&self, term: &str) -> Result<Vec<Takeoff>> {
        let rows: Vec<TakeoffDto> = self.get_json(&search_path("takeoffs", term))?;
        rows.into_iter().map(TakeoffDto::into_record).collect()
    }

    pub fn create_takeoff(&self, input: &TakeoffFormInput) -> Result<Takeoff> {
        let row: TakeoffDto = self.post_json("takeoffs", &TakeoffWriteDto::from_input(input))?;
        row.into_record()
    }

    pub fn update_takeoff(&self, id: &str, input: &TakeoffFormInput) -> Result<Takeoff> {
        let row: TakeoffDto = self.patch_json(
            &item_path("takeoffs", id),
            &TakeoffWriteDto::from_input(input),
        )?;
        row.into_record()
    }

    pub fn delete_takeoff(&self, id: &str) -> Result<bool> {
        self.delete(&item_path("takeoffs", id))
    }

    // --- take-off products ----------------------------------------------

    pub fn list_takeoff_products(&self, takeoff_id: &str) -> Result<Vec<TakeoffProduct>> {
        let rows: Vec<ProductDto> =
            self.get_json(&format!("takeoffs/{}/products", encode(takeoff_id)))?;
        rows.into_iter().map(ProductDto::into_record).collect()
    }

    pub fn search_takeoff_products(
        &self,
        takeoff_id: &str,
        term: &str,
    ) -> Result<Vec<TakeoffProduct>> {
        let rows: Vec<ProductDto> = self.get_json(&format!(
            "takeoffs/{}/products?q={}",
            encode(takeoff_id),
            encode(term)
        ))?;
        rows.into_iter().map(ProductDto::into_record).collect()
    }

    pub fn create_product(&self, input: &ProductFormInput) -> Result<TakeoffProduct> {
        let row: ProductDto = self.post_json(
            &format!("takeoffs/{}/products", encode(&input.takeoff_id)),
            &ProductWriteDto::from_input(input),
        )?;
        row.into_record()
    }

    pub fn update_product(&self, id: &str, input: &ProductFormInput) -> Result<TakeoffProduct> {
        let row: ProductDto =
            self.patch_json(&item_path("products", id), &ProductWriteDto::from_input(input))?;
        row.into_record()
    }

    pub fn delete_product(&self, id: &str) -> Result<bool> {
        self.delete(&item_path("products", id))
    }

    // --- transport ------------------------------------------------------

    fn get_checked(&self, path: &str) -> Result<Response> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        check_status(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_checked(path)?
            .json()
            .with_context(|| format!("decode response for {path}"))
    }

    fn post_json<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        check_status(response)?
            .json()
            .with_context(|| format!("decode response for {path}"))
    }

    fn patch_json<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .patch(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        check_status(response)?
            .json()
            .with_context(|| format!("decode response for {path}"))
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let response = self
            .http
            .delete(format!("{}/{path}", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(true);
        }
        let response = check_status(response)?;
        let outcome: DeleteOutcome = response
            .json()
            .with_context(|| format!("decode response for {path}"))?;
        Ok(outcome.deleted)
    }
}

fn item_path(collection: &str, id: &str) -> String {
    format!("{collection}/{}", encode(id))
}

fn search_path(collection: &str, term: &str) -> String {
    format!("{collection}/search?q={}", encode(term))
}

/// Minimal query/path escaping; record ids and search terms are short
/// tokens, not arbitrary binary.
fn encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                use std::fmt::Write as _;
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(clean_error_response(status, &body))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [api].base_url in the config ({})",
        base_url,
        error
    )
}

/// Maps service error envelopes to operator-readable messages. The backend
/// speaks PostgREST-style errors with SQLSTATE codes.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ServiceErrorEnvelope>(body) {
        if let Some(code) = parsed.code.as_deref()
            && let Some(friendly) = friendly_error_for_code(code)
        {
            return anyhow!("{friendly}");
        }
        if let Some(message) = parsed.message
            && !message.is_empty()
        {
            return anyhow!("server error ({}): {}", status.as_u16(), message);
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

fn friendly_error_for_code(code: &str) -> Option<&'static str> {
    match code {
        "23505" => Some("a record with these values already exists"),
        "23503" => Some("this record is referenced elsewhere and cannot be deleted"),
        "23502" => Some("required fields are missing"),
        "42P01" => Some("service configuration error -- contact the administrator"),
        "PGRST301" => Some("the session has expired -- sign in again"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ServiceErrorEnvelope {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteOutcome {
    deleted: bool,
}

// --- wire types ---------------------------------------------------------
//
// Dates travel as strings on the wire; the service is not strict about the
// exact timestamp shape, so parsing accepts the common variants.

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }

    // date columns sometimes arrive as full timestamps; normalize
    let date_time = parse_datetime(raw)?;
    Ok(date_time.date())
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_datetime)
        .transpose()
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_date)
        .transpose()
}

fn format_wire_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

#[derive(Debug, Deserialize)]
struct ClientDto {
    id: String,
    name: String,
    tax_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    address: String,
    status: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl ClientDto {
    fn into_record(self) -> Result<ClientRecord> {
        let status = ClientStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("unknown client status {:?}", self.status))?;
        Ok(ClientRecord {
            id: self.id,
            name: self.name,
            tax_id: self.tax_id,
            email: self.email,
            phone: self.phone,
            address: self.address,
            status,
            created_at: parse_opt_datetime(self.created_at)?,
            updated_at: parse_opt_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct ClientWriteDto<'a> {
    name: &'a str,
    tax_id: &'a str,
    email: &'a str,
    phone: &'a str,
    address: &'a str,
    status: &'static str,
}

impl<'a> ClientWriteDto<'a> {
    fn from_input(input: &'a ClientFormInput) -> Self {
        Self {
            name: &input.name,
            tax_id: &input.tax_id,
            email: &input.email,
            phone: &input.phone,
            address: &input.address,
            status: input.status.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectDto {
    id: String,
    name: String,
    client_id: String,
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    location: String,
    start_date: Option<String>,
    delivery_date: Option<String>,
    status: String,
    amount_cents: Option<i64>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl ProjectDto {
    fn into_record(self) -> Result<Project> {
        let status = ProjectStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("unknown project status {:?}", self.status))?;
        Ok(Project {
            id: self.id,
            name: self.name,
            client_id: self.client_id,
            client_name: self.client_name,
            location: self.location,
            start_date: parse_opt_date(self.start_date)?,
            delivery_date: parse_opt_date(self.delivery_date)?,
            status,
            amount_cents: self.amount_cents,
            created_at: parse_opt_datetime(self.created_at)?,
            updated_at: parse_opt_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct ProjectWriteDto<'a> {
    name: &'a str,
    client_id: &'a str,
    location: &'a str,
    start_date: Option<String>,
    delivery_date: Option<String>,
    status: &'static str,
    amount_cents: Option<i64>,
}

impl<'a> ProjectWriteDto<'a> {
    fn from_input(input: &'a ProjectFormInput) -> Self {
        Self {
            name: &input.name,
            client_id: &input.client_id,
            location: &input.location,
            start_date: input.start_date.map(format_wire_date),
            delivery_date: input.delivery_date.map(format_wire_date),
            status: input.status.as_str(),
            amount_cents: input.amount_cents,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TakeoffDto {
    id: String,
    name: String,
    project_id: String,
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    description: String,
    takeoff_date: Option<String>,
    status: String,
    total_cents: Option<i64>,
    item_count: Option<i64>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl TakeoffDto {
    fn into_record(self) -> Result<Takeoff> {
        let status = TakeoffStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("unknown take-off status {:?}", self.status))?;
        Ok(Takeoff {
            id: self.id,
            name: self.name,
            project_id: self.project_id,
            project_name: self.project_name,
            description: self.description,
            takeoff_date: parse_opt_date(self.takeoff_date)?,
            status,
            total_cents: self.total_cents,
            item_count: self.item_count,
            created_at: parse_opt_datetime(self.created_at)?,
            updated_at: parse_opt_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct TakeoffWriteDto<'a> {
    name: &'a str,
    project_id: &'a str,
    description: &'a str,
    takeoff_date: Option<String>,
    status: &'static str,
    total_cents: Option<i64>,
}

impl<'a> TakeoffWriteDto<'a> {
    fn from_input(input: &'a TakeoffFormInput) -> Self {
        Self {
            name: &input.name,
            project_id: &input.project_id,
            description: &input.description,
            takeoff_date: input.takeoff_date.map(format_wire_date),
            status: input.status.as_str(),
            total_cents: input.total_cents,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    id: String,
    takeoff_id: String,
    code: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    product_type: String,
    quantity: Option<i64>,
    total_area_m2: Option<f64>,
    unit_price_cents: Option<i64>,
    total_price_cents: Option<i64>,
    #[serde(default)]
    image: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl ProductDto {
    fn into_record(self) -> Result<TakeoffProduct> {
        Ok(TakeoffProduct {
            id: self.id,
            takeoff_id: self.takeoff_id,
            code: self.code,
            description: self.description,
            product_type: self.product_type,
            quantity: self.quantity,
            total_area_m2: self.total_area_m2,
            unit_price_cents: self.unit_price_cents,
            total_price_cents: self.total_price_cents,
            image: self.image,
            created_at: parse_opt_datetime(self.created_at)?,
            updated_at: parse_opt_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct ProductWriteDto<'a> {
    takeoff_id: &'a str,
    code: &'a str,
    description: &'a str,
    product_type: &'a str,
    quantity: Option<i64>,
    total_area_m2: Option<f64>,
    unit_price_cents: Option<i64>,
    image: &'a str,
}

impl<'a> ProductWriteDto<'a> {
    fn from_input(input: &'a ProductFormInput) -> Self {
        Self {
            takeoff_id: &input.takeoff_id,
            code: &input.code,
            description: &input.description,
            product_type: &input.product_type,
            quantity: input.quantity,
            total_area_m2: input.total_area_m2,
            unit_price_cents: input.unit_price_cents,
            image: &input.image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClientDto, clean_error_response, encode, parse_date, parse_datetime, parse_opt_date,
    };
    use reqwest::StatusCode;

    #[test]
    fn parse_datetime_accepts_common_wire_shapes() {
        for raw in [
            "2024-03-01T12:30:00Z",
            "2024-03-01 12:30:00+00:00",
            "2024-03-01 12:30:00",
            "2024-03-01T12:30:00",
        ] {
            let parsed = parse_datetime(raw).expect("datetime should parse");
            assert_eq!(parsed.date().to_string(), "2024-03-01");
        }
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn parse_date_normalizes_timestamps() {
        assert_eq!(
            parse_date("2024-05-15").expect("plain date").to_string(),
            "2024-05-15"
        );
        assert_eq!(
            parse_date("2024-05-15T08:00:00Z")
                .expect("timestamp date")
                .to_string(),
            "2024-05-15"
        );
        assert_eq!(parse_opt_date(None).expect("none"), None);
        assert_eq!(
            parse_opt_date(Some(String::new())).expect("empty string"),
            None
        );
    }

    #[test]
    fn client_dto_rejects_unknown_status() {
        let dto = ClientDto {
            id: "CLI-001".to_owned(),
            name: "Andes".to_owned(),
            tax_id: "76.123.456-7".to_owned(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            status: "archived".to_owned(),
            created_at: None,
            updated_at: None,
        };
        assert!(dto.into_record().is_err());
    }

    #[test]
    fn sqlstate_codes_map_to_friendly_messages() {
        let error = clean_error_response(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(
            error.to_string(),
            "a record with these values already exists"
        );

        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"message":"malformed filter"}"#,
        );
        assert_eq!(error.to_string(), "server error (400): malformed filter");

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.to_string(), "server error (502): upstream down");

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{not json");
        assert_eq!(error.to_string(), "server returned 500");
    }

    #[test]
    fn encode_escapes_reserved_characters() {
        assert_eq!(encode("CLI-2024-001"), "CLI-2024-001");
        assert_eq!(encode("torre central"), "torre%20central");
        assert_eq!(encode("a&b=c"), "a%26b%3Dc");
    }
}
