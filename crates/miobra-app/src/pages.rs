// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Per-entity page definitions: the static column sets and the formatting
//! step that turns a fetched record into a displayable row. This is the
//! only place that knows both an entity's fields and its column keys.

use crate::cells::{CellValue, Row};
use crate::columns::Column;
use crate::list::{ListPage, PageQuery};
use crate::model::{Client, Project, Takeoff, TakeoffProduct};

pub fn client_columns() -> Vec<Column> {
    vec![
        Column::id("Code"),
        Column::text("name", "Name"),
        Column::text("tax_id", "Tax ID"),
        Column::text("email", "Email"),
        Column::text("phone", "Phone"),
        Column::text("address", "Address"),
        Column::text("status", "Status"),
        Column::actions("Actions"),
    ]
}

pub fn project_columns() -> Vec<Column> {
    vec![
        Column::id("Code"),
        Column::text("name", "Name"),
        Column::text("client", "Client"),
        Column::text("location", "Location"),
        Column::date("start_date", "Start Date"),
        Column::date("delivery_date", "Delivery Date"),
        Column::text("status", "Status"),
        Column::number("amount", "Amount"),
        Column::actions("Actions"),
    ]
}

pub fn takeoff_columns() -> Vec<Column> {
    vec![
        Column::id("Code"),
        Column::text("name", "Name"),
        Column::text("project", "Project"),
        Column::text("description", "Description"),
        Column::date("date", "Date"),
        Column::text("status", "Status"),
        Column::number("total", "Total"),
        Column::number("items", "Items"),
        Column::actions("Actions"),
    ]
}

pub fn product_columns() -> Vec<Column> {
    vec![
        Column::id("Code"),
        Column::text("description", "Description"),
        Column::text("product_type", "Type"),
        Column::number("quantity", "Qty"),
        Column::number("total_area", "Surface"),
        Column::number("unit_price", "Unit Price"),
        Column::number("total_price", "Total Price"),
        Column::image("image", "Image"),
        Column::actions("Actions"),
    ]
}

pub fn client_row(client: &Client) -> Row {
    Row::new(
        client.id.clone(),
        vec![
            ("id", CellValue::text(&client.id)),
            ("name", CellValue::text(&client.name)),
            ("tax_id", CellValue::text(&client.tax_id)),
            ("email", CellValue::text(&client.email)),
            ("phone", CellValue::text(&client.phone)),
            ("address", CellValue::text(&client.address)),
            ("status", CellValue::text(client.status.as_str())),
        ],
    )
}

pub fn project_row(project: &Project) -> Row {
    // related client resolved to its display name before reaching the table
    let client = if project.client_name.is_empty() {
        project.client_id.clone()
    } else {
        project.client_name.clone()
    };
    Row::new(
        project.id.clone(),
        vec![
            ("id", CellValue::text(&project.id)),
            ("name", CellValue::text(&project.name)),
            ("client", CellValue::Text(client)),
            ("location", CellValue::text(&project.location)),
            ("start_date", CellValue::Date(project.start_date)),
            ("delivery_date", CellValue::Date(project.delivery_date)),
            ("status", CellValue::text(project.status.as_str())),
            ("amount", CellValue::Money(project.amount_cents)),
        ],
    )
}

pub fn takeoff_row(takeoff: &Takeoff) -> Row {
    let project = if takeoff.project_name.is_empty() {
        takeoff.project_id.clone()
    } else {
        takeoff.project_name.clone()
    };
    Row::new(
        takeoff.id.clone(),
        vec![
            ("id", CellValue::text(&takeoff.id)),
            ("name", CellValue::text(&takeoff.name)),
            ("project", CellValue::Text(project)),
            ("description", CellValue::text(&takeoff.description)),
            ("date", CellValue::Date(takeoff.takeoff_date)),
            ("status", CellValue::text(takeoff.status.as_str())),
            ("total", CellValue::Money(takeoff.total_cents)),
            ("items", CellValue::Quantity(takeoff.item_count)),
        ],
    )
}

pub fn product_row(product: &TakeoffProduct) -> Row {
    Row::new(
        product.id.clone(),
        vec![
            ("id", CellValue::text(&product.code)),
            ("description", CellValue::text(&product.description)),
            ("product_type", CellValue::text(&product.product_type)),
            ("quantity", CellValue::Quantity(product.quantity)),
            ("total_area", CellValue::Area(product.total_area_m2)),
            ("unit_price", CellValue::Money(product.unit_price_cents)),
            ("total_price", CellValue::Money(product.total_price_cents)),
            ("image", CellValue::Image(product.image.clone())),
        ],
    )
}

pub fn clients_page() -> ListPage {
    ListPage::new(PageQuery::Clients, "clients", client_columns())
}

pub fn projects_page() -> ListPage {
    ListPage::new(PageQuery::Projects, "projects", project_columns())
}

pub fn takeoffs_page() -> ListPage {
    ListPage::new(PageQuery::Takeoffs, "take-offs", takeoff_columns())
}

pub fn products_page(takeoff_id: impl Into<String>) -> ListPage {
    ListPage::new(
        PageQuery::TakeoffProducts {
            takeoff_id: takeoff_id.into(),
        },
        "products",
        product_columns(),
    )
}

#[cfg(test)]
mod tests {
    use super::{client_row, clients_page, product_row, project_row, takeoff_columns};
    use crate::cells::IMAGE_PLACEHOLDER;
    use crate::columns::visible_keys;
    use crate::model::{
        Client, ClientStatus, Project, ProjectStatus, TakeoffProduct,
    };
    use time::{Date, Month};

    fn sample_client() -> Client {
        Client {
            id: "CLI-2024-001".to_owned(),
            name: "Constructora Andes".to_owned(),
            tax_id: "76.123.456-7".to_owned(),
            email: "contacto@andes.cl".to_owned(),
            phone: "+56 9 1234 5678".to_owned(),
            address: "Av. Providencia 1234, Santiago".to_owned(),
            status: ClientStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn client_row_materializes_every_column() {
        let row = client_row(&sample_client());
        assert_eq!(row.id, "CLI-2024-001");
        assert_eq!(row.cell("status").display(), "active");
        assert_eq!(row.cell("tax_id").display(), "76.123.456-7");
    }

    #[test]
    fn project_row_resolves_client_name_with_id_fallback() {
        let mut project = Project {
            id: "PRJ-2024-001".to_owned(),
            name: "Edificio Central".to_owned(),
            client_id: "CLI-2024-001".to_owned(),
            client_name: "Constructora Andes".to_owned(),
            location: "Santiago".to_owned(),
            start_date: Some(Date::from_calendar_date(2024, Month::March, 1).expect("valid")),
            delivery_date: None,
            status: ProjectStatus::Active,
            amount_cents: Some(120_000_000_000),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(
            project_row(&project).cell("client").display(),
            "Constructora Andes"
        );
        assert_eq!(
            project_row(&project).cell("amount").display(),
            "$1.200.000.000"
        );

        project.client_name.clear();
        assert_eq!(project_row(&project).cell("client").display(), "CLI-2024-001");
    }

    #[test]
    fn product_row_uses_code_as_display_id() {
        let product = TakeoffProduct {
            id: "PRD-001".to_owned(),
            takeoff_id: "CUB-2023-001".to_owned(),
            code: "V-120".to_owned(),
            description: "Ventana fija".to_owned(),
            product_type: "window".to_owned(),
            quantity: Some(4),
            total_area_m2: Some(6.4),
            unit_price_cents: Some(18_500_000),
            total_price_cents: Some(74_000_000),
            image: String::new(),
            created_at: None,
            updated_at: None,
        };
        let row = product_row(&product);
        assert_eq!(row.id, "PRD-001");
        assert_eq!(row.cell("id").display(), "V-120");
        assert_eq!(row.cell("image").display(), IMAGE_PLACEHOLDER);
    }

    #[test]
    fn fixed_columns_frame_every_page() {
        for columns in [
            super::client_columns(),
            super::project_columns(),
            takeoff_columns(),
            super::product_columns(),
        ] {
            assert_eq!(columns.first().map(|column| column.key), Some("id"));
            assert_eq!(columns.last().map(|column| column.key), Some("actions"));
            assert!(!columns[0].draggable);
            assert!(!columns.last().expect("non-empty").sortable);
        }
    }

    #[test]
    fn pages_start_idle_with_full_column_sets() {
        let page = clients_page();
        assert_eq!(page.title, "clients");
        assert_eq!(visible_keys(&page.columns).len(), 8);
    }
}
