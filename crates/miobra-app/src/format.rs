// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

/// Formats money kept as integer cents into a locale-style display string,
/// e.g. `123_456_700` -> `$1.234.567`. Fractional cents are only shown when
/// the amount is not a whole unit.
pub fn format_money(cents: i64) -> String {
    let negative = cents < 0;
    let magnitude = cents.unsigned_abs();
    let units = magnitude / 100;
    let fraction = magnitude % 100;

    let mut grouped = String::new();
    let digits = units.to_string();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index).is_multiple_of(3) {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped},{fraction:02}")
    }
}

/// `dd/mm/yyyy`, the display convention used across the console.
pub fn format_date(value: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        value.day(),
        u8::from(value.month()),
        value.year()
    )
}

pub fn format_quantity(value: i64) -> String {
    value.to_string()
}

pub fn format_area_m2(value: f64) -> String {
    format!("{value:.2} m²")
}
