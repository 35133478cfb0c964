//! Terminal rendering for cities and forecast periods.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::style::{Color, Stylize};
use geocast_core::{City, ForecastPeriod, RelativeDay};

/// Pause between periods in extended mode, so the output reads like a ticker.
const EXTENDED_PACE: Duration = Duration::from_millis(500);

// ANSI 256-colour backgrounds for the label tags.
const TODAY: u8 = 42;
const TONIGHT: u8 = 92;
const TOMORROW: u8 = 86;
const TOMORROW_NIGHT: u8 = 204;
const DAY: u8 = 35;
const NIGHT: u8 = 37;
const CITY: u8 = 86;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Label and temperature.
    Temperature,
    /// Adds the short forecast.
    Short,
    /// Label and temperature, then the detailed forecast one sentence per line.
    Detailed,
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        match level {
            2 => Verbosity::Short,
            3 => Verbosity::Detailed,
            _ => Verbosity::Temperature,
        }
    }
}

fn tag(text: &str, background: u8) -> String {
    format!(" {text} ")
        .with(Color::Black)
        .on(Color::AnsiValue(background))
        .to_string()
}

fn period_tag(period: &ForecastPeriod, today: NaiveDate) -> String {
    let background = match (period.relative_day(today), period.is_daytime) {
        (RelativeDay::Today, true) => TODAY,
        (RelativeDay::Today, false) => TONIGHT,
        (RelativeDay::Tomorrow, true) => TOMORROW,
        (RelativeDay::Tomorrow, false) => TOMORROW_NIGHT,
        (_, true) => DAY,
        (_, false) => NIGHT,
    };

    tag(&period.label.to_uppercase(), background)
}

pub fn city_line(city: &City) -> String {
    format!("{} {}", tag("CITY", CITY), city)
}

pub fn forecast_lines(period: &ForecastPeriod, verbosity: Verbosity, today: NaiveDate) -> Vec<String> {
    let tag = period_tag(period, today);

    match verbosity {
        Verbosity::Temperature => vec![format!("{tag} {}", period.temp())],
        Verbosity::Short => vec![format!("{tag} {} {}", period.temp(), period.short_forecast)],
        Verbosity::Detailed => std::iter::once(format!("{tag} {}", period.temp()))
            .chain(
                period
                    .detailed_forecast
                    .split(". ")
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string),
            )
            .collect(),
    }
}

/// Print the first period, or all of them (paced) when `extended` is set.
pub async fn print_forecast(periods: &[ForecastPeriod], verbosity: Verbosity, extended: bool) {
    let today = Local::now().date_naive();

    for period in periods {
        for line in forecast_lines(period, verbosity, today) {
            println!("{line}");
        }

        if !extended {
            break;
        }

        tokio::time::sleep(EXTENDED_PACE).await;
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }

    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// A table with a rounded border and a bold header row.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}", segments.join(mid))
    };

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .into_iter()
            .zip(&widths)
            .map(|(cell, w)| {
                let pad = w - cell.chars().count();
                format!(" {cell}{} ", " ".repeat(pad))
            })
            .collect();
        format!("│{}│", padded.join("│"))
    };

    let mut out = vec![rule("╭", "┬", "╮")];
    out.push(
        line(headers.iter().map(|h| h.to_string()).collect())
            .bold()
            .to_string(),
    );
    out.push(rule("├", "┼", "┤"));

    for row in rows {
        let mut cells: Vec<String> = row.iter().take(widths.len()).cloned().collect();
        cells.resize(widths.len(), String::new());
        out.push(line(cells));
    }

    out.push(rule("╰", "┴", "╯"));
    out.join("\n")
}

pub fn city_table(city: &City) -> String {
    table(
        &["City", "Latitude", "Longitude"],
        &[vec![
            city.name.clone(),
            format!("{:.6}", city.latitude),
            format!("{:.6}", city.longitude),
        ]],
    )
}

pub fn period_row(period: &ForecastPeriod) -> Vec<String> {
    vec![
        period.number.to_string(),
        truncate(&period.label, 15),
        period.temp(),
        period.precipitation(),
        truncate(&period.wind(), 15),
        truncate(&period.short_forecast, 25),
    ]
}

pub fn period_table(periods: &[ForecastPeriod]) -> String {
    let rows: Vec<Vec<String>> = periods.iter().map(period_row).collect();
    table(&["ID", "Label", "T", "P", "Wind", "Forecast"], &rows)
}

pub fn selection(period: &ForecastPeriod) -> String {
    format!(
        "You selected: {}'s weather forecast (id: {}).\n{}",
        period.label.to_lowercase(),
        period.number,
        period.detailed_forecast
    )
}
