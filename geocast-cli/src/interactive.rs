//! Interactive mode: pick a city, then browse its forecast periods.

use std::fmt;

use anyhow::Result;
use geocast_core::{City, ForecastPeriod, WeatherProvider, well_known_cities};
use inquire::{InquireError, Select};

use crate::view;

/// A forecast period as one line of the selection list.
#[derive(Debug, Clone)]
struct PeriodChoice(ForecastPeriod);

impl fmt::Display for PeriodChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.0;
        write!(f, "{:>2}  {:<15} {:>5}  {}", p.number, p.label, p.temp(), p.short_forecast)
    }
}

pub fn pick_city() -> Result<City> {
    let city = Select::new("Choose a city to fetch the weather for", well_known_cities()).prompt()?;
    Ok(city)
}

/// Show the period table, then print the detailed forecast of whichever
/// period is selected until the user presses Esc.
pub async fn browse(weather: &dyn WeatherProvider, city: &City) -> Result<()> {
    let periods = weather.get_weather(city).await?;

    if periods.is_empty() {
        println!("No forecast periods available for {city}.");
        return Ok(());
    }

    println!("{}", view::period_table(&periods));

    let choices: Vec<PeriodChoice> = periods.into_iter().map(PeriodChoice).collect();
    let mut cursor = 0;

    loop {
        let answer = Select::new("Select a period (esc to quit)", choices.clone())
            .with_starting_cursor(cursor)
            .with_page_size(7)
            .raw_prompt();

        match answer {
            Ok(selected) => {
                cursor = selected.index;
                println!("{}", view::selection(&selected.value.0));
            }
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
