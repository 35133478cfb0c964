use anyhow::{Result, bail};
use geocast_core::{Config, ServiceId};
use inquire::{Password, PasswordDisplayMode, Text};

/// Prompt for the credential of `service` and store it in the config file.
pub fn run(service: &str) -> Result<()> {
    let id = ServiceId::try_from(service)?;
    let mut config = Config::load()?;

    let answer = match id {
        ServiceId::IpInfo => Password::new("ipinfo.io access token:")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_help_message("Create one at https://ipinfo.io/account/token")
            .prompt()?,
        ServiceId::Nominatim | ServiceId::Nws => Text::new("Client identification (User-Agent):")
            .with_placeholder("geocast (you@example.com)")
            .with_help_message("Nominatim and api.weather.gov reject anonymous requests")
            .prompt()?,
    };

    apply_answer(&mut config, id, &answer)?;
    config.save()?;

    println!("Saved {id} settings to {}", Config::config_file_path()?.display());
    Ok(())
}

fn apply_answer(config: &mut Config, id: ServiceId, answer: &str) -> Result<()> {
    let answer = answer.trim();
    if answer.is_empty() {
        bail!("Nothing entered for {id}; configuration left unchanged.");
    }

    match id {
        ServiceId::IpInfo => config.set_ipinfo_token(answer.to_string()),
        ServiceId::Nominatim | ServiceId::Nws => config.set_user_agent(answer.to_string()),
    }

    Ok(())
}
