//! Command-line surface over the sensordeck library.
//!
//! The CLI is a caller in the resource client's sense: it owns all
//! user-facing messaging for outcomes (including the "insufficient rights"
//! case) and never reaches into the retry policy.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::api::{Failure, HttpTransport, ResourceClient, SensorApi};
use crate::auth::{CredentialStore, LoginAuthenticator, SessionHandle, SessionStore};
use crate::config::Config;
use crate::models::{FixedJob, NewFixedJob};
use crate::utils::format::{
    last_contact_string, map_to_display, optional_display, timestamp_to_utc_string,
    truncate_string,
};

#[derive(Parser)]
#[command(name = "sensordeck", about = "CLI for the sensor management system API", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session
    Login {
        /// Username (defaults to the last one used)
        #[arg(long)]
        username: Option<String>,
    },
    /// Revoke the session and clear stored tokens
    Logout,
    /// Fixed job operations
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
    /// Sensor operations
    Sensors {
        #[command(subcommand)]
        command: SensorsCommand,
    },
    /// Client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum JobsCommand {
    /// List all fixed jobs
    List,
    /// Show one job by id
    Show { id: String },
    /// Create a fixed job
    Create(CreateJobArgs),
    /// Delete a job by id
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct CreateJobArgs {
    /// Job name (no whitespace; display-only, the server assigns the id)
    #[arg(long)]
    name: String,
    /// Start, unix timestamp or "YYYY-MM-DD HH:MM" (UTC)
    #[arg(long)]
    start: String,
    /// End, unix timestamp or "YYYY-MM-DD HH:MM" (UTC)
    #[arg(long)]
    end: String,
    /// Command to run on the sensors
    #[arg(long)]
    command: String,
    /// Command argument as key=value, repeatable
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    args: Vec<String>,
    /// Target sensor name, repeatable
    #[arg(long = "sensor", value_name = "NAME")]
    sensors: Vec<String>,
}

#[derive(Subcommand)]
enum SensorsCommand {
    /// Show one sensor by id
    Show { id: i64 },
    /// List sensor positions split by liveness
    Locations,
    /// Issue a fresh token bundle for a sensor (invalidates its old token)
    Token { id: i64 },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Set the backend base URL
    SetHost { url: String },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Command::Config {
            command: ConfigCommand::SetHost { url },
        } => {
            config.host = Some(url.trim_end_matches('/').to_string());
            config.save()?;
            println!("Host set to {}", config.host.as_deref().unwrap_or(""));
            Ok(())
        }
        Command::Login { username } => login(&mut config, username).await,
        Command::Logout => logout(&config).await,
        Command::Jobs { command } => {
            let api = connect(&config).await?;
            match command {
                JobsCommand::List => jobs_list(&api).await,
                JobsCommand::Show { id } => jobs_show(&api, &id).await,
                JobsCommand::Create(args) => jobs_create(&api, args).await,
                JobsCommand::Delete { id, yes } => jobs_delete(&api, &id, yes).await,
            }
        }
        Command::Sensors { command } => {
            let api = connect(&config).await?;
            match command {
                SensorsCommand::Show { id } => sensors_show(&api, id).await,
                SensorsCommand::Locations => sensors_locations(&api).await,
                SensorsCommand::Token { id } => sensors_token(&api, id).await,
            }
        }
    }
}

/// Wire transport, session, and authenticator into a ready API handle
async fn connect(config: &Config) -> Result<SensorApi> {
    let host = config.resolved_host()?;
    let transport = HttpTransport::new(&host)
        .map_err(|e| anyhow!("Failed to set up HTTP transport: {}", e))?;
    let store = SessionStore::new(config.cache_dir()?);
    let session = SessionHandle::new();

    match store.load()? {
        Some(data) => {
            debug!(
                minutes_left = data.minutes_until_expiry(),
                "Loaded stored session"
            );
            session.replace(data).await;
        }
        None => bail!("Not logged in. Run 'sensordeck login' first."),
    }

    let authenticator = Arc::new(LoginAuthenticator::new(
        transport.clone(),
        session.clone(),
        SessionStore::new(config.cache_dir()?),
    ));
    let client = ResourceClient::new(Arc::new(transport), authenticator, session);
    Ok(SensorApi::new(client))
}

async fn login(config: &mut Config, username: Option<String>) -> Result<()> {
    let host = config.resolved_host()?;
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(u) => u,
        None => prompt("Username: ")?,
    };

    // Keychain first, prompt as fallback
    let password = match CredentialStore::get_password(&username) {
        Ok(pw) => pw,
        Err(_) => {
            let pw = rpassword::prompt_password("Password: ")
                .context("Failed to read password")?;
            if let Err(e) = CredentialStore::store(&username, &pw) {
                debug!(error = %e, "Could not store password in keychain");
            }
            pw
        }
    };

    let transport = HttpTransport::new(&host)
        .map_err(|e| anyhow!("Failed to set up HTTP transport: {}", e))?;
    let session = SessionHandle::new();
    let authenticator = LoginAuthenticator::new(
        transport,
        session.clone(),
        SessionStore::new(config.cache_dir()?),
    );

    authenticator.login(&username, &password).await?;

    config.last_username = Some(username.clone());
    config.save()?;
    println!("Logged in as {}", username);
    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    let host = config.resolved_host()?;
    let transport = HttpTransport::new(&host)
        .map_err(|e| anyhow!("Failed to set up HTTP transport: {}", e))?;
    let store = SessionStore::new(config.cache_dir()?);
    let session = SessionHandle::new();
    if let Some(data) = store.load()? {
        session.replace(data).await;
    }

    let authenticator = LoginAuthenticator::new(
        transport,
        session,
        SessionStore::new(config.cache_dir()?),
    );
    authenticator.logout().await?;

    // Explicit logout also drops the stored password
    if let Some(username) = &config.last_username {
        if let Err(e) = CredentialStore::delete(username) {
            debug!(error = %e, "No stored password to remove");
        }
    }

    println!("Logged out.");
    Ok(())
}

async fn jobs_list(api: &SensorApi) -> Result<()> {
    let mut jobs = api.list_fixed_jobs().await.map_err(report)?;
    FixedJob::sort_for_display(&mut jobs);

    if jobs.is_empty() {
        println!("No fixed jobs.");
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<22} {:<22} {:<20} {}",
        "NAME", "STATUS", "START", "END", "COMMAND", "ID"
    );
    for job in &jobs {
        println!(
            "{:<24} {:<10} {:<22} {:<22} {:<20} {}",
            truncate_string(&job.name, 24),
            job.status,
            timestamp_to_utc_string(job.start_time),
            timestamp_to_utc_string(job.end_time),
            truncate_string(&job.command, 20),
            job.id
        );
    }
    Ok(())
}

async fn jobs_show(api: &SensorApi, id: &str) -> Result<()> {
    let job = api.fetch_fixed_job(id).await.map_err(report)?;
    println!("id:        {}", job.id);
    println!("name:      {}", job.name);
    println!("status:    {}", job.status);
    println!("start:     {}", timestamp_to_utc_string(job.start_time));
    println!("end:       {}", timestamp_to_utc_string(job.end_time));
    println!("command:   {}", job.command);
    println!("arguments: {}", map_to_display(&job.arguments));
    println!("sensors:   {}", job.sensors.join(","));
    if !job.states.is_empty() {
        println!("states:");
        for (sensor, state) in &job.states {
            println!("  {}: {}", sensor, state);
        }
    }
    Ok(())
}

async fn jobs_create(api: &SensorApi, args: CreateJobArgs) -> Result<()> {
    let start = parse_time(&args.start)?;
    let end = parse_time(&args.end)?;

    let mut arguments = BTreeMap::new();
    for pair in &args.args {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid argument '{}', expected key=value", pair))?;
        arguments.insert(key.to_string(), value.to_string());
    }

    let mut job = NewFixedJob::new(&args.name, start, end, &args.command);
    job.arguments = arguments;
    job.sensors = args.sensors;

    job.validate()?;
    api.create_fixed_job(&job).await.map_err(report)?;
    println!("Created fixed job '{}'", args.name);
    Ok(())
}

async fn jobs_delete(api: &SensorApi, id: &str, yes: bool) -> Result<()> {
    // Fetch first so the prompt can show the name; the delete itself
    // targets the id, names may collide.
    let job = api.fetch_fixed_job(id).await.map_err(report)?;

    if !yes {
        let answer = prompt(&format!("Delete '{}' ({})? [y/N] ", job.name, job.id))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    api.delete_fixed_job(id).await.map_err(report)?;
    println!("Deleted '{}'", job.name);
    Ok(())
}

async fn sensors_show(api: &SensorApi, id: i64) -> Result<()> {
    let sensor = api.fetch_sensor(id).await.map_err(report)?;
    let now = Utc::now().timestamp();

    println!("id:             {}", sensor.id);
    println!("name:           {}", sensor.sensor_name);
    println!(
        "scheduled jobs: {}",
        if sensor.jobs.is_empty() {
            "---".to_string()
        } else {
            sensor.jobs.join(",")
        }
    );
    println!(
        "last contact:   {}",
        last_contact_string(sensor.status.status_time, now)
    );
    println!(
        "location:       {}, {} [deg lat, deg lon]",
        optional_display(&sensor.status.location_lat),
        optional_display(&sensor.status.location_lon)
    );
    println!("os version:     {}", optional_display(&sensor.status.os_version));
    println!(
        "temperature:    {} C",
        optional_display(&sensor.status.temperature_celsius)
    );
    println!("ethernet:       {}", optional_display(&sensor.status.ethernet));
    println!("wifi:           {}", optional_display(&sensor.status.wifi));
    println!("lte:            {}", optional_display(&sensor.status.lte));
    Ok(())
}

async fn sensors_locations(api: &SensorApi) -> Result<()> {
    let locations = api.fetch_sensor_locations().await.map_err(report)?;
    if locations.is_empty() {
        println!("No locations reported.");
        return Ok(());
    }
    println!("online:");
    for (lat, lon) in &locations.online {
        println!("  {:.4}, {:.4}", lat, lon);
    }
    println!("offline:");
    for (lat, lon) in &locations.offline {
        println!("  {:.4}, {:.4}", lat, lon);
    }
    Ok(())
}

async fn sensors_token(api: &SensorApi, id: i64) -> Result<()> {
    let confirm = prompt(&format!(
        "Create new token for sensor {}? The current token becomes invalid. [y/N] ",
        id
    ))?;
    if !confirm.eq_ignore_ascii_case("y") {
        println!("Aborted.");
        return Ok(());
    }

    let bundle = api.create_sensor_token(id).await.map_err(report)?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

/// Accept a unix timestamp or a "YYYY-MM-DD HH:MM" UTC datetime
fn parse_time(input: &str) -> Result<i64> {
    if let Ok(ts) = input.parse::<i64>() {
        return Ok(ts);
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| format!("Invalid time '{}', expected unix timestamp or YYYY-MM-DD HH:MM", input))?;
    Ok(Utc.from_utc_datetime(&naive).timestamp())
}

/// Turn a Failure into the message the user should see
fn report(failure: Failure) -> anyhow::Error {
    match &failure {
        Failure::Forbidden(_) => anyhow!("Insufficient rights."),
        _ => anyhow!(failure.to_string()),
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_accepts_unix_timestamp() {
        assert_eq!(parse_time("1692950400").unwrap(), 1692950400);
    }

    #[test]
    fn test_parse_time_accepts_utc_datetime() {
        assert_eq!(parse_time("2023-08-25 08:00").unwrap(), 1692950400);
        assert_eq!(parse_time("2023-08-25 08:00:00").unwrap(), 1692950400);
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("yesterday").is_err());
    }
}
