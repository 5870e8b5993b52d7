use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(about = "Weather read-through proxy.")]
pub struct Cli {
    #[arg(env = "WEATHER_DATABASE_URL", short, long)]
    pub database_url: String,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve `GET /weather?city=<name>`.
    Http {
        #[arg(env = "WEATHER_SERVER_ADDRESS", default_value = "0.0.0.0:8000")]
        address: std::net::SocketAddr,
    },
    Db(DbCommand),
    City(CityCommand),
}

#[derive(Debug, Parser)]
pub struct DbCommand {
    #[command(subcommand)]
    pub cmd: DbSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbSubCommand {
    Reset,
    Migrate,
}

#[derive(Debug, Parser)]
pub struct CityCommand {
    #[command(subcommand)]
    pub cmd: CitySubCommand,
}

#[derive(Debug, Subcommand)]
pub enum CitySubCommand {
    /// Register a city and the coordinates used to query the provider.
    Add {
        name: String,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    List,
}
