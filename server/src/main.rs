use clap::Parser;
use weather_server::cli::{Cli, Command, DbSubCommand};
use weather_server::{config, db, server, tools};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();

    match args.cmd {
        Command::Http { address } => {
            let config = config::Config::from_env()?;
            server::run(address, &args.database_url, &config).await
        }
        Command::Db(db_cmd) => match db_cmd.cmd {
            DbSubCommand::Migrate => db::migrate(&args.database_url).await,
            DbSubCommand::Reset => db::reset(&args.database_url).await,
        },
        Command::City(city_cmd) => tools::cities::exec(&args.database_url, city_cmd.cmd).await,
    }
}
