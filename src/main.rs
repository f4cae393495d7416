use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use taskdeck::api::{ApiClient, session::session_file_path};
use taskdeck::cli::{Cli, Commands};
use taskdeck::utils::{expand_path, get_data_dir};
use taskdeck::{Config, Profile, TaskManager, logging};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let profile = Profile::from_dev_flag(cli.dev);

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    let data_dir = get_data_dir(profile).ok_or_else(|| eyre!("Could not determine data directory"))?;
    let log_path = logging::init(&data_dir, &config.log_level)?;
    tracing::info!(?profile, log = %log_path.display(), api = %config.api.base_url, "starting");

    let api = ApiClient::new(&config.api, Some(session_file_path(&data_dir)))?;
    let mut manager = TaskManager::new(api).with_sort(config.default_sort);

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = taskdeck::tui::App::new(config, manager);
            taskdeck::tui::run_event_loop(app).await?;
        }
        command => taskdeck::cli::run(command, &mut manager).await?,
    }

    Ok(())
}
