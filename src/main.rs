use clap::Parser;
use warden::cli::{self, Cli, Commands, ConfigCommands, EndpointsCommands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => cli::serve::run_serve(args).await,
        Commands::Endpoints(cmd) => match cmd {
            EndpointsCommands::List(args) => cli::endpoints::handle_list(&args),
            EndpointsCommands::Test(args) => cli::endpoints::handle_test(&args).await,
        },
        Commands::Config(ConfigCommands::Init(args)) => cli::handle_config_init(&args),
        Commands::Completions(args) => {
            cli::handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
