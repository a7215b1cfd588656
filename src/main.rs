use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use shoplens::error_display::user_message_from_report;
use shoplens::render::bundle_to_text;
use shoplens::{
    assemble, load, AppConfig, Args, Bundle, ConfigManager, OpenOptions, OutputFormat, ViewName,
};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins, then `--debug`, then the configured level.
fn init_logging(args: &Args, config: &AppConfig) {
    let fallback = if args.debug {
        "shoplens=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generate_config(args: &Args) -> Result<()> {
    let config_manager = ConfigManager::new(shoplens::APP_NAME)?;
    let path = config_manager.write_default_config(args.force)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

fn print_bundles(bundles: &[Bundle], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            let json = match bundles {
                [single] => serde_json::to_string_pretty(single)?,
                many => serde_json::to_string_pretty(many)?,
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            let text: Vec<String> = bundles.iter().map(bundle_to_text).collect();
            println!("{}", text.join("\n"));
        }
    }
    Ok(())
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let path = args
        .path
        .as_deref()
        .ok_or_else(|| eyre!("A path to an order table is required"))?;

    let options = OpenOptions::from_args_and_config(args, config);
    let table = load(path, &options)?;
    let settings = config.view_settings(args);

    let views: Vec<ViewName> = if args.views.is_empty() {
        ViewName::ALL.to_vec()
    } else {
        args.views.clone()
    };

    let bundles = views
        .into_iter()
        .map(|view| assemble(&table, view, &settings))
        .collect::<shoplens::Result<Vec<_>>>()?;

    print_bundles(&bundles, args.output)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if args.generate_config {
        return generate_config(&args);
    }

    let config = AppConfig::load(shoplens::APP_NAME)?;
    init_logging(&args, &config);

    if let Err(report) = run(&args, &config) {
        eprintln!("Error: {}", user_message_from_report(&report));
        std::process::exit(1);
    }
    Ok(())
}
