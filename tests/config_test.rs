use shoplens::config::{AppConfig, ConfigManager};
use shoplens::{Args, CompressionFormat, NegativeDeliveryPolicy, OpenOptions, OutputFormat};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

fn args() -> Args {
    Args {
        path: Some(PathBuf::from("orders.csv")),
        views: Vec::new(),
        output: OutputFormat::Json,
        no_header: None,
        delimiter: None,
        compression: None,
        format: None,
        top_n: None,
        seed: None,
        debug: false,
        generate_config: false,
        force: false,
    }
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.views.top_n, 10);
    assert_eq!(config.views.price_decimals, 2);
    assert_eq!(config.views.display_decimals, 2);
    assert_eq!(config.views.sample_size, 15);
    assert_eq!(config.views.sample_seed, 42);
    assert_eq!(config.views.negative_delivery, NegativeDeliveryPolicy::Retain);
    assert_eq!(config.logging.level, "warn");
    assert!(config.file_loading.delimiter.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    assert!(template.contains("[file_loading]"));
    assert!(template.contains("[views]"));
    assert!(template.contains("[logging]"));
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_default_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    let parsed: AppConfig = toml::from_str(&template).expect("template must parse");
    assert_eq!(parsed, AppConfig::default());
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[views]"));

    // A second write without force is refused
    assert!(config_manager.write_default_config(false).is_err());
    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_load_missing_config_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = config_manager.load_config().unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_partial_user_config_merges() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        r#"
[views]
top_n = 5
negative_delivery = "exclude"

[file_loading]
delimiter = 59
"#,
    )
    .unwrap();

    let user = config_manager.load_config().unwrap();
    let mut config = AppConfig::default();
    config.merge(user);

    assert_eq!(config.views.top_n, 5);
    assert_eq!(config.views.negative_delivery, NegativeDeliveryPolicy::Exclude);
    // untouched values keep their defaults
    assert_eq!(config.views.sample_size, 15);
    assert_eq!(config.file_loading.delimiter, Some(b';'));
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_config_file_errors() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(config_manager.config_path("config.toml"), "[views\ntop_n = ").unwrap();
    assert!(config_manager.load_config().is_err());
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.views.top_n = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.file_loading.compression = Some("rar".to_string());
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.version = "9.0".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_cli_args_override_config() {
    let mut config = AppConfig::default();
    config.views.top_n = 5;
    config.views.sample_seed = 7;
    config.file_loading.compression = Some("bzip2".to_string());

    let settings = config.view_settings(&args());
    assert_eq!(settings.top_n, 5);
    assert_eq!(settings.sample_seed, 7);

    let mut cli = args();
    cli.top_n = Some(3);
    cli.seed = Some(1);
    cli.compression = Some(CompressionFormat::Xz);
    let settings = config.view_settings(&cli);
    assert_eq!(settings.top_n, 3);
    assert_eq!(settings.sample_seed, 1);

    let opts = OpenOptions::from_args_and_config(&cli, &config);
    assert_eq!(opts.compression, Some(CompressionFormat::Xz));
    let opts = OpenOptions::from_args_and_config(&args(), &config);
    assert_eq!(opts.compression, Some(CompressionFormat::Bzip2));
}
