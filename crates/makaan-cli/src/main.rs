use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use makaan::pipeline::{scrape_localities, scrape_properties};
use makaan::types::LocalityCategory;
use makaan::{Config, WebScraper};

#[derive(Parser)]
#[command(name = "makaan")]
#[command(about = "A makaan.com price-trend and listing scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        help = "Append log lines to this file instead of stderr"
    )]
    log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "https://www.makaan.com",
        help = "Site root used to resolve relative links"
    )]
    base_url: String,

    #[arg(
        long,
        global = true,
        default_value = "bangalore",
        help = "City whose price-trend table is scraped"
    )]
    city: String,

    #[arg(
        long,
        global = true,
        default_value = "output/localities",
        help = "Folder for the per-category locality files"
    )]
    locality_dir: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "output/properties",
        help = "Folder for the per-locality listing files"
    )]
    property_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Args)]
struct CategoryArgs {
    #[arg(
        long = "category",
        value_parser = parse_category,
        help = "Locality category to cover (repeatable, defaults to all four)"
    )]
    categories: Vec<LocalityCategory>,
}

impl CategoryArgs {
    fn apply(self, config: &mut Config) {
        if !self.categories.is_empty() {
            config.categories = self.categories;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the price-trend tables into one file per locality category
    Localities {
        #[command(flatten)]
        categories: CategoryArgs,
    },
    /// Scrape property listings for every locality written by `localities`
    Properties {
        #[command(flatten)]
        categories: CategoryArgs,
    },
    /// Run `localities` then `properties`
    Run {
        #[command(flatten)]
        categories: CategoryArgs,
    },
}

fn parse_category(s: &str) -> Result<LocalityCategory, String> {
    LocalityCategory::from_str(s).map_err(|e| e.to_string())
}

fn init_logging(level: LevelFilter, log_file: Option<&PathBuf>) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap_or_else(|e| {
                eprintln!("Error opening log file {}: {}", path.display(), e);
                process::exit(1);
            });
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_level.clone().into(), cli.log_file.as_ref());

    let mut config = Config {
        base_url: cli.base_url,
        city: cli.city,
        locality_dir: cli.locality_dir,
        property_dir: cli.property_dir,
        ..Config::default()
    };

    let scraper = WebScraper::new(&config).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Localities { categories } => {
            categories.apply(&mut config);

            let summary = scrape_localities(&scraper, &config)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error scraping localities: {}", e);
                    process::exit(1);
                });
            log::info!("{}", summary);
        }

        Commands::Properties { categories } => {
            categories.apply(&mut config);

            let summary = scrape_properties(&scraper, &config)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error scraping properties: {}", e);
                    process::exit(1);
                });
            log::info!("{}", summary);
        }

        Commands::Run { categories } => {
            categories.apply(&mut config);

            let (localities, properties) = makaan::pipeline::run(&scraper, &config)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error running scrapers: {}", e);
                    process::exit(1);
                });
            log::info!("{}", localities);
            log::info!("{}", properties);
        }
    }
}
