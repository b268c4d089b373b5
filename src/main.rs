use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use ec_parser::{
    inject_panel, load_config, AppConfig, ClipboardChain, DetailFormat, DocumentSource,
    DownloadMode, FileSource, HttpSource, ImageHarvester, PageKind, PageSnapshot, Panel,
    PanelSettings, ParserError, PollConfig, Selection, TargetProbe,
};

#[derive(Debug, Parser)]
#[command(name = "ec-parser")]
#[command(about = "Extract item details, images and shipment data from e-commerce back-office pages")]
struct Cli {
    /// Directory for downloaded images and CSV files
    #[arg(long, global = true, env = "EC_PARSER_OUTPUT_DIR")]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print or copy the item details of a Rakuten item page
    Details {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        /// Copy to the clipboard instead of printing
        #[arg(long)]
        copy: bool,
    },
    /// Download the product images of a Rakuten item page
    Images {
        #[command(flatten)]
        source: SourceArgs,
        /// 1-based image numbers, e.g. "1,3-5"
        #[arg(long)]
        select: Option<String>,
        /// Filename prefix; defaults to the item code from the page URL
        #[arg(long)]
        prefix: Option<String>,
        /// Download concurrently instead of one at a time
        #[arg(long)]
        batch: bool,
        /// Only list the images that would be downloaded
        #[arg(long)]
        list: bool,
    },
    /// Export the rows of a Seino shipment list
    Shipping {
        #[command(flatten)]
        source: SourceArgs,
        /// Write CSV; without a path uses shipping_data_YYYY-MM-DD.csv
        #[arg(long, num_args = 0..=1)]
        csv: Option<Option<PathBuf>>,
        /// Copy the records to the clipboard as JSON
        #[arg(long)]
        copy: bool,
        /// Print the records as a table (default when nothing else is asked)
        #[arg(long)]
        show: bool,
    },
    /// Wait for the page content, then take panel commands from stdin
    Panel {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
    },
    /// Report which page kind a URL belongs to
    Detect { url: Url },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Saved HTML file or http(s) URL of the page
    source: String,
    /// Address a saved file was captured from
    #[arg(long)]
    url: Option<Url>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Lines,
}

impl From<FormatArg> for DetailFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => DetailFormat::Json,
            FormatArg::Lines => DetailFormat::Lines,
        }
    }
}

/// A page read from disk or over HTTP.
enum Source {
    File(FileSource),
    Http(HttpSource),
}

impl Source {
    fn open(args: &SourceArgs, config: &AppConfig) -> anyhow::Result<(Self, Option<Url>)> {
        if args.source.starts_with("http://") || args.source.starts_with("https://") {
            let url = Url::parse(&args.source).map_err(|e| ParserError::InvalidUrl {
                url: args.source.clone(),
                reason: e.to_string(),
            })?;
            let source = HttpSource::new(url.clone(), config.request_timeout, &config.user_agent)?;
            Ok((Self::Http(source), Some(url)))
        } else {
            let source = FileSource::new(&args.source, args.url.clone());
            Ok((Self::File(source), args.url.clone()))
        }
    }
}

impl DocumentSource for Source {
    async fn fetch(&self) -> ec_parser::Result<PageSnapshot> {
        match self {
            Self::File(s) => s.fetch().await,
            Self::Http(s) => s.fetch().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(s) => s.describe(),
            Self::Http(s) => s.describe(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config()?;
    if let Some(out) = cli.out {
        config.output_dir = out;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Detect { url } => match PageKind::detect(&url) {
            Some(kind) => println!("{}", kind.name()),
            None => println!("unsupported"),
        },
        Commands::Details {
            source,
            format,
            copy,
        } => {
            let panel = open_panel(&source, &config).await?;
            if copy {
                let status = panel
                    .copy_details(&ClipboardChain::system(&config), format.into())
                    .await;
                println!("{status}");
            } else {
                let record = panel.extract_details().await?;
                println!("{}", record.render(format.into())?);
            }
        }
        Commands::Images {
            source,
            select,
            prefix,
            batch,
            list,
        } => {
            let selection = select.as_deref().map(Selection::parse).transpose()?;
            let panel = open_panel(&source, &config).await?;
            if list {
                list_images(&panel, selection.as_ref()).await?;
            } else {
                let mut harvester = ImageHarvester::from_config(&config)?;
                if batch {
                    harvester = harvester.with_mode(DownloadMode::Batch {
                        concurrency: config.batch_concurrency,
                    });
                }
                let status = panel
                    .download_images(&harvester, selection.as_ref(), prefix.as_deref())
                    .await;
                println!("{status}");
            }
        }
        Commands::Shipping {
            source,
            csv,
            copy,
            show,
        } => {
            let panel = open_panel(&source, &config).await?;
            let wants_csv = csv.is_some();
            if let Some(path) = csv {
                let path = path.unwrap_or_else(|| default_csv_path(&config));
                println!("{}", panel.download_csv(&path).await);
            }
            if copy {
                println!("{}", panel.copy_shipping(&ClipboardChain::system(&config)).await);
            }
            if show || (!copy && !wants_csv) {
                let mut stdout = std::io::stdout();
                let status = panel.show_shipping(&mut stdout).await;
                println!("{status}");
            }
        }
        Commands::Panel { source, format } => {
            let (page, url) = Source::open(&source, &config)?;
            let kind = url.as_ref().and_then(PageKind::detect);
            let settings = PanelSettings::from_config(&config);
            let probe = TargetProbe::for_page(kind, &settings.layout);
            let panel = inject_panel(page, &probe, &PollConfig::from_config(&config), settings).await?;
            run_panel(panel, &config, format.into()).await?;
        }
    }

    Ok(())
}

/// One-shot commands read the page once and do not wait for content.
async fn open_panel(args: &SourceArgs, config: &AppConfig) -> anyhow::Result<Panel<Source>> {
    let (page, _) = Source::open(args, config)?;
    let poll = PollConfig {
        max_attempts: 1,
        ..PollConfig::from_config(config)
    };
    let panel = inject_panel(page, &TargetProbe::Always, &poll, PanelSettings::from_config(config)).await?;
    Ok(panel)
}

fn default_csv_path(config: &AppConfig) -> PathBuf {
    config
        .output_dir
        .join(ec_parser::default_csv_filename(chrono::Local::now().date_naive()))
}

async fn list_images(panel: &Panel<Source>, selection: Option<&Selection>) -> anyhow::Result<()> {
    let (images, prefix) = panel.images(selection).await?;
    println!("prefix: {prefix}");
    for image in &images {
        let mark = if image.selected { "x" } else { " " };
        println!("[{mark}] {:>3} {}", image.ordinal_index + 1, image.source_url);
    }
    Ok(())
}

/// Read panel commands from stdin until `close` or end of input.
async fn run_panel(panel: Panel<Source>, config: &AppConfig, format: DetailFormat) -> anyhow::Result<()> {
    let clipboard = ClipboardChain::system(config);
    let harvester = ImageHarvester::from_config(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("panel ready: details | copy | images [SELECTION] | csv [PATH] | json | show | close");
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        match command {
            "details" => {
                let mut stdout = std::io::stdout();
                let status = panel.show_details(&mut stdout, format).await;
                if !status.is_success() {
                    println!("{status}");
                }
            }
            "copy" => println!("{}", panel.copy_details(&clipboard, format).await),
            "images" => {
                let selection = match arg.map(Selection::parse).transpose() {
                    Ok(selection) => selection,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                println!("{}", panel.download_images(&harvester, selection.as_ref(), None).await);
            }
            "csv" => {
                let path = arg.map(PathBuf::from).unwrap_or_else(|| default_csv_path(config));
                println!("{}", panel.download_csv(&path).await);
            }
            "json" => println!("{}", panel.copy_shipping(&clipboard).await),
            "show" => {
                let mut stdout = std::io::stdout();
                let status = panel.show_shipping(&mut stdout).await;
                println!("{status}");
            }
            "close" => break,
            other => println!("unknown command: {other}"),
        }
        std::io::stdout().flush()?;
    }

    panel.close();
    Ok(())
}
