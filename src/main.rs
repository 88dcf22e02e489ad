use clap::{Parser, Subcommand};
use sitepress::config::{self, Environment, SiteConfig};
use sitepress::locale::{self, BaseUrl, IdentityUrl, TomlCatalog};
use sitepress::pipeline::PostBuildPipeline;
use sitepress::{output, resources};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "sitepress")]
#[command(about = "Post-build transformer for rendered static sites")]
#[command(long_about = "\
Post-build transformer for rendered static sites

Run after the renderer has written the build tree. sitepress copies back the
files the renderer skipped, moves rendered HTML pages into the theme's
template directory, and removes directories left empty.

Project layout:

  project/
  ├── sitepress.toml               # Optional, see 'sitepress gen-config'
  ├── locales/                     # <locale>.toml translation catalogs
  ├── source/
  │   ├── wp/                      # Themed content → copied verbatim
  │   └── legacy/contact.php       # Scattered .php → copied verbatim
  └── build/
      ├── index.html               # → wp/wp-content/themes/<theme>/templates/index.twig
      ├── about/index.html         # → .../templates/about/index.twig (about/ pruned)
      └── sitemap.xml              # left in place

Pipeline order is fixed: reconcile → convert → prune.")]
#[command(version = version_string())]
struct Cli {
    /// Project root containing sitepress.toml
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: reconcile → convert → prune
    Build {
        /// Also write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Copy skipped assets from the source tree into the build tree
    Reconcile,
    /// Move rendered HTML pages under the theme's template root
    Convert,
    /// Remove empty, unprotected directories from the build tree
    Prune,
    /// Validate config and list the resources a build would convert
    Check,
    /// Print the URL of a page in another locale
    Url {
        /// Page id as rendered, e.g. en/about.html
        page_id: String,
        /// Target locale
        locale: String,
        /// Prefix with the deploy target's base URL
        #[arg(long)]
        absolute: bool,
        /// Use the development URL instead of the deploy target's
        #[arg(long)]
        development: bool,
    },
    /// Print a stock sitepress.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.project)?;
    init_thread_pool(&site_config.processing);
    let pipeline = PostBuildPipeline::for_project(site_config, &cli.project);

    match cli.command {
        Command::Build { report } => {
            let build_root = pipeline.build_root().to_path_buf();
            let resources = resources::discover(&build_root, &pipeline.ignored_assets())?;

            println!("==> Post-build: {}", build_root.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                let mut converted = 0;
                for event in rx {
                    if matches!(event, sitepress::pipeline::PipelineEvent::Converted { .. }) {
                        converted += 1;
                    }
                    output::print_lines(&output::format_pipeline_event(
                        &event,
                        converted,
                        &build_root,
                    ));
                }
            });
            let result = pipeline.run(&resources, Some(tx));
            printer.join().ok();
            let run_report = result?;

            if let Some(path) = report {
                std::fs::write(&path, serde_json::to_string_pretty(&run_report)?)?;
            }
            println!("==> {}", output::format_summary(&run_report));
        }
        Command::Reconcile => {
            let report = pipeline.reconcile()?;
            output::print_lines(&output::format_reconcile(&report));
        }
        Command::Convert => {
            let resources = resources::discover(pipeline.build_root(), &pipeline.ignored_assets())?;
            let conversions = pipeline.convert(&resources)?;
            for (i, c) in conversions.iter().enumerate() {
                println!(
                    "{}",
                    output::format_conversion(
                        i + 1,
                        &c.resource,
                        &c.destination,
                        c.status,
                        pipeline.build_root(),
                    )
                );
            }
        }
        Command::Prune => {
            let report = pipeline.prune();
            output::print_lines(&output::format_prune(&report));
        }
        Command::Check => {
            println!("==> Checking {}", pipeline.build_root().display());
            let resources = resources::discover(pipeline.build_root(), &pipeline.ignored_assets())?;
            output::print_lines(&output::format_resources(&resources));
            println!("==> Config is valid");
        }
        Command::Url {
            page_id,
            locale,
            absolute,
            development,
        } => {
            let url = sibling_url(
                pipeline.config(),
                &cli.project,
                &page_id,
                &locale,
                absolute,
                development,
            )?;
            println!("{url}");
        }
        Command::GenConfig => unreachable!("handled before config loading"),
    }

    Ok(())
}

fn sibling_url(
    site_config: &SiteConfig,
    project: &Path,
    page_id: &str,
    target_locale: &str,
    absolute: bool,
    development: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let i18n = &site_config.i18n;
    let catalog = TomlCatalog::load(&project.join(&i18n.locales_dir), &i18n.locales)?;
    let url = if absolute {
        let environment = if development {
            Environment::Development
        } else {
            Environment::Build
        };
        let base = BaseUrl(site_config.site_url(environment).to_string());
        locale::sibling_locale_url(page_id, target_locale, &catalog, i18n, &base)
    } else {
        locale::sibling_locale_url(page_id, target_locale, &catalog, i18n, &IdentityUrl)
    };
    Ok(url)
}

/// Initialize tracing. Warnings are always shown; `-v` raises the level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
