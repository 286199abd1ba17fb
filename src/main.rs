use clap::{Parser, Subcommand};
use pagepress::{config, output, pipeline};
use std::path::PathBuf;
use std::process::ExitCode;

/// Shared flags for commands that process images.
#[derive(clap::Args, Clone, Default)]
struct CacheArgs {
    /// Disable the encode cache and re-encode every image
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "pagepress")]
#[command(about = "Bundle a single-page site: purged CSS, minified HTML/JS, optimized images")]
#[command(long_about = "\
Bundle a single-page site: purged CSS, minified HTML/JS, optimized images

The page is authored against a CDN utility-CSS runtime. pagepress replaces
that runtime with a static, purged stylesheet and writes a deployable bundle.

Project structure:

  .
  ├── pagepress.toml          # Config (optional, see 'pagepress gen-config')
  ├── CNAME                   # Custom domain, copied verbatim if present
  └── src/
      ├── index.html          # The page (inline <style> and <script> allowed)
      ├── app.js              # Scanned by Tailwind for class names too
      └── images/             # Rasters → .jpg + .webp, others copied

Output (dist/, deleted and recreated on every build):

  dist/
  ├── index.html              # CDN + config scripts removed, minified
  ├── styles.css              # Utilities first, then the page's own CSS
  ├── CNAME
  └── images/
      ├── hero.jpg
      └── hero.webp")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Defaults to `build`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline into the output directory
    Build(CacheArgs),
    /// Validate config and source document without writing anything
    Check,
    /// Print a stock pagepress.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command.unwrap_or(Command::Build(CacheArgs::default())) {
        Command::Build(cache_args) => {
            let bundle_config = config::load_config(&cli.root)?;
            init_thread_pool(&bundle_config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_event(&event);
                }
            });
            let result = pipeline::build(
                &cli.root,
                &bundle_config,
                &pipeline::BuildOptions {
                    use_cache: !cache_args.no_cache,
                },
                Some(tx),
            );
            // The sender is dropped when build returns, which ends the printer.
            // A panicking printer only loses progress lines; the build result
            // below is still reported.
            let progress_lost = printer.join().is_err();
            let report = result?;
            if progress_lost {
                eprintln!("warning: progress output stopped early; the report below is complete");
            }
            output::print_build_report(&report);
        }
        Command::Check => {
            let bundle_config = config::load_config(&cli.root)?;
            let report = pipeline::check(&cli.root, &bundle_config)?;
            output::print_check_report(&report);
            println!("==> Project is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
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
