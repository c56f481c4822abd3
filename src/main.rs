use camino::Utf8PathBuf;
use log::LevelFilter;
use miette::{IntoDiagnostic, miette};
use std::io;

use weft::{
    driver::{Lifetime, LifetimeOptions, Target},
    loader,
    span::{Severity, SourceManager},
    tree::print::PrintOptions,
};
use weft_utils::io::RealFileSystem;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source files or directories to compile.
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,

    /// Use this driver for every file instead of picking one by extension.
    #[arg(long)]
    lang: Option<String>,

    /// Emit the resolved tree through this target, e.g. `tree`.
    #[arg(short, long)]
    target: Option<String>,

    /// Show source locations in tree dumps.
    #[arg(long)]
    locations: bool,

    #[arg(long)]
    warnings_as_errors: bool,

    /// Skip the remaining stages once an error was reported.
    #[arg(long)]
    fail_fast: bool,

    /// Maximum number of diagnostics printed.
    #[arg(long, default_value_t = 20)]
    error_limit: usize,

    /// Increase logging verbosity, may be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> LifetimeOptions {
        LifetimeOptions {
            continue_on_error: !self.fail_fast,
            error_limit: Some(self.error_limit),
            warnings_as_errors: self.warnings_as_errors,
            ..LifetimeOptions::default()
        }
    }

    fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> miette::Result<()> {
    let cli: Cli = clap::Parser::parse();

    env_logger::Builder::new()
        .filter_level(cli.level())
        .parse_default_env()
        .init();

    let print = PrintOptions {
        locations: cli.locations,
        ..PrintOptions::default()
    };
    let mediator = weft::mediator(print);

    let target = match &cli.target {
        Some(name) => {
            let target = mediator.lookup_target(name).ok_or_else(|| {
                let known = mediator
                    .targets()
                    .map(|target| target.info().name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                miette!("unknown target `{name}`, expected one of: {known}")
            })?;
            Some(target.clone())
        }
        None => None,
    };

    let options = cli.options();
    let error_limit = options.error_limit;

    let mut sources = SourceManager::new();
    let mut lifetime = Lifetime::new(&mediator, options);

    let registered = loader::load_paths(
        &RealFileSystem,
        &mut sources,
        &mut lifetime,
        &cli.paths,
        cli.lang.as_deref(),
    )
    .into_diagnostic()?;
    log::info!("registered {registered} modules");

    lifetime.run_all();
    lifetime.resolve_all();

    let fatal = lifetime.is_fatal();
    if let Some(target) = target.filter(|_| !fatal) {
        let stdout = io::stdout();
        target.emit(&lifetime, &mut stdout.lock()).into_diagnostic()?;
    }

    lifetime.finish();
    let report = lifetime.take_report();
    let errors = report.count(Severity::Error);
    let warnings = report.count(Severity::Warning);
    report
        .eprint_limited(&sources, error_limit)
        .into_diagnostic()?;

    if fatal {
        return Err(miette!(
            "compilation failed with {errors} errors and {warnings} warnings"
        ));
    }

    Ok(())
}
