use anyhow::{anyhow, Error, Result};
use clap::{Parser, Subcommand};
use log::info;
use rdfgraft::config::ImportOptions;
use rdfgraft::errors::ImportError;
use rdfgraft::importer::{Importer, ProgressSink};
use rdfgraft::options::{BatchSize, InputFormat};
use rdfgraft::store::LocalStore;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "rdfgraft")]
#[command(about = "Bulk load RDF files into a graph store")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import RDF files (or directories of them) into a graph store
    Import {
        /// Directory of the graph store; created if missing
        #[clap(long, short, required_unless_present = "temporary")]
        store: Option<PathBuf>,
        /// Input format selector (see `rdfgraft formats`); inferred from the file extension by default
        #[clap(long, short)]
        format: Option<String>,
        /// Base IRI for relative IRIs
        #[clap(long = "base-uri", short)]
        base_uri: Option<String>,
        /// Statements committed per transaction
        #[clap(long = "batch-size", short = 'n', allow_hyphen_values = true)]
        batch_size: Option<i64>,
        /// JSON file with import options; command line flags take precedence
        #[clap(long, short)]
        config: Option<PathBuf>,
        /// Import into an in-memory store that is discarded on exit
        #[clap(long, short, action)]
        temporary: bool,
        /// Files or directories to import
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Prints node, relation and commit counts of a graph store
    Stats {
        /// Directory of the graph store
        #[clap(long, short)]
        store: PathBuf,
    },
    /// Lists the accepted input format selectors
    Formats,
    /// Prints the version of the rdfgraft binary
    Version,
}

/// Prints `file: 0.. 1500... 3000... 3214 <end>` while a file is imported.
struct ConsoleProgress {
    line_open: bool,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self { line_open: false }
    }

    fn flush() {
        let _ = std::io::stdout().flush();
    }
}

impl ProgressSink for ConsoleProgress {
    fn started(&mut self, source: &Path) {
        print!("{}: 0..", source.display());
        self.line_open = true;
        Self::flush();
    }

    fn checkpoint(&mut self, imported: usize) {
        print!(" {}...", imported);
        Self::flush();
    }

    fn finished(&mut self, imported: usize) {
        println!(" {} <end>", imported);
        self.line_open = false;
    }

    fn failed(&mut self, source: &Path, error: &ImportError) {
        if self.line_open {
            println!(" <failed>");
            self.line_open = false;
        }
        eprintln!("{}: {}", source.display(), error);
    }
}

pub fn run() -> Result<()> {
    rdfgraft::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    rdfgraft::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // RUST_LOG may already come from RDFGRAFT_LOG; CLI flags take precedence
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    match cmd.command {
        Commands::Import {
            store,
            format,
            base_uri,
            batch_size,
            config,
            temporary,
            paths,
        } => {
            let options = import_options(config.as_deref(), format, base_uri, batch_size)?;
            if cmd.verbose || cmd.debug {
                options.print();
            }
            let store = match (&store, temporary) {
                (_, true) => LocalStore::in_memory(),
                (Some(location), false) => LocalStore::open(location)?,
                (None, false) => return Err(anyhow!("--store is required unless --temporary is set")),
            };
            let inputs = expand_inputs(&paths)?;
            if inputs.is_empty() {
                return Err(anyhow!("No RDF files found in {:?}", paths));
            }
            import(store, &inputs, &options)?;
        }
        Commands::Stats { store } => {
            if !store.is_dir() {
                return Err(anyhow!("No graph store found at {}", store.display()));
            }
            let store = LocalStore::open(&store)?;
            let stats = store.stats()?;
            println!("Store: {}", store.location().unwrap_or(Path::new("")).display());
            println!("  Nodes: {}", stats.num_nodes);
            println!("  Relations: {}", stats.num_relations);
            println!("  Commits: {}", stats.num_commits);
        }
        Commands::Formats => {
            for format in InputFormat::ALL {
                println!("{:<8} {}", format.selector(), format.description());
            }
        }
        Commands::Version => {
            println!("rdfgraft {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

/// Options from the config file (or defaults), overridden by explicit flags.
fn import_options(
    config: Option<&Path>,
    format: Option<String>,
    base_uri: Option<String>,
    batch_size: Option<i64>,
) -> Result<ImportOptions> {
    let mut options = match config {
        Some(file) => ImportOptions::from_file(file)?,
        None => ImportOptions::default(),
    };
    if let Some(format) = format {
        options.format = Some(format.parse()?);
    }
    if let Some(base_uri) = base_uri {
        options.base_iri = base_uri;
    }
    if let Some(batch_size) = batch_size {
        options.batch_size = BatchSize::try_from(batch_size)?;
    }
    Ok(options)
}

/// Keeps file arguments as given and replaces directories by the RDF files
/// they contain, recursively and in file name order.
fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }
        for entry in walkdir::WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && InputFormat::from_path(entry.path()).is_some() {
                inputs.push(entry.path().to_path_buf());
            }
        }
    }
    Ok(inputs)
}

fn import(store: LocalStore, inputs: &[PathBuf], options: &ImportOptions) -> Result<()> {
    let mut importer = Importer::new(store);
    let mut progress = ConsoleProgress::new();
    let outcomes = importer.import_files(inputs, options, &mut progress);
    importer.close()?;
    for outcome in &outcomes {
        if let Ok(report) = &outcome.result {
            info!(
                "{}: {} triples, {} nodes, {} commits",
                outcome.path.display(),
                report.triples,
                report.nodes,
                report.commits
            );
        }
    }
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        return Err(anyhow!(
            "{} of {} files failed to import",
            failed,
            inputs.len()
        ));
    }
    Ok(())
}
