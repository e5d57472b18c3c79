use anyhow::{bail, Context, Result};
use clap::Parser;
use mgc_core::{CompileOptions, Compiler, Image, LogSink, RegionMap};
use std::path::PathBuf;

mod project;

use project::Project;

/// Compile an MGC script into a memory card image.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Root MGC script
    script: Option<PathBuf>,
    /// Template image the script is applied to
    #[clap(short, long)]
    input: Option<PathBuf>,
    /// Where the finished image is written
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// YAML address map used to translate `!loc` addresses
    #[clap(long)]
    map: Option<PathBuf>,
    /// Script compiled in place of the built-in initialization
    #[clap(long)]
    init: Option<PathBuf>,
    /// TOML project file supplying defaults for every other option
    #[clap(long)]
    project: Option<PathBuf>,
    /// Do not initialize the image before compiling
    #[clap(long)]
    noclean: bool,
    /// Only report errors
    #[clap(long)]
    silent: bool,
    /// Report every write
    #[clap(long)]
    debug: bool,
}

impl Args {
    fn merge(mut self, project: Project) -> Self {
        self.script = self.script.or(project.script);
        self.input = self.input.or(project.input);
        self.output = self.output.or(project.output);
        self.map = self.map.or(project.map);
        self.init = self.init.or(project.init);
        self.noclean |= project.noclean;
        self.silent |= project.silent;
        self.debug |= project.debug;
        self
    }
}

fn init_logger(args: &Args) {
    let level = if args.silent {
        "error"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<()> {
    let Some(script) = args.script.as_ref() else {
        bail!("no MGC script given");
    };

    let options = CompileOptions {
        skip_initialization: args.noclean,
        suppress_output: args.silent,
        verbose_diagnostics: args.debug,
        init_script: args.init.clone(),
        ..CompileOptions::default()
    };
    let mut compiler = Compiler::new(options);
    if let Some(map) = &args.map {
        let map = RegionMap::load(map)
            .with_context(|| format!("failed to load address map {}", map.display()))?;
        compiler = compiler.with_translator(Box::new(map));
    }

    let image = match &args.input {
        Some(input) => Image::from_template(input)?,
        None => {
            log::info!("No input GCI specified; writing raw data to file");
            Image::default()
        }
    };

    let compiled = compiler.compile(script, image, &mut LogSink)?;
    log::info!("Compile successful");

    match &args.output {
        Some(output) => {
            log::info!("Writing final GCI file");
            std::fs::write(output, compiled.image.as_bytes())
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        None => log::info!("No output GCI specified; no files will be written"),
    }
    Ok(())
}

fn main() {
    let mut args = Args::parse();
    let project = match &args.project {
        Some(path) => Project::new(path),
        None => Ok(Project::default()),
    };
    let project = match project {
        Ok(project) => project,
        Err(e) => {
            env_logger::init();
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    };
    args = args.merge(project);
    init_logger(&args);

    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
