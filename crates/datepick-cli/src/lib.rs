pub mod cli;
pub mod script;
pub mod text;

use std::ffi::OsString;

use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting datepick CLI"
    );

    let source = cli::resolve_config_path(cli.config.as_deref())?;
    debug!(?source, "resolved picker file");
    let file = cli::load_picker_file(&source)?;

    let mut commands = match &cli.script {
        Some(path) => script::load_script(path)?,
        None => Vec::new(),
    };
    commands.extend(script::parse_script(&cli.rest.join(" "))?);

    let session = script::Session::open(&file, cli.today, cli.format)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    session.run(&commands, &mut out)
}
