use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use colored::Colorize;
use futures::executor::block_on;
use gabarit::{copy_from_config, preview::preview_as_tree, prompt, reconcile};

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("copy")
                .about("Copies files from src to dist following the rules of a config file")
                .arg(
                    Arg::new("config")
                        .help("path to the gabarit.toml config")
                        .required(true),
                )
                .arg(
                    Arg::new("dry-run")
                        .help("compute the result without writing anything")
                        .long("dry-run")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("yes")
                        .help("write without asking for confirmation")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("migrate")
                        .help("remove renamed files from their old location (src must equal dist)")
                        .long("migrate")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("preview")
                .about("Shows the files a config would produce")
                .arg(
                    Arg::new("config")
                        .help("path to the gabarit.toml config")
                        .required(true),
                ),
        )
        .get_matches();

    init_logger(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("copy", args)) => handle_copy(args),
        Some(("preview", args)) => handle_preview(args),
        _ => unreachable!(),
    }
}

/// `info` by default: the `debug` config option reports through `log::info!`.
fn init_logger(is_verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if is_verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }

    builder.init();
}

fn handle_copy(args: &ArgMatches) -> miette::Result<()> {
    let config = args.get_one::<String>("config").expect("config required");
    let dry_run = args.get_flag("dry-run");
    let confirm = !args.get_flag("yes");
    let migrate = args.get_flag("migrate");

    let mut wants_write = false;

    let outcome = block_on(copy_from_config(config, |options| {
        wants_write = options.write && !dry_run;
        let migrate = options.enable_migrate_mode || migrate;

        // with confirmation, flushing waits until the preview was accepted
        options
            .enable_migrate_mode(migrate)
            .write(wants_write && !confirm)
    }))?;

    if !wants_write || confirm {
        preview_as_tree(&outcome, &outcome.dist);
    }

    if !wants_write || outcome.written {
        return Ok(());
    }

    if prompt::apply_changes()? {
        reconcile::write_to_disk(&outcome.files, &outcome.migrated, &outcome.dist)?;
    } else {
        println!("{}", "canceled, nothing was written".yellow());
    }

    Ok(())
}

fn handle_preview(args: &ArgMatches) -> miette::Result<()> {
    let config = args.get_one::<String>("config").expect("config required");

    let outcome = block_on(copy_from_config(config, |options| options.write(false)))?;

    preview_as_tree(&outcome, &outcome.dist);

    Ok(())
}
