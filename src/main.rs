use color_eyre::owo_colors::OwoColorize;
use driveup::{
    auth::CredentialManager,
    cli::{run, Args},
    config::Config,
    init_sentry,
    prompt::TerminalPrompter,
    setup,
};

#[macro_use]
extern crate tracing;

fn main() -> color_eyre::Result<()> {
    let args = Args::parse();
    setup();
    let _sentry = init_sentry();

    if !args.ignored.is_empty() {
        warn!(ignored = ?args.ignored, "Only one file is uploaded per run, ignoring the rest");
    }

    let config = Config::from_env()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    println!(
        "\n({} options are highlighted, press enter to accept them)\n",
        "Default".cyan()
    );

    let mut prompter = TerminalPrompter::default();
    let result = runtime.block_on(run(&mut prompter, &args, &config, || async {
        Ok::<_, color_eyre::Report>(CredentialManager::new(&config).obtain_client().await?)
    }));

    match result {
        Ok(Some(outcome)) => {
            info!(id = %outcome.id, action = %outcome.action, "Uploaded");
            println!("{}", "> Success.\n".green().bold());
        }
        Ok(None) => println!("{}", "Aborted.\n".red().bold()),
        Err(e) => {
            debug!(?e, "Error uploading");
            eprintln!("\n{} {e:#}\n", "Error!".red().bold());
            std::process::exit(1);
        }
    }

    Ok(())
}
