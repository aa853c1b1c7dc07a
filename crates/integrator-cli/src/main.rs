use anyhow::Result;
use integrator_cli::{build_command, options_from_matches, run, ConsoleNotifier};
use integrator_core::{init_tracing, init_tracing_with};

fn main() -> Result<()> {
    // Parse command line arguments
    let matches = build_command().get_matches();
    let options = options_from_matches(&matches);

    // Initialize logging
    if options.debug {
        init_tracing_with("integrator_core=debug,integrator_cli=debug");
    } else {
        init_tracing();
    }

    let notifier = if options.quiet {
        ConsoleNotifier::quiet()
    } else {
        ConsoleNotifier::new()
    };

    if options.config.dry_run {
        println!("Dry run: no files will be written");
    }

    let summary = run(&options, &notifier)?;
    println!("{summary}");

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
