//! The binary ans.

use ans_cli::*;

fn main() {
    let args = <Args as clap::Parser>::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    tracing::debug!(?args);

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(args, &mut stdout) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
