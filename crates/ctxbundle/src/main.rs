use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = ctxbundle::cli::Cli::parse();
    ctxbundle::init(cli.verbose)?;

    cli.run()
}
