use clap::Parser;
use sirn::runner::{run, Cli};
use sirn::SirnError;

fn main() -> Result<(), SirnError> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}
