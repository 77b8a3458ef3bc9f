use chainops::cli::{self, Cli};
use clap::Parser;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(cli::run(cli)) {
        eprintln!("{}", console::style(format!("[{}] {}", e.kind(), e)).red());
        process::exit(1);
    }
}
