use clap::Parser;
use log::{debug, LevelFilter};

mod args;
mod calc;

fn main() {
    let args = args::Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    if let Err(e) = calc::run_apportionment(&args) {
        calc::report_error(&e);
        std::process::exit(1);
    }
}
