/// Command line interface
use clap::{Arg, ColorChoice, Command};
use std::path::PathBuf;

pub fn new() -> Command {
    Command::new("auth-service")
        .about("Account registration, login and token rotation service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("path")
                .long("path")
                .help("Directory holding the config env file")
                .default_value(".")
                .env("CONFIG_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("Config env file name")
                .default_value(".env")
                .env("CONFIG_NAME"),
        )
}
