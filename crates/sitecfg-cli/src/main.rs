//! `sitecfg` binary entry point

use sitecfg_cli::{cli, failure_message, init_tracing, leaf_command, run};

#[tokio::main]
async fn main() {
    let matches = cli::build().get_matches();
    let (_, leaf) = leaf_command(&matches);
    init_tracing(leaf.get_flag("log-json"));

    match run(&matches).await {
        Ok(text) => {
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Err(err) => {
            eprintln!("error: {}", failure_message(&err));
            std::process::exit(1);
        }
    }
}
