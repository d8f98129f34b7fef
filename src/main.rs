use std::env;

use pillar3::api::{CliError, run_http_server, run_project_command};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("project") => {
            let args = std::iter::once("pillar3 project".to_string())
                .chain(raw_args.into_iter().skip(2));
            match run_project_command(args) {
                Ok(output) => println!("{output}"),
                Err(CliError::Args(e)) => e.exit(),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Usage: cargo run -- serve [port]");
            eprintln!("       cargo run -- project [--help]");
            std::process::exit(1);
        }
    }
}
