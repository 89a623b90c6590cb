use std::{env, process};

use serde_json::json;
use socialgraph::{
    config::LOG_ENV,
    client::{CommandLineConfig, run_command},
};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };
    if config.help {
        println!("{}", CommandLineConfig::help());
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    let outcome = runtime.block_on(async {
        let settings = config.settings()?;
        run_command(&config, &settings).await
    });
    match outcome {
        Ok(value) => println!("{value}"),
        Err(err) => {
            println!("{}", json!({ "error": err }));
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
