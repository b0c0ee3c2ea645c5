use std::fs;
use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Parser;
use serde_json::Value;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use dendrite::commands::Cli;
use dendrite::commands::Commands;
use dendrite_daemon::DaemonConfig;
use dendrite_daemon::start_daemon;
use dendrite_ipc::ClientError;
use dendrite_ipc::DaemonClient;
use dendrite_ipc::Event;
use dendrite_ipc::error_codes::{self, ErrorCategory};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &ClientError) -> i32 {
    match error {
        ClientError::Rpc { code, .. } => match error_codes::category_for_code(*code) {
            ErrorCategory::InvalidInput => 64, // EX_USAGE
            ErrorCategory::NotFound => 69,     // EX_UNAVAILABLE
            ErrorCategory::External | ErrorCategory::Internal => 74, // EX_IOERR
        },
        ClientError::DaemonNotRunning => 69,
        _ => 1,
    }
}

/// Parse an argument as inline JSON, or read the file after a '@'.
fn json_arg(arg: &str) -> Result<Value, ClientError> {
    let text = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}

fn run() -> Result<(), ClientError> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Daemon) {
        return start_daemon(DaemonConfig::from_env()).map_err(|e| {
            eprintln!("Suggestion: {}", e.suggestion());
            ClientError::Rpc {
                code: e.code(),
                message: e.to_string(),
            }
        });
    }

    let mut client = match DaemonClient::connect() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Is the daemon running? Start it with: dendrite daemon");
            return Err(e);
        }
    };

    match cli.command {
        Commands::Daemon => unreachable!("handled above"),

        Commands::Launch { client_id, config } => {
            let config = json_arg(&config)?;
            let result = client.call(
                "launch",
                Some(json!({ "client_id": client_id, "config": config })),
            )?;
            print_result(&result);
        }

        Commands::Status { pid } => {
            let result = client.call("status", Some(json!({ "pid": pid })))?;
            print_result(&result);
        }

        Commands::Terminate { pid } => {
            let result = client.call("terminate", Some(json!({ "pid": pid })))?;
            print_result(&result);
        }

        Commands::Sims => {
            let result = client.call("sims", None)?;
            print_result(&result);
        }

        Commands::Push {
            data_channel_id,
            payload,
        } => {
            let payload = json_arg(&payload)?;
            let result = client.call(
                "push",
                Some(json!({ "data_channel_id": data_channel_id, "payload": payload })),
            )?;
            print_result(&result);
        }

        Commands::Command { pid, name, params } => {
            let params = json_arg(&params)?;
            let result = client.call(
                "sim_command",
                Some(json!({ "pid": pid, "command": name, "params": params })),
            )?;
            print_result(&result);
        }

        Commands::FetchArtifact {
            client_id,
            filename,
            output,
        } => {
            let result = client.call(
                "fetch_artifact",
                Some(json!({ "client_id": client_id, "filename": filename })),
            )?;
            let encoded = result["content_base64"].as_str().unwrap_or_default();
            let bytes = BASE64
                .decode(encoded)
                .map_err(|_| ClientError::InvalidResponse)?;
            match output {
                Some(path) => fs::write(&path, bytes)?,
                None => std::io::stdout().write_all(&bytes)?,
            }
        }

        Commands::Watch {
            data_channel_id,
            register,
        } => {
            if let Some(client_id) = register {
                client.call("register_client", Some(json!({ "client_id": client_id })))?;
            }
            client.call(
                "join_channel",
                Some(json!({ "data_channel_id": data_channel_id })),
            )?;
            eprintln!("watching channel {} (ctrl-c to stop)", data_channel_id);
            loop {
                let Event::SimulationData { payload, .. } = client.read_event()?;
                println!("{}", payload);
            }
        }
    }

    Ok(())
}

fn print_result(result: &Value) {
    match serde_json::to_string_pretty(result) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", result),
    }
}
