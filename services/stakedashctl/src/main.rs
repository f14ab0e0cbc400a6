use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use view_ipc::{send_request, PageCommand, ViewRequest, ViewResponse, DEFAULT_SOCKET_PATH};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "VIEW_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Status,
    Stats,
    Thresholds,
    Ranges,
    /// Move the session's page cursor and print the resulting page.
    Page {
        #[command(subcommand)]
        nav: Nav,
    },
}

#[derive(Subcommand, Debug)]
enum Nav {
    Current,
    First,
    Last,
    Next,
    Prev,
    Goto { page: String },
}

fn to_request(command: Command) -> ViewRequest {
    match command {
        Command::Status => ViewRequest::Status,
        Command::Stats => ViewRequest::Stats,
        Command::Thresholds => ViewRequest::Thresholds,
        Command::Ranges => ViewRequest::Ranges,
        Command::Page { nav } => ViewRequest::Page(match nav {
            Nav::Current => PageCommand::Current,
            Nav::First => PageCommand::First,
            Nav::Last => PageCommand::Last,
            Nav::Next => PageCommand::Next,
            Nav::Prev => PageCommand::Previous,
            Nav::Goto { page } => PageCommand::JumpTo(page),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let req = to_request(cli.command);

    let resp = send_request(&cli.socket, &req).await?;
    if let ViewResponse::Error(msg) = &resp {
        bail!("stakedashd: {msg}");
    }
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
