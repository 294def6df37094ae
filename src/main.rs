use anyhow::Result;
use clap::Parser;
use fshare::cli::{Cli, Commands};
use fshare::{client, server};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { root, port } => {
            server::run_server(root, port).await?;
        }
        Commands::List { host, port } => {
            let lines = client::run_list(&format!("{}:{}", host, port)).await?;
            println!("--- Files on the server ---");
            for line in lines {
                println!("{}", line);
            }
        }
        Commands::Upload { file, host, port } => {
            let ack = client::run_upload(&format!("{}:{}", host, port), &file).await?;
            println!("Server response: {}", ack);
        }
        Commands::Download {
            name,
            host,
            port,
            dest,
        } => {
            let saved = client::run_download(&format!("{}:{}", host, port), &name, &dest).await?;
            println!("File saved as: {}", saved.display());
        }
    }

    Ok(())
}
