use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::protocol::DEFAULT_PORT;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the file server
    Serve {
        /// Directory of shared files, created if missing
        #[arg(long, default_value = "server_files")]
        root: PathBuf,
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// List the files on the server
    List {
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Upload a local file to the server
    Upload {
        /// File to upload
        file: PathBuf,
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Download a file from the server
    Download {
        /// Name of the file on the server
        name: String,
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Directory to save the downloaded file in
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },
}
