//! bucketkv CLI Client
//!
//! Command-line interface for interacting with bucketkv.

use bucketkv::network::Client;
use bucketkv::protocol::Response;
use clap::{Parser, Subcommand};

/// bucketkv CLI
#[derive(Parser, Debug)]
#[command(name = "bucketkv-cli")]
#[command(about = "CLI for the bucketkv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    /// Bucket path, outermost first (repeat for nesting: -b a -b b)
    #[arg(short, long = "bucket", global = true)]
    bucket: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a bucket inside the bucket path (at the root if no path)
    CreateBucket {
        /// Name of the new bucket
        name: String,
    },

    /// Delete a bucket and everything inside it
    DeleteBucket {
        /// Name of the bucket to delete
        name: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();
    let path: Vec<Vec<u8>> = args.bucket.iter().map(|b| b.as_bytes().to_vec()).collect();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match &args.command {
        Commands::CreateBucket { name } => client.create_bucket(&path, name.as_bytes()),
        Commands::DeleteBucket { name } => client.delete_bucket(&path, name.as_bytes()),
        Commands::Get { key } => client.get_key(&path, key.as_bytes()),
        Commands::Set { key, value } => client.set_key(&path, key.as_bytes(), value.as_bytes()),
        Commands::Del { key } => client.delete(&path, key.as_bytes()),
        Commands::Ping => client.ping(),
    };

    match result {
        Ok(response) => print_response(response),
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_response(response: Response) {
    match response.into_result() {
        Ok(Some(value)) => println!("{}", String::from_utf8_lossy(&value)),
        Ok(None) => println!("OK"),
        Err(message) => {
            eprintln!("(error) {}", message);
            std::process::exit(2);
        }
    }
}
