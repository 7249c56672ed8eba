use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "talaria", version, about = "Talaria multimodal chat relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve,

    /// List the generative models available to the configured API key
    Models,
}
