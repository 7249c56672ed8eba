pub mod commands;

use crate::cli::commands::Commands;
use crate::config::AppConfig;
use crate::genai::gemini::GeminiClient;
use crate::genai::GenerativeModel;

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Models => {
            let client = GeminiClient::from_config(&config.gemini);

            match client.list_models().await {
                Ok(models) => {
                    if models.is_empty() {
                        println!("No models available.");
                    } else {
                        println!("{:<45} | {}", "Name", "Display Name");
                        println!("{:-<45}-+-{:-<30}", "", "");
                        for m in models {
                            println!("{:<45} | {}", m.name, m.display_name);
                        }
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }
}
