// packline - entry point

use packline::cli::CliHandler;
use packline::utils::PackUI;

#[tokio::main]
async fn main() {
    let handler = CliHandler::new();

    if let Err(e) = handler.run().await {
        PackUI::new().show_error(&e);
        std::process::exit(1);
    }
}
