#[tokio::main]
async fn main() {
    if let Err(e) = boxprompt_lib::run().await {
        tracing::error!(error = %e, "boxprompt exited with error");
        eprintln!("boxprompt: {e}");
        std::process::exit(1);
    }
}
