#[tokio::main]
async fn main() {
    // Startup failures are already logged by the framework layer.
    if duel_arena::run_with_config().await.is_err() {
        std::process::exit(1);
    }
}
