use roster_backend::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Configuration comes from the environment (see config.rs); the server
    // binds to BIND_ADDR or 127.0.0.1:3000 by default.
    app::run().await
}
