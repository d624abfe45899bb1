use std::sync::Arc;

use greeter_core::config::Config;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), greeter_core::Error> {
    greeter_core::logging::init("greeter")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!(error = %e, "❌ invalid configuration");
            return Err(e);
        }
    };

    if let Err(e) = greeter_telegram::router::run_polling(cfg).await {
        error!(error = %format!("{e:#}"), "❌ bot failed");
        return Err(greeter_core::Error::External(format!("telegram bot failed: {e}")));
    }

    Ok(())
}
