use crate::config::Config;
use crate::engine::EngineClient;

use std::time::Duration;

pub fn print_banner(config: &Config) {
    let ascii_art = format!(
        r#"
       __           __
  ____/ /___  _____/ /___   __(_)__ _      __
 / __  / __ \/ ___/ //_/ | / / / _ \ | /| / /
/ /_/ / /_/ / /__/ ,<  | |/ / /  __/ |/ |/ /
\__,_/\____/\___/_/|_| |___/_/\___/|__/|__/

dockview v{}
"#,
        config.get_version()
    );

    println!("{}", ascii_art);
}

/// Verify the engine is reachable before anything else starts.
/// Nothing useful can run without it, so the caller treats failure as fatal.
pub async fn check_engine(engine: &dyn EngineClient) -> Result<(), String> {
    let ping_result = tokio::time::timeout(Duration::from_secs(5), engine.ping()).await;

    match ping_result {
        Ok(Ok(())) => {
            tracing::info!("Container engine accessible");
            Ok(())
        }
        Ok(Err(e)) => {
            let error_msg = format!("Container engine not accessible: {}", e);
            tracing::error!("{}", error_msg);
            Err(error_msg)
        }
        Err(_) => {
            let error_msg = "Container engine ping timeout after 5 seconds".to_string();
            tracing::error!("{}", error_msg);
            Err(error_msg)
        }
    }
}
