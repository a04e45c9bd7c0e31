//! CLI Status Command
//!
//! Prints the health report of a running relay.

use anyhow::Result;

pub async fn run(server: &str) -> Result<()> {
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/health", server.trim_end_matches('/')))
        .send()
        .await
    {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("Manasik is not running at {server}");
        }
    }
    Ok(())
}
