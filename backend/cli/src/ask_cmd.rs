//! CLI Ask Command
//!
//! Sends one user turn to a running relay and prints the answer.

use anyhow::{bail, Context, Result};

use manasik_core::Turn;
use manasik_gateway::{ChatReply, ChatRequest};

pub async fn run(server: &str, session_id: &str, reset: bool, question: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let reply: ChatReply = client
        .post(format!("{}/chat", server.trim_end_matches('/')))
        .json(&question_request(session_id, reset, question))
        .send()
        .await
        .with_context(|| format!("Manasik is not reachable at {server}"))?
        .error_for_status()?
        .json()
        .await
        .context("Unexpected reply from Manasik")?;

    println!("{}", answer(reply)?);
    Ok(())
}

fn question_request(session_id: &str, reset: bool, question: &str) -> ChatRequest {
    ChatRequest {
        session_id: session_id.to_string(),
        messages: vec![Turn::user(question)],
        reset_session: reset,
    }
}

/// A relay failure arrives with HTTP 200, so it is surfaced as an error here.
fn answer(reply: ChatReply) -> Result<String> {
    match reply {
        ChatReply::Response { response } => Ok(response),
        ChatReply::Error { error } => bail!("{error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_request_wire_shape() {
        let body = serde_json::to_value(question_request("s1", true, "What is Sa'i?")).unwrap();
        assert_eq!(
            body,
            json!({
                "session_id": "s1",
                "messages": [{"role": "user", "content": "What is Sa'i?"}],
                "reset_session": true
            })
        );
    }

    #[test]
    fn test_relay_error_fails_the_command() {
        let ok = answer(ChatReply::Response {
            response: "Walking between Safa and Marwah.".into(),
        });
        assert_eq!(ok.unwrap(), "Walking between Safa and Marwah.");

        let err = answer(ChatReply::Error {
            error: "The service is currently busy. Please try again later.".into(),
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The service is currently busy. Please try again later."
        );
    }
}
