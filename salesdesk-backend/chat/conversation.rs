use super::client::{ChatClient, ChatError, ChatMessage};
use super::{Role, SuggestedPrompt};
use crate::session::Session;

/// Why an `ask` did nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyQuestion,
    NoReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// Nothing was recorded and nothing was sent.
    Ignored(IgnoreReason),
    /// No credential: the call was not attempted and nothing was recorded.
    MissingCredential,
    /// The question and the answer were both recorded.
    Answered(String),
    /// The question was recorded, the answer was not.
    Failed(ChatError),
}

pub fn system_prompt(report_text: &str) -> String {
    format!(
        "You are a helpful sales data analyst assistant. You have access to this sales report data:\n\
         \n\
         {report_text}\n\
         \n\
         Answer questions about this data in a clear, concise, and actionable way. \
         Provide specific numbers when relevant. Be friendly and professional."
    )
}

/// Ask the assistant about the current report.
///
/// The user's turn is appended before the call and stays in the transcript
/// if the call fails; an assistant turn is appended only on success.
pub async fn ask(
    session: &mut Session,
    client: &dyn ChatClient,
    api_key: Option<&str>,
    question: &str,
) -> AskOutcome {
    if question.trim().is_empty() {
        return AskOutcome::Ignored(IgnoreReason::EmptyQuestion);
    }
    let Some(report_text) = session.report_text().filter(|t| !t.is_empty()) else {
        return AskOutcome::Ignored(IgnoreReason::NoReport);
    };
    let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
        return AskOutcome::MissingCredential;
    };

    let system = ChatMessage::new("system", system_prompt(report_text));
    session.push_turn(Role::User, question.to_string());

    let mut messages = Vec::with_capacity(session.transcript().len() + 1);
    messages.push(system);
    messages.extend(
        session
            .transcript()
            .iter()
            .map(|turn| ChatMessage::new(turn.role.as_str(), turn.content.clone())),
    );

    tracing::info!(turns = session.transcript().len(), "asking assistant about report");

    match client.complete(api_key, &messages).await {
        Ok(answer) => {
            session.push_turn(Role::Assistant, answer.clone());
            AskOutcome::Answered(answer)
        }
        Err(e) => {
            tracing::warn!(error = %e, "assistant call failed");
            AskOutcome::Failed(e)
        }
    }
}

pub async fn ask_suggested(
    session: &mut Session,
    client: &dyn ChatClient,
    api_key: Option<&str>,
    prompt: SuggestedPrompt,
) -> AskOutcome {
    ask(session, client, api_key, prompt.question()).await
}
