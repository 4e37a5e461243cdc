use axum::extract::{Path, State};
use axum::Json;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::chat::client::ChatError;
use crate::chat::conversation::{self, AskOutcome, IgnoreReason};
use crate::chat::{ConversationTurn, SuggestedPrompt};
use crate::session::Session;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Deserialize)]
pub(crate) struct AskBody {
    #[serde(default)]
    question: String,
    /// Supplied per request, never stored or logged.
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SuggestedBody {
    #[serde(default)]
    api_key: Option<String>,
}

/// GET /chat: the transcript for the current report
pub(crate) async fn get_transcript(State(state): State<AppState>) -> ApiResult {
    let session = state.claim_session()?;
    Ok(Json(json!({ "transcript": session.transcript() })))
}

/// DELETE /chat: drop the transcript, keep the report
pub(crate) async fn clear_transcript(State(state): State<AppState>) -> ApiResult {
    let mut session = state.claim_session()?;
    session.clear_transcript();
    tracing::info!("cleared chat transcript");
    Ok(Json(json!({ "transcript": Vec::<ConversationTurn>::new() })))
}

/// POST /chat/ask
pub(crate) async fn ask(State(state): State<AppState>, Json(body): Json<AskBody>) -> ApiResult {
    let mut session = state.claim_session()?;
    let outcome = conversation::ask(
        &mut session,
        state.chat_client.as_ref(),
        body.api_key.as_deref(),
        &body.question,
    )
    .await;
    respond(outcome, &session)
}

pub(crate) async fn list_suggested() -> Json<Value> {
    let prompts: Vec<Value> = SuggestedPrompt::ALL
        .iter()
        .map(|p| {
            json!({
                "id": p.slug(),
                "label": p.label(),
                "question": p.question(),
            })
        })
        .collect();
    Json(json!({ "prompts": prompts }))
}

/// POST /chat/suggested/{prompt}
pub(crate) async fn ask_suggested(
    State(state): State<AppState>,
    Path(prompt): Path<String>,
    Json(body): Json<SuggestedBody>,
) -> ApiResult {
    let prompt = SuggestedPrompt::from_slug(&prompt).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown suggested prompt: {prompt}") })),
        )
    })?;

    let mut session = state.claim_session()?;
    let outcome = conversation::ask_suggested(
        &mut session,
        state.chat_client.as_ref(),
        body.api_key.as_deref(),
        prompt,
    )
    .await;
    respond(outcome, &session)
}

fn respond(outcome: AskOutcome, session: &Session) -> ApiResult {
    let transcript = session.transcript();
    match outcome {
        AskOutcome::Answered(answer) => Ok(Json(json!({
            "answer": answer,
            "transcript": transcript,
        }))),
        AskOutcome::Ignored(reason) => {
            let error = match reason {
                IgnoreReason::EmptyQuestion => "question is empty",
                IgnoreReason::NoReport => "generate a report before asking about it",
            };
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": error, "transcript": transcript })),
            ))
        }
        AskOutcome::MissingCredential => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": ChatError::MissingCredential.to_string(),
                "guidance": ChatError::MissingCredential.guidance(),
                "transcript": transcript,
            })),
        )),
        AskOutcome::Failed(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": e.to_string(),
                "guidance": e.guidance(),
                "transcript": transcript,
            })),
        )),
    }
}
