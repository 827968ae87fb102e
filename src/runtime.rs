use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use warp::Filter;

use crate::service::assistant::{Assistant, ConversationState, WELCOME_TEXT};

/// Callers that do not identify their conversation share this one.
const DEFAULT_CONVERSATION: &str = "default";

type ConversationStore = Arc<Mutex<HashMap<String, ConversationState>>>;

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    text: String,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct BotReply {
    text: String,
}

pub async fn run_api(assistant: Arc<Assistant>, port: u16) {
    let conversations: ConversationStore = Arc::new(Mutex::new(HashMap::new()));

    let welcome = warp::path!("api" / "welcome").and(warp::get()).map(|| {
        warp::reply::json(&BotReply {
            text: WELCOME_TEXT.to_string(),
        })
    });

    let message = warp::path!("api" / "message")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_assistant(assistant))
        .and(with_conversations(conversations))
        .and_then(handle_message);

    // Dev frontends speak from another origin.
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    let routes = welcome.or(message).with(cors);
    log::info!(target: "http", "serving on 0.0.0.0:{port}");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

fn with_assistant(
    assistant: Arc<Assistant>,
) -> impl Filter<Extract = (Arc<Assistant>,), Error = Infallible> + Clone {
    warp::any().map(move || assistant.clone())
}

fn with_conversations(
    conversations: ConversationStore,
) -> impl Filter<Extract = (ConversationStore,), Error = Infallible> + Clone {
    warp::any().map(move || conversations.clone())
}

async fn handle_message(
    msg: IncomingMessage,
    assistant: Arc<Assistant>,
    conversations: ConversationStore,
) -> Result<impl warp::Reply, Infallible> {
    let key = msg
        .conversation_id
        .unwrap_or_else(|| DEFAULT_CONVERSATION.to_string());
    log::info!(target: "http", "message for {key}: {:?}", msg.text);

    // The state leaves the map for the duration of the turn so the lock is
    // never held across the scheduling attempt.
    let mut state = conversations.lock().await.remove(&key).unwrap_or_default();
    let reply = assistant.handle_message(&mut state, &msg.text).await;
    conversations.lock().await.insert(key, state);

    log::info!(target: "http", "reply: {reply:?}");
    Ok(warp::reply::json(&BotReply { text: reply }))
}
