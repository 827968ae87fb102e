use reqwest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub async fn generate_openai_prompt(
    prompt: &str,
    prompt_type: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let system_message = match prompt_type {
        "schedule_extraction" => {
            "我想你把輸入語句分析成 年月日時分開始結束及目的。\
             例如 \"{2025,11,28,3:00,4:00,開會}\"，時間以 24 小時制。\
             語句前會寫出當前的年月日時分並以 Now 作開頭，像 Now:2025-11-28 14:28。\
             然後會接著語句 Now:2025-11-28 14:28, 明天上午 10點到 11點開會。\
             這樣你應該用這種格式回應: {2025,11,29,10:00,11:00,開會}。\
             如果語句不能完整編成 年月日時分開始結束及目的，則回傳 {None}。\
             其他語句依此類推。"
        }
        _ => return Err("Not a valid base prompt".to_string().into()),
    };

    query_openai(system_message, prompt, api_key).await
}

async fn query_openai(
    system_message: &str,
    prompt: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let request: OpenAIRequest = OpenAIRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: system_message.to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ],
        max_tokens: 200,
        temperature: 0.0,
    };

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?; // read the body once

    if !status.is_success() {
        log::warn!(target: "parser", "OpenAI error {}: {}", status, text);
        return Err(format!("Request failed with status {}", status).into());
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;

    if let Some(choice) = parsed.choices.first() {
        Ok(choice.message.content.clone())
    } else {
        Err("No response from OpenAI".to_string().into())
    }
}
