//! Hello Client — the simplest possible task runtime client.
//!
//! Creates a task on a remote agent's `echo` skill and polls it to
//! completion.
//!
//! Run the echo agent first:
//! ```sh
//! cargo run -p a2a-runtime --example echo_agent --features server
//! ```
//!
//! Then in another terminal:
//! ```sh
//! cargo run -p a2a-runtime --example client --features client
//! ```

use a2a_runtime::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = ClientBuilder::new("http://localhost:3000").build().await?;

    let card = client.card().expect("card fetched by ClientBuilder::build");
    println!("Connected to: {} (v{})", card.name, card.version);
    if let Some(description) = &card.description {
        println!("Description: {description}");
    }
    println!("Skills:");
    for skill in &card.skills {
        println!("  - {} (streaming: {})", skill.id, skill.streaming);
    }
    println!();

    let response = client
        .create_task(CreateTaskRequest {
            message: TaskMessage {
                role: "user".to_string(),
                content: json!({ "text": "Hello from a2a-runtime!" }),
            },
            skill_id: "echo".to_string(),
            context_id: None,
            metadata: None,
        })
        .await?;
    println!("Task created: {} ({})", response.task_id, response.status);

    let task = client.wait_for_task(&response.task_id, 5_000).await?;
    println!("Final status: {}", task.status);
    if let Some(result) = task.result {
        println!("Output: {}", result.output);
    }
    if let Some(error) = task.error {
        println!("Error: {} ({})", error.message, error.code);
    }

    Ok(())
}
