use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use budilnik::appsettings;
use budilnik::assistant::remote::GeminiClient;
use budilnik::{Assistant, AlarmRegistry, LogAlertSink, TaskSchedulingGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();

    let gateway = TaskSchedulingGateway::new(Arc::new(LogAlertSink));
    let registry = AlarmRegistry::new(Box::new(gateway));
    let remote = Arc::new(GeminiClient::new(&settings.assistant)?);
    let assistant = Assistant::new(
        registry,
        remote,
        Duration::from_secs(settings.assistant.timeout_secs),
    );

    for message in assistant.transcript() {
        println!("assistant> {}", message.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = assistant.transcript().len();

    loop {
        print_prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let dispatched = assistant.send(&line);
        printed += 1; // the echoed user line needs no reprint

        if let Some(reply) = &dispatched.local_reply {
            println!("assistant> {reply}");
            printed += 1;
        }

        // The remote side settles on its own; for a line-based console the
        // simplest faithful rendering is to wait for it before prompting again.
        dispatched.settled().await;

        for message in &assistant.transcript()[printed..] {
            println!("assistant> {}", message.text);
        }
        printed = assistant.transcript().len();
    }

    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("you> ");
    let _ = std::io::stdout().flush();
}
