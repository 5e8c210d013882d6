//! Terminal shell: owns the session, renders one room and reads input.

use std::sync::Arc;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use kaiwa_shared::time::to_jst_clock;

use crate::{
    config::ClientConfig,
    domain::{AppendOutcome, HistoryApi, HistoryMerge, Message, UserId},
    error::ClientError,
    infrastructure::{history::HttpHistoryClient, transport::WebSocketConnector},
    session::{CredentialStore, Session},
    usecase::{HistoryLoadState, RoomContext, RoomUpdate, RoomView, RoomViewError},
};

const PROMPT: &str = "> ";

const HELP: &str = "\
Commands:
  /older   load older messages
  /help    show this help
  /quit    leave the room
Anything else is sent to the room.";

/// What the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Send(String),
    LoadOlder,
    Help,
    Quit,
    Empty,
}

pub fn parse_input(line: &str) -> ShellCommand {
    match line.trim() {
        "" => ShellCommand::Empty,
        "/quit" | "/exit" => ShellCommand::Quit,
        "/older" => ShellCommand::LoadOlder,
        "/help" => ShellCommand::Help,
        _ => ShellCommand::Send(line.to_string()),
    }
}

/// One rendered line (two when a translation is present).
pub fn render_message(message: &Message, me: UserId) -> String {
    let who = if message.sender_id == me {
        "you".to_string()
    } else {
        format!("user {}", message.sender_id)
    };
    let mut line = format!(
        "[{}] {}: {}",
        to_jst_clock(message.created_at.value()),
        who,
        message.content
    );
    if message.unread_count > 0 {
        line.push_str(&format!(" ({} unread)", message.unread_count));
    }
    if let Some(translated) = &message.translated_content {
        line.push_str(&format!("\n        > {translated}"));
    }
    line
}

enum Input {
    Line(String),
    Quit,
    Failed(String),
}

/// Read lines on a blocking thread; rustyline owns the terminal.
fn spawn_input() -> mpsc::UnboundedReceiver<Input> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = tx.send(Input::Failed(e.to_string()));
                return;
            }
        };
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if tx.send(Input::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    let _ = tx.send(Input::Quit);
                    break;
                }
                Err(e) => {
                    let _ = tx.send(Input::Failed(e.to_string()));
                    break;
                }
            }
        }
    });
    rx
}

/// Connect, open the configured room and run until the user quits, the room
/// closes or the connection drops. The session is disconnected on the way out.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let credentials = CredentialStore::new();
    credentials.set(config.credential);

    let session = Session::new(
        config.session,
        Arc::new(WebSocketConnector::new()),
        credentials.clone(),
    );
    session.connect().await?;

    let history: Arc<dyn HistoryApi> =
        Arc::new(HttpHistoryClient::new(&config.history, credentials));
    let result = run_room(&session, history, config.room).await;

    session.disconnect().await;
    result
}

enum Event {
    Update(Option<RoomUpdate>),
    Input(Option<Input>),
}

async fn run_room(
    session: &Session,
    history: Arc<dyn HistoryApi>,
    context: RoomContext,
) -> Result<(), ClientError> {
    let me = context.sender_id;
    let mut view = RoomView::open(session.handle(), history, context).await?;

    println!(
        "Joined room {} ({}). Type /help for commands.",
        view.context().room_id,
        view.context().conversation_type
    );
    if let HistoryLoadState::Failed(e) = view.load_state() {
        println!("Could not load history: {e}");
    }
    render_snapshot(&view, me);

    let mut input = spawn_input();
    loop {
        let event = tokio::select! {
            update = view.next_update() => Event::Update(update),
            line = input.recv() => Event::Input(line),
        };

        match event {
            Event::Update(Some(update)) => {
                if !render_update(&view, me, update) {
                    return Ok(());
                }
            }
            Event::Update(None) => return Ok(()),
            Event::Input(Some(Input::Line(line))) => match parse_input(&line) {
                ShellCommand::Send(content) => {
                    if let Err(e) = view.send(content) {
                        println!("Failed to send: {e}");
                    }
                }
                ShellCommand::LoadOlder => match view.load_older().await {
                    Ok(HistoryMerge::Applied { inserted }) => {
                        println!("Loaded {inserted} older message(s).");
                        render_snapshot(&view, me);
                    }
                    Ok(HistoryMerge::Discarded { .. }) => {}
                    Err(RoomViewError::NoMoreHistory) => println!("No older messages."),
                    Err(e) => println!("Could not load history: {e}"),
                },
                ShellCommand::Help => println!("{HELP}"),
                ShellCommand::Quit => return Ok(()),
                ShellCommand::Empty => {}
            },
            Event::Input(Some(Input::Quit) | None) => return Ok(()),
            Event::Input(Some(Input::Failed(e))) => return Err(ClientError::Input(e)),
        }
    }
}

fn render_snapshot(view: &RoomView, me: UserId) {
    for message in view.snapshot() {
        println!("{}", render_message(message, me));
    }
}

/// Print one update. Returns `false` when the room can no longer be used.
fn render_update(view: &RoomView, me: UserId, update: RoomUpdate) -> bool {
    match update {
        RoomUpdate::Message(AppendOutcome::Inserted { position }) => {
            if let Some(message) = view.snapshot().get(position) {
                println!("{}", render_message(message, me));
            }
            true
        }
        RoomUpdate::Evicted(notice) => {
            println!(
                "Room \"{}\" was closed: {}",
                notice.room_name, notice.reason_label
            );
            false
        }
        RoomUpdate::TransportLost => {
            println!("Connection lost.");
            false
        }
        RoomUpdate::Message(_)
        | RoomUpdate::UnreadCounts { .. }
        | RoomUpdate::ReadStatus { .. }
        | RoomUpdate::Dropped
        | RoomUpdate::Ignored
        | RoomUpdate::Resubscribed => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::tests::message;

    #[test]
    fn test_parse_input() {
        // テスト項目: 入力行がコマンドまたは送信メッセージとして解釈される
        // then (期待する結果):
        assert_eq!(parse_input("/quit"), ShellCommand::Quit);
        assert_eq!(parse_input(" /older "), ShellCommand::LoadOlder);
        assert_eq!(parse_input("/help"), ShellCommand::Help);
        assert_eq!(parse_input("   "), ShellCommand::Empty);
        assert_eq!(
            parse_input("hello"),
            ShellCommand::Send("hello".to_string())
        );
    }

    #[test]
    fn test_render_message() {
        // テスト項目: メッセージが JST の時刻・送信者・未読数付きで表示される
        // given (前提条件):
        let mut message = message(1, 1);
        message.translated_content = Some("メッセージ 1".to_string());

        // when (操作):
        let rendered = render_message(&message, UserId::new(3).unwrap());
        let own = render_message(&message, UserId::new(1).unwrap());

        // then (期待する結果):
        assert_eq!(
            rendered,
            "[18:00] user 1: message 1 (2 unread)\n        > メッセージ 1"
        );
        assert!(own.starts_with("[18:00] you: "));
    }
}
