//! The interactive console.
//!
//! A readline loop for typing Bifrost commands straight at a controller.
//! Lines are tokenised with the same tokenizer as the wire, given a
//! generated tag, and sent through a Bifrost adapter; responses come back
//! packed, prefixed, and printed. A line left open (an unterminated quote,
//! a trailing escape) switches the prompt to `> ` until it is finished.
//!
//! ```text
//! $ auto shuffle
//! [R] ! AUTO shuffle
//! [R] 4c0f…e2 ACK OK success
//! $ tloadl 0 abc 'two
//! > lines'
//! ```
//!
//! Words starting with `/` are console commands, not Bifrost: `/quit`
//! shuts the controller down, and with it the daemon.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use skald_comm::{Client, CommError};
use skald_proto::{new_tag, Message, Tokenizer};

/// The console prompt.
const PROMPT_NORMAL: &str = "$ ";

/// The prompt shown while a line is still open.
const PROMPT_CONTINUE: &str = "> ";

/// Prefix for responses from the controller.
const PREFIX_MESSAGE: &str = "[R]";

/// Prefix for console-level errors.
const PREFIX_ERROR: &str = "[!]";

/// Runs the console until the user quits, the controller goes away, or
/// `ct` is cancelled.
///
/// The given client stays with the console for `/quit` shutdown; a copy of
/// it feeds the Bifrost adapter.
///
/// # Errors
///
/// [`CommError`] if the client can't supply a Bifrost adapter.
pub async fn run(mut client: Client, ct: CancellationToken) -> Result<(), CommError> {
    let for_adapter = client.copy(&ct).await?;
    let (adapter, mut bifrost) = for_adapter.bifrost(&ct).await?;
    tokio::spawn(adapter.run());

    // Readline blocks, so it lives on its own thread. Lines come in
    // through one channel; the prompt for the next read goes back through
    // another once the line has been tokenised, so the thread always
    // prompts with the continuation state known.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(1);
    let (prompt_tx, prompt_rx) = mpsc::channel::<&'static str>(1);
    std::thread::Builder::new()
        .name("skaldd-console".into())
        .spawn(move || read_lines(&line_tx, prompt_rx))
        .map_err(CommError::Io)?;

    let mut tokenizer = Tokenizer::new();
    loop {
        tokio::select! {
            _ = ct.cancelled() => break,

            // Broadcasts also land on the console's own client; drain
            // them, and notice the controller going away.
            response = client.recv() => {
                if response.is_none() {
                    println!("{PREFIX_ERROR} controller has shut down");
                    break;
                }
            }

            line = line_rx.recv() => match line {
                Some(line) => {
                    if !handle_raw_line(&mut tokenizer, &line, &bifrost, &client, &ct).await {
                        break;
                    }
                    let prompt = if tokenizer.in_progress() {
                        PROMPT_CONTINUE
                    } else {
                        PROMPT_NORMAL
                    };
                    if prompt_tx.send(prompt).await.is_err() {
                        break;
                    }
                }
                // Readline thread is gone: user interrupt or stdin closed.
                None => break,
            },

            message = bifrost.recv() => match message {
                Some(message) => print_message(&message),
                None => {
                    println!("{PREFIX_ERROR} controller has shut down");
                    break;
                }
            },
        }
    }

    debug!("console stopped");
    Ok(())
}

/// The blocking readline loop.
///
/// After sending each line it waits for the prompt to use next, which
/// doubles as the signal that the line has been consumed.
fn read_lines(line_tx: &mpsc::Sender<String>, mut prompt_rx: mpsc::Receiver<&'static str>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{PREFIX_ERROR} couldn't start readline: {e}");
            return;
        }
    };

    let mut prompt = PROMPT_NORMAL;
    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(&line);
                if line_tx.blocking_send(line).is_err() {
                    return;
                }
                match prompt_rx.blocking_recv() {
                    Some(next) => prompt = next,
                    None => return,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return,
            Err(e) => {
                eprintln!("{PREFIX_ERROR} readline failed: {e}");
                return;
            }
        }
    }
}

/// Tokenises one typed line and dispatches every complete command line in
/// it. Returns whether the console should keep running.
async fn handle_raw_line(
    tokenizer: &mut Tokenizer,
    line: &str,
    bifrost: &skald_comm::BifrostClient,
    client: &Client,
    ct: &CancellationToken,
) -> bool {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');

    for words in tokenizer.feed(&bytes) {
        if !handle_line(&words, bifrost, client, ct).await {
            return false;
        }
    }
    true
}

/// Interprets one tokenised line: a console command if it starts with `/`,
/// otherwise a tagless Bifrost message.
async fn handle_line(
    words: &[String],
    bifrost: &skald_comm::BifrostClient,
    client: &Client,
    ct: &CancellationToken,
) -> bool {
    let Some(first) = words.first() else {
        return true;
    };

    if let Some(command) = first.strip_prefix('/') {
        return handle_console_command(command, client, ct).await;
    }

    // The user doesn't type tags; generate one so replies correlate.
    let mut tagged = Vec::with_capacity(words.len() + 1);
    tagged.push(new_tag());
    tagged.extend_from_slice(words);

    match Message::from_line(&tagged) {
        Ok(message) => {
            if bifrost.send(message).await {
                true
            } else {
                println!("{PREFIX_ERROR} controller has shut down");
                false
            }
        }
        Err(e) => {
            println!("{PREFIX_ERROR} {e}");
            true
        }
    }
}

async fn handle_console_command(
    command: &str,
    client: &Client,
    ct: &CancellationToken,
) -> bool {
    match command {
        // Quitting the console takes the controller, and so the daemon,
        // down with it.
        "quit" => {
            if let Err(e) = client.shutdown(ct).await {
                println!("{PREFIX_ERROR} {e}");
            }
            false
        }
        _ => {
            println!("{PREFIX_ERROR} unknown console command: /{command}");
            true
        }
    }
}

/// Prints one packed response line with the message prefix.
fn print_message(message: &Message) {
    let packed = message.pack();
    // Drop the trailing newline; println adds its own.
    let text = String::from_utf8_lossy(&packed[..packed.len().saturating_sub(1)]);
    println!("{PREFIX_MESSAGE} {text}");
}
