//! Prompt input: positional arguments, piped stdin and `$EDITOR`.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{IsTerminal, Read, Write};
use std::process::{Command, Stdio};

const TTY_PATH: &str = "/dev/tty";

/// Joins positional arguments and, when stdin is piped, its contents.
pub fn gather_input(args: &[String]) -> Result<String> {
    let prompt = args.join(" ");
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(prompt);
    }
    let mut piped = String::new();
    stdin
        .lock()
        .read_to_string(&mut piped)
        .context("Failed to read piped stdin")?;
    Ok(join_piped(prompt, piped))
}

pub(super) fn join_piped(prompt: String, piped: String) -> String {
    match (prompt.is_empty(), piped.is_empty()) {
        (_, true) => prompt,
        (true, false) => piped,
        (false, false) => format!("{prompt}\n\n---\n{piped}"),
    }
}

/// Lets the user edit `content` in `editor` and returns the saved text.
///
/// `editor` may carry arguments (`code --wait`). When stdin was piped the
/// editor is attached to the controlling terminal instead.
pub fn open_editor(editor: &str, content: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("ai-prompt-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create prompt file")?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.flush())
        .context("Failed to write prompt file")?;

    let mut parts = editor.split_whitespace();
    let program = parts.next().context("Editor command is empty")?;
    let stdin = if std::io::stdin().is_terminal() {
        Stdio::inherit()
    } else {
        File::open(TTY_PATH).map(Stdio::from).unwrap_or_else(|_| Stdio::inherit())
    };
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .stdin(stdin)
        .status()
        .with_context(|| format!("failed to run editor {editor:?}"))?;
    if !status.success() {
        bail!("editor {editor:?} exited with {status}");
    }

    std::fs::read_to_string(file.path()).context("Failed to read prompt file")
}

/// Checks that the REPL can reach a terminal.
///
/// Piped stdin has been consumed as initial context by now, so the REPL
/// reads from the controlling terminal instead.
pub fn ensure_terminal() -> Result<()> {
    if std::io::stdin().is_terminal() {
        return Ok(());
    }
    File::open(TTY_PATH)
        .map(drop)
        .context("failed to open /dev/tty for interactive mode (was stdin piped?)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piped_input_follows_separator() {
        assert_eq!(join_piped("summarize".into(), "text".into()), "summarize\n\n---\ntext");
        assert_eq!(join_piped(String::new(), "text".into()), "text");
        assert_eq!(join_piped("q".into(), String::new()), "q");
    }

    #[test]
    fn editor_output_becomes_the_prompt() {
        let edited = open_editor("sed -i s/draft/final/", "draft prompt\n").unwrap();
        assert_eq!(edited, "final prompt\n");
    }

    #[test]
    fn untouched_buffer_is_returned_as_is() {
        assert_eq!(open_editor("true", "keep me").unwrap(), "keep me");
    }

    #[test]
    fn missing_terminal_names_dev_tty() {
        // Depends on how the test runner was started; only the error shape is fixed.
        if let Err(err) = ensure_terminal() {
            assert!(format!("{err:#}").contains("/dev/tty"));
        }
    }

    #[test]
    fn failing_editor_is_an_error() {
        let err = open_editor("false", "x").unwrap_err();
        assert!(err.to_string().contains("exited with"));
        assert!(open_editor("   ", "x").is_err());
        assert!(open_editor("ai-no-such-editor-xyz", "x").is_err());
    }
}
