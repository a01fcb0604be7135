//! Session persistence for ai.
//!
//! A session is the conversation history stored as a markdown file, one
//! `## <role>` section per message. Tool calls requested by the assistant
//! follow its text as a fenced `json` block; tool results use
//! `## tool <call id>` headings. Content lines that could be mistaken for
//! structure are escaped with a leading backslash.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::message::{Message, Role, ToolCall};

const TITLE: &str = "# ai session";
const FENCE: &str = "```";
const TOOL_CALLS_FENCE: &str = "```json";

/// Writes `messages` to `path`, replacing any existing file.
pub fn save(path: &Path, messages: &[Message]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, render(messages))
        .with_context(|| format!("Failed to write session to {}", path.display()))
}

/// Reads a session file written by [`save`].
pub fn load(path: &Path) -> Result<Vec<Message>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;
    parse(&text).with_context(|| format!("Malformed session file {}", path.display()))
}

fn escape(line: &str) -> String {
    if line.starts_with("## ") || line.starts_with(FENCE) || line.starts_with('\\') {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

fn unescape(line: &str) -> &str {
    line.strip_prefix('\\').unwrap_or(line)
}

pub fn render(messages: &[Message]) -> String {
    let mut out = format!("{TITLE}\n\n_Saved {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    for msg in messages {
        match (&msg.role, &msg.tool_call_id) {
            (Role::Tool, Some(id)) => out.push_str(&format!("\n## tool {id}\n\n")),
            (role, _) => out.push_str(&format!("\n## {role}\n\n")),
        }
        // split, not lines: keep blank and `\r`-ended lines verbatim
        for line in msg.content.split('\n') {
            out.push_str(&escape(line));
            out.push('\n');
        }
        if msg.has_tool_calls() {
            // serializing plain strings cannot fail
            let calls = serde_json::to_string_pretty(&msg.tool_calls).unwrap_or_default();
            out.push_str(&format!("\n{TOOL_CALLS_FENCE}\n{calls}\n{FENCE}\n"));
        }
    }
    // every section is followed by one blank line, the last one included
    out.push('\n');
    out
}

/// Message under construction while parsing.
struct Section {
    role: Role,
    tool_call_id: Option<String>,
    lines: Vec<String>,
    tool_calls: Vec<ToolCall>,
    /// Set once the tool call block is read; the content is complete.
    closed: bool,
}

impl Section {
    /// Drops the blank line after the heading and the one ending the
    /// content, and nothing else.
    fn finish(mut self) -> Message {
        if !self.closed {
            pop_separator(&mut self.lines);
        }
        if self.lines.first().is_some_and(|l| l.is_empty()) {
            self.lines.remove(0);
        }
        let content = self.lines.join("\n");
        Message {
            role: self.role,
            content,
            tool_calls: self.tool_calls,
            tool_call_id: self.tool_call_id,
        }
    }
}

fn pop_separator(lines: &mut Vec<String>) {
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
}

fn parse_heading(heading: &str) -> Result<(Role, Option<String>)> {
    let mut parts = heading.split_whitespace();
    let role = parts.next().unwrap_or_default();
    let Some(role) = Role::parse(role) else {
        bail!("unknown role '{role}'");
    };
    let id = parts.next().map(str::to_string);
    if role == Role::Tool && id.is_none() {
        bail!("tool result without a call id");
    }
    Ok((role, id.filter(|_| role == Role::Tool)))
}

pub fn parse(text: &str) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut current: Option<Section> = None;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut lines = text.split('\n');

    while let Some(line) = lines.next() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                messages.push(section.finish());
            }
            let (role, tool_call_id) = parse_heading(heading)?;
            current = Some(Section {
                role,
                tool_call_id,
                lines: Vec::new(),
                tool_calls: Vec::new(),
                closed: false,
            });
            continue;
        }

        let Some(section) = current.as_mut() else {
            // preamble before the first message
            continue;
        };

        if section.closed {
            // only separators follow a tool call block
            continue;
        }

        if line == TOOL_CALLS_FENCE {
            pop_separator(&mut section.lines);
            let mut block = String::new();
            for inner in lines.by_ref() {
                if inner == FENCE {
                    break;
                }
                block.push_str(inner);
                block.push('\n');
            }
            let calls: Vec<ToolCall> =
                serde_json::from_str(&block).context("invalid tool call block")?;
            section.tool_calls.extend(calls);
            section.closed = true;
            continue;
        }

        section.lines.push(unescape(line).to_string());
    }

    if let Some(section) = current {
        messages.push(section.finish());
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("Be brief."),
            Message::user("## not a heading\n```\ncode\n```\n\\backslash"),
            Message::assistant_with_tools(
                "Let me check.",
                vec![ToolCall::new("call_1", "echo", r#"{"text":"hi"}"#)],
            ),
            Message::tool_result("call_1", "hi"),
            Message::assistant("The tool said hi."),
        ]
    }

    #[test]
    fn saved_session_reloads_identically() {
        let dir = std::env::temp_dir().join(format!("ai_test_session_{}", std::process::id()));
        let path = dir.join("nested").join("chat.md");

        save(&path, &conversation()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, conversation());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rendered_layout() {
        let text = render(&conversation());
        assert!(text.starts_with("# ai session\n"));
        assert!(text.contains("\n## system\n\nBe brief.\n"));
        assert!(text.contains("\n\\## not a heading\n\\```\ncode\n\\```\n\\\\backslash\n"));
        assert!(text.contains("\n## tool call_1\n\nhi\n"));
        assert!(text.contains("```json\n["));
    }

    #[test]
    fn hand_written_session_parses() {
        let text = "# notes\n\nsome preamble\n\n## user\n\nhello\n\n## assistant\n\nhi there\n";
        let messages = parse(text).unwrap();
        assert_eq!(
            messages,
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[test]
    fn whitespace_and_blank_lines_survive_a_round_trip() {
        let messages = vec![
            Message::user("  indented question  "),
            Message::tool_result("call_1", "\n\nline after blanks\n\n"),
            Message::assistant_with_tools(
                "trailing newline\n",
                vec![ToolCall::new("call_2", "ls", "{}")],
            ),
            Message::tool_result("call_2", ""),
            Message::assistant("crlf\r\nend\n"),
        ];
        assert_eq!(parse(&render(&messages)).unwrap(), messages);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(parse("## narrator\n\nonce upon a time\n").is_err());
        assert!(parse("## tool\n\nmissing id\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load(Path::new("/nonexistent/ai/session.md")).is_err());
    }
}
