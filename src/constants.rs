//! Centralized constants for ai.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output, directory paths, and MCP `clientInfo`.
pub const APP_NAME: &str = "ai";

/// Default LLM model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 4096;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// System prompt used when agent mode is on and none is configured.
pub const AGENT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools.\n\
IMPORTANT GUIDELINES FOR TOOL USE:\n\
1. Use tools only when needed. For general conversation or greetings, do not use tools.\n\
2. FORMATTING IS CRITICAL: When calling a tool, use ONLY the tool name (e.g., 'get_weather').\n\
   NEVER append JSON arguments to the tool name.\n\
   Put all arguments inside the JSON arguments object.\n\
3. Do not guess argument values.\n\
4. Always provide all required parameters defined in the tool schema.";

/// System prompt used when agent mode is off and none is configured.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "ai.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Default LLM model identifier for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Default LLM model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default LLM model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "openai";

// --- Agent loop ---

/// Default number of tool-calling steps per turn.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Default history length cap applied before each turn.
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Tool results longer than this many bytes are truncated.
pub const TOOL_OUTPUT_MAX_BYTES: usize = 10_000;

/// Marker appended to truncated tool results.
pub const TOOL_OUTPUT_TRUNCATION_MARKER: &str = "\n...(truncated output)";

/// Default number of retrieval snippets injected per prompt.
pub const RETRIEVAL_TOP_K: usize = 3;

/// Editors tried in order when neither config nor `$EDITOR` names one.
pub const FALLBACK_EDITORS: &[&str] = &["vim", "nano"];

/// Last resort when no fallback editor is on `PATH`.
pub const LAST_RESORT_EDITOR: &str = "vi";

// --- MCP ---

/// MCP protocol revision sent in the `initialize` handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Consecutive non-matching lines tolerated while waiting for a response.
pub const MCP_MAX_SKIPPED_LINES: usize = 256;
