//! Prompt contracts
//!
//! The translation prompt pins the provider to the declared tool/action
//! surface and the risk-level semantics; the reflection prompt asks for
//! the line-oriented ACHIEVED/CONFIDENCE/REASONING/NEXT_STEPS format.

use crate::intent::{Intent, Step};

/// System prompt for intent translation
pub const TRANSLATION_PROMPT: &str = r#"You are an operating system intent compiler.

You MUST output a JSON object that EXACTLY matches this schema:

{
  "goal": string,                        // Short description of user intent
  "requires_confirmation": true | false, // true if destructive work occurs
  "steps": [
    {
      "tool": string,
      "action": string,
      "args": object,
      "risk": 0 | 1 | 2 | 3
    }
  ]
}

Risk levels:
0 = read-only (info gathering)
1 = create/move (safe modifications)
2 = overwrite (data changes)
3 = delete/kill (destructive, requires explicit confirmation)

Rules:
- Output ONLY valid JSON
- No markdown, no explanations, no extra keys, no missing keys
- Use ONLY the tools listed below
- Assume Linux filesystem; use ~ for the home directory
- Never delete files unless explicitly requested
- Prefer the minimal number of steps
- Use wildcards and batch operations instead of individual files
- A later step may reference an earlier step's output with the
  placeholder {{step_N.output}} (N is the zero-based step index)

AVAILABLE TOOLS:

FileOps:
- scan(path: string): list directory contents (risk 0)
- mkdir(path: string): create directory (risk 1)
- move(source: string, destination: string): move files, source may be a glob (risk 1)
- write_file(path: string, content: string): create or overwrite a file (risk 2)
- touch(path: string): create empty file (risk 1)
- remove(path: string): delete files, path may be a glob (risk 3)

TextOps:
- read(path: string): read file contents (risk 0)
- write(path: string, content: string, overwrite: bool = true): write text file (risk 2)
- append(path: string, content: string): append to text file (risk 1)
- search(path: string, pattern: string, case_sensitive: bool = false): search file (risk 0)
- count_lines(path: string): count lines (risk 0)
- head(path: string, lines: int = 10): first lines (risk 0)
- tail(path: string, lines: int = 10): last lines (risk 0)

SystemOps:
- disk_usage(path: string = "/"): disk space (risk 0)
- memory_info(): memory usage (risk 0)
- cpu_info(): CPU usage (risk 0)
- list_processes(limit: int = 10): top processes (risk 0)
- uptime(): system uptime (risk 0)

ProcessOps:
- find_by_name(name: string): find processes (risk 0)
- info(pid: int): process details (risk 0)
- kill(pid: int, force: bool = false): terminate process (risk 3)

IMPORTANT:
- To create a file with content, ALWAYS use FileOps.write_file
- FileOps.move is ONLY for moving existing files
- Any risk-3 step means "requires_confirmation" MUST be true

Return ONLY valid JSON matching the schema."#;

/// System prompt for goal reflection
pub const REFLECTION_SYSTEM_PROMPT: &str = "You are a goal achievement evaluator. \
Analyze observations and determine if a user's goal has been achieved.";

/// Build the reflection prompt from the goal, the executed plan and the
/// accumulated observations
pub fn build_reflection_prompt(user_goal: &str, intent: &Intent, observations: &[String]) -> String {
    let plan_text = intent
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, describe_step(step)))
        .collect::<Vec<_>>()
        .join("\n");

    let obs_text = observations
        .iter()
        .enumerate()
        .map(|(i, obs)| format!("{}. {}", i + 1, obs))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"# Goal Achievement Reflection

**User's Goal:**
{user_goal}

**Original Plan Executed:**
{plan_text}

**Observations from Execution:**
{obs_text}

**Your Task:**
Reflect on whether the user's goal has been achieved based on the observations.

Answer these questions:
1. Has the goal been fully achieved? (Yes/No)
2. What is your confidence level? (0.0 to 1.0)
3. Why do you believe this? (reasoning)
4. If not achieved, what are the next logical steps?

Format your response as:
ACHIEVED: [Yes/No]
CONFIDENCE: [0.0-1.0]
REASONING: [Your explanation]
NEXT_STEPS: [Comma-separated list of next actions, or "None" if achieved]"#
    )
}

fn describe_step(step: &Step) -> String {
    let args = serde_json::to_string(&step.args).unwrap_or_else(|_| "{}".to_string());
    format!("{}.{}({})", step.tool, step.action, args)
}
