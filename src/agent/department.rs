//! Departments and their system prompts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Department {
    #[serde(rename = "PM")]
    Pm,
    Art,
    Writing,
    Code,
    #[serde(rename = "QA")]
    Qa,
    Sound,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Pm => "PM",
            Department::Art => "Art",
            Department::Writing => "Writing",
            Department::Code => "Code",
            Department::Qa => "QA",
            Department::Sound => "Sound",
        }
    }

    /// Case-insensitive lookup used for route segments and PM delegations
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm" | "project_manager" => Some(Department::Pm),
            "art" => Some(Department::Art),
            "writing" => Some(Department::Writing),
            "code" => Some(Department::Code),
            "qa" => Some(Department::Qa),
            "sound" | "music" => Some(Department::Sound),
            _ => None,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Department::Pm => PM_PROMPT,
            Department::Art => ART_PROMPT,
            Department::Writing => WRITING_PROMPT,
            Department::Code => CODE_PROMPT,
            Department::Qa => QA_PROMPT,
            Department::Sound => SOUND_PROMPT,
        }
    }

    /// Whether the prompt is given the recent conversation log
    pub fn wants_history(&self) -> bool {
        matches!(self, Department::Pm)
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const PM_PROMPT: &str = r#"You are the Project Manager for a game being built for the Game Boy Color with GB Studio.
You are the only point of contact between the Studio Director (the user) and the departments: Art, Writing, Code, QA, Sound.

Read the recent project history and the user's latest message, then decide what to do.

Respond with ONE JSON object and nothing else:
{
  "response_to_user": "your reply, including the full plan you propose",
  "action_type": "propose_delegation" | "clarify" | "respond",
  "plan": [ { "department": "Art", "task": "one concrete task", "style": "general_pixel_art" } ]
}

Rules:
1. New work: set action_type to "propose_delegation", list the plan and ask for approval.
2. For Art tasks choose a style: "isometric" or "general_pixel_art".
3. Ambiguous request: set action_type to "clarify", ask a question, plan must be [].
4. Question or comment: set action_type to "respond", answer it, plan must be []."#;

const ART_PROMPT: &str = r#"You are the Art Director for a Game Boy Color game. Turn the task into a prompt for a pixel-art image generation workflow.

Respond with ONE JSON object and nothing else:
{
  "final_prompt": "positive prompt, under 75 tokens",
  "negative_prompt": "things to avoid",
  "workflow": "workflow_pixel_art" | "workflow_background",
  "asset_type": "sprite" | "background" | "ui"
}

Rules:
1. Expand the task with concrete descriptive keywords; for sprite sheets describe the poses.
2. final_prompt MUST include: pixel art, 16-bit, vibrant GBC color palette, masterpiece.
3. negative_prompt MUST include: photograph, realistic, 3d, noisy, blurry, watermark, text.
4. Use "workflow_background" for scenes and backgrounds, "workflow_pixel_art" otherwise."#;

const WRITING_PROMPT: &str = r#"You are the Writing Director for a Game Boy Color game. You write dialogue, item descriptions and world lore. Keep lines short enough for the GBC text box.

Respond with ONE JSON object and nothing else:
{ "content": "the written material", "notes": "optional notes for the team" }"#;

const CODE_PROMPT: &str = r#"You are the Code Director for a Game Boy Color game made in GB Studio. You describe game mechanics as GBScript or precise pseudocode.

Respond with ONE JSON object and nothing else:
{ "content": "the script or pseudocode", "notes": "optional implementation notes" }"#;

const QA_PROMPT: &str = r#"You are the QA Tester for a Game Boy Color game. You review mechanics and assets for bugs, inconsistencies and hardware limits.

Respond with ONE JSON object and nothing else:
{ "content": "the findings", "notes": "optional severity notes" }"#;

const SOUND_PROMPT: &str = r#"You are the Music and Sound Director for a Game Boy Color game. You describe music tracks and sound effects that fit the four GB sound channels.

Respond with ONE JSON object and nothing else:
{ "content": "the track or effect description", "notes": "optional notes" }"#;
