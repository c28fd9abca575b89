//! SQL schema definitions

pub const SCHEMA: &str = r#"
-- Chat log, append-only
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    user_message TEXT NOT NULL,
    agent_response TEXT NOT NULL
);

-- Generated asset bookkeeping
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_name TEXT NOT NULL,
    asset_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    final_prompt TEXT,
    source_path TEXT,
    status TEXT NOT NULL DEFAULT 'generated'
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_assets_status ON assets(status);
CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp);
"#;
