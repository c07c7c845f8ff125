pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS model_schemas (
    name TEXT PRIMARY KEY,
    document JSON NOT NULL,
    validation_action TEXT NOT NULL CHECK (validation_action IN ('error', 'warn')),
    validation_level TEXT NOT NULL CHECK (validation_level IN ('off', 'strict', 'moderate')),
    revision INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_model_schemas_updated ON model_schemas(updated_at);
"#;
