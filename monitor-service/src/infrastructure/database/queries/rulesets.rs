pub const RULESET_INSERT: &str = r#"
    INSERT INTO ruleset_versions (id, version, effective_from, rules_json, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

pub const RULESET_LATEST: &str = r#"
    SELECT id, version, effective_from, rules_json, created_at
    FROM ruleset_versions
    ORDER BY created_at DESC
    LIMIT 1
"#;
