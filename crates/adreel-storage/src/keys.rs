//! Object key layout.
//!
//! Every key a project writes is partitioned as `{user_id}/{project_id}/...`
//! so two projects, or two packaging runs of one project, never collide.

use crate::error::{StorageError, StorageResult};

/// Reject keys the store must never write to.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::invalid_key("key is empty"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!("{key}: leading slash")));
    }
    if key.split('/').any(|part| part == "..") {
        return Err(StorageError::invalid_key(format!("{key}: parent segment")));
    }
    if key.chars().any(|c| c.is_control() || c == '\\') {
        return Err(StorageError::invalid_key(format!("{key}: illegal character")));
    }
    Ok(())
}

fn component(name: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() || value.contains('/') || value == ".." {
        return Err(StorageError::invalid_key(format!(
            "{name} '{value}' is not a valid key component"
        )));
    }
    Ok(())
}

fn project_prefix(user_id: &str, project_id: &str) -> StorageResult<String> {
    component("user_id", user_id)?;
    component("project_id", project_id)?;
    Ok(format!("{user_id}/{project_id}"))
}

/// `{user_id}/{project_id}/{run_id}/render_spec.json`
pub fn render_spec_key(user_id: &str, project_id: &str, run_id: &str) -> StorageResult<String> {
    component("run_id", run_id)?;
    Ok(format!(
        "{}/{run_id}/render_spec.json",
        project_prefix(user_id, project_id)?
    ))
}

/// `{user_id}/{project_id}/renders/{run_id}.mp4`
pub fn default_output_key(user_id: &str, project_id: &str, run_id: &str) -> StorageResult<String> {
    component("run_id", run_id)?;
    Ok(format!(
        "{}/renders/{run_id}.mp4",
        project_prefix(user_id, project_id)?
    ))
}

/// `{user_id}/{project_id}/voiceover/{audio_id}.mp3`
pub fn voiceover_key(user_id: &str, project_id: &str, audio_id: &str) -> StorageResult<String> {
    component("audio_id", audio_id)?;
    Ok(format!(
        "{}/voiceover/{audio_id}.mp3",
        project_prefix(user_id, project_id)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            render_spec_key("u1", "p1", "r1").unwrap(),
            "u1/p1/r1/render_spec.json"
        );
        assert_eq!(
            default_output_key("u1", "p1", "r1").unwrap(),
            "u1/p1/renders/r1.mp4"
        );
        assert_eq!(voiceover_key("u1", "p1", "a1").unwrap(), "u1/p1/voiceover/a1.mp3");
    }

    #[test]
    fn test_components_cannot_escape_partition() {
        assert!(render_spec_key("u1/../u2", "p1", "r1").is_err());
        assert!(default_output_key("", "p1", "r1").is_err());
        assert!(voiceover_key("u1", "p1", "..").is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("users/42/final/a.mp4").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a\\b").is_err());
    }
}
