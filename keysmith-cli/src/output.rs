//! Plain-text rendering of command results.

use std::fmt::Write;

use keysmith_client::{Organization, Secret, Workspace};

const SEPARATOR: &str = "----";

fn width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).chain(std::iter::once(header.len())).max().unwrap_or(0)
}

/// `org id | name` table.
pub fn organizations(organizations: &[Organization]) -> String {
    if organizations.is_empty() {
        return "* There was no organization for current configuration.\n".to_string();
    }

    let id_width = width("org id", organizations.iter().map(|o| o.id.as_str()));
    let mut out = String::new();
    let _ = writeln!(out, "{:>id_width$} | name", "org id");
    let _ = writeln!(out, "{}", SEPARATOR);
    for org in organizations {
        let _ = writeln!(out, "{:>id_width$} | {}", org.id, org.name);
    }
    out
}

/// Workspaces of one organization, each followed by its environments.
pub fn workspaces(organization: &str, workspaces: &[Workspace]) -> String {
    if workspaces.is_empty() {
        return format!("* There was no workspace for organization: {}.\n", organization);
    }

    let id_width = width("workspace id", workspaces.iter().map(|w| w.id.as_str()));
    let mut out = String::new();
    let _ = writeln!(out, "{:>id_width$} | name", "workspace id");
    for workspace in workspaces {
        let _ = writeln!(out, "{}", SEPARATOR);
        let _ = writeln!(out, "{:>id_width$} | {}", workspace.id, workspace.name);

        let slug_width = width("", workspace.environments.iter().map(|e| e.slug.as_str()));
        for env in &workspace.environments {
            let _ = writeln!(out, "  {:>slug_width$} | {}", env.slug, env.name);
        }
    }
    out
}

/// `workspace | env | type | path/key=value` table.
pub fn secrets(secrets: &[Secret]) -> String {
    if secrets.is_empty() {
        return "* There was no secret for given parameters.\n".to_string();
    }

    let ws_width = width("workspace", secrets.iter().map(|s| s.workspace.as_str()));
    let env_width = width("env", secrets.iter().map(|s| s.environment.as_str()));
    let type_width = width("type", secrets.iter().map(|s| s.secret_type.as_str()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>ws_width$} | {:>env_width$} | {:>type_width$} | path/key=value",
        "workspace", "env", "type"
    );
    let _ = writeln!(out, "{}", SEPARATOR);
    for secret in secrets {
        let _ = writeln!(
            out,
            "{:>ws_width$} | {:>env_width$} | {:>type_width$} | {}={}",
            secret.workspace,
            secret.environment,
            secret.secret_type.as_str(),
            secret.key_path(),
            secret.value.expose()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use keysmith_client::{FolderPath, SecretType, Sensitive, WorkspaceEnvironment};

    fn secret(path: &str, key: &str, value: &str) -> Secret {
        Secret {
            id: format!("id-{}", key),
            version: 1,
            workspace: "ws-1".to_string(),
            environment: "dev".to_string(),
            secret_type: SecretType::Shared,
            path: FolderPath::new(path),
            key: key.to_string(),
            value: Sensitive::new(value),
            comment: None,
        }
    }

    #[test]
    fn test_secrets_table() {
        let out = secrets(&[secret("/", "ROOT", "r"), secret("/app", "DB_URL", "postgres://db")]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "workspace | env |   type | path/key=value");
        assert_eq!(lines[1], "----");
        assert_eq!(lines[2], "     ws-1 | dev | shared | /ROOT=r");
        assert_eq!(lines[3], "     ws-1 | dev | shared | /app/DB_URL=postgres://db");
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(secrets(&[]), "* There was no secret for given parameters.\n");
        assert_eq!(
            organizations(&[]),
            "* There was no organization for current configuration.\n"
        );
        assert_eq!(
            workspaces("org-1", &[]),
            "* There was no workspace for organization: org-1.\n"
        );
    }

    #[test]
    fn test_workspaces_list_environments() {
        let workspace = Workspace {
            id: "ws-1".to_string(),
            name: "backend".to_string(),
            organization: Some("org-1".to_string()),
            environments: vec![
                WorkspaceEnvironment { name: "Development".to_string(), slug: "dev".to_string() },
                WorkspaceEnvironment { name: "Production".to_string(), slug: "prod".to_string() },
            ],
            auto_capitalization: false,
        };

        let out = workspaces("org-1", &[workspace]);
        assert!(out.contains("        ws-1 | backend\n"));
        assert!(out.contains("   dev | Development\n"));
        assert!(out.contains("  prod | Production\n"));
    }
}
