use std::path::Path;

use caravel_core::NodeProject;

/// Initialize Caravel in an existing Node project.
pub async fn init_project() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    let Some(project) = NodeProject::load(project_dir)? else {
        anyhow::bail!("package.json not found. Run this command from a Node project root.");
    };

    let mut created = Vec::new();

    let config_path = Path::new("caravel.toml");
    if config_path.exists() {
        eprintln!("caravel.toml already exists, skipping");
    } else {
        let name = project
            .name
            .as_deref()
            .map(service_name_from)
            .unwrap_or_else(|| "my-service".to_owned());
        std::fs::write(config_path, super::caravel_toml_template(&name))?;
        created.push("caravel.toml");
    }

    let env_example_path = Path::new(".env.example");
    if env_example_path.exists() {
        eprintln!(".env.example already exists, skipping");
    } else {
        std::fs::write(env_example_path, "PORT=8080\n")?;
        created.push(".env.example");
    }

    if created.is_empty() {
        println!("Nothing to create, already initialized.");
    } else {
        for f in &created {
            println!("Created {f}");
        }
    }

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Review caravel.toml (name, port, build.entry)");
    println!("  2. Start the dev loop:");
    println!("     caravel run");
    println!("  3. Provision and ship:");
    println!("     caravel setup-aws");
    println!("     caravel deploy");
    println!("     caravel deploy-aws");

    Ok(())
}

/// Derive a valid service name from a package.json name. Scopes are
/// stripped and anything outside [a-z0-9-] becomes a dash.
fn service_name_from(raw: &str) -> String {
    let base = raw.rsplit('/').next().unwrap_or(raw);
    let candidate: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = candidate.trim_matches('-');
    if trimmed.is_empty() {
        "my-service".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_passes_through() {
        assert_eq!(service_name_from("shop"), "shop");
    }

    #[test]
    fn scope_is_stripped() {
        assert_eq!(service_name_from("@acme/shop-api"), "shop-api");
    }

    #[test]
    fn invalid_characters_become_dashes() {
        assert_eq!(service_name_from("Shop_API v2"), "shop-api-v2");
    }

    #[test]
    fn empty_name_falls_back() {
        assert_eq!(service_name_from("@/"), "my-service");
    }
}
