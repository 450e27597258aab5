use std::path::Path;

/// Scaffold a new Caravel project.
pub async fn new_project(name: &str) -> anyhow::Result<()> {
    // Same rule caravel.toml validation enforces
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        anyhow::bail!("project name must be lowercase alphanumeric with dashes");
    }

    let project_dir = Path::new(name);
    if project_dir.exists() {
        anyhow::bail!("directory '{}' already exists", name);
    }

    std::fs::create_dir_all(project_dir.join("src"))?;

    // package.json
    let package_json = format!(
        r#"{{
  "name": "{name}",
  "version": "0.1.0",
  "private": true,
  "type": "module",
  "devDependencies": {{
    "@types/node": "^22",
    "typescript": "^5"
  }}
}}
"#
    );
    std::fs::write(project_dir.join("package.json"), package_json)?;

    // src/index.ts
    let index_ts = r#"import { createServer } from "node:http";

const port = Number(process.env.PORT ?? 8080);

const server = createServer((req, res) => {
  if (req.url === "/health") {
    res.writeHead(200, { "content-type": "text/plain" });
    res.end("ok");
    return;
  }
  res.writeHead(200, { "content-type": "text/plain" });
  res.end("Hello from Caravel!");
});

server.listen(port, () => {
  console.log(`listening on :${port}`);
});
"#;
    std::fs::write(project_dir.join("src/index.ts"), index_ts)?;

    // caravel.toml
    std::fs::write(
        project_dir.join("caravel.toml"),
        super::caravel_toml_template(name),
    )?;

    // .env.example
    std::fs::write(project_dir.join(".env.example"), "PORT=8080\n")?;

    // .gitignore
    let gitignore = "/node_modules\n/dist\n/dist.tmp\n.env\n";
    std::fs::write(project_dir.join(".gitignore"), gitignore)?;

    println!("Created project '{name}'");
    println!();
    println!("  cd {name}");
    println!("  npm install");
    println!("  caravel run            # local development");
    println!("  caravel deploy         # publish to AWS");

    Ok(())
}
