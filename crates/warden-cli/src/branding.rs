//! White-label branding and settings-schema commands.

use warden_config::schema::{field, settings_schema};
use warden_config::WardenConfig;

use crate::schedule;

pub async fn branding(config: WardenConfig, set: Vec<String>, json: bool) -> anyhow::Result<()> {
    let (store, _) = schedule::open_store(&config)?;

    for pair in &set {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("expected KEY=VALUE, got '{pair}'");
        };
        let Some(schema_field) = field(&format!("white_label.{key}")) else {
            anyhow::bail!("unknown branding field: {key}");
        };
        schema_field
            .validate(value)
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?;
        store.set_setting(key, value).await?;
    }

    let branding = store.load_branding(&config.white_label).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&branding)?);
        return Ok(());
    }

    println!("display_name: {}", branding.display_name);
    println!("url:          {}", branding.url.as_deref().unwrap_or("-"));
    println!(
        "description:  {}",
        branding.description.as_deref().unwrap_or("-")
    );
    println!("author:       {}", branding.author.as_deref().unwrap_or("-"));
    println!(
        "author_url:   {}",
        branding.author_url.as_deref().unwrap_or("-")
    );
    Ok(())
}

pub fn schema(json: bool) -> anyhow::Result<()> {
    let schema = settings_schema();
    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    for f in schema {
        println!("{:<34} {:<24} {:?}", f.key, f.label, f.kind);
        println!("{:<34} {}", "", f.help);
    }
    Ok(())
}
