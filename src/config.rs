use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::fields::DEPARTMENT_OFFSET;

const CONFIG_FILE: &str = "ufc_inova";
const ENV_PREFIX: &str = "UFC";

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub db_path: String,
    pub output_path: String,
    pub department_offset: usize,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
}

impl Settings {
    /// Defaults, then `ufc_inova.toml` if present, then `UFC_*` env vars.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .set_default("base_url", "https://ufcinova.ufc.br/wp-json/wp/v2/posts")?
            .set_default(
                "user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:118.0) Gecko/20100101 Firefox/118.0",
            )?
            .set_default("timeout_secs", 20)?
            .set_default("concurrency", 4)?
            .set_default("max_retries", 3)?
            .set_default("base_backoff_ms", 2000)?
            .set_default("db_path", "data/ufc_inova.sqlite")?
            .set_default("output_path", "dados_ufcinova.json")?
            .set_default("department_offset", DEPARTMENT_OFFSET as u64)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build settings")?;

        let settings: Settings = cfg
            .try_deserialize()
            .context("Failed to deserialize settings")?;
        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        for c in &mut self.categories {
            c.name = c.name.trim().to_uppercase();
        }
        self
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

fn default_categories() -> Vec<Category> {
    [
        ("ALIMENTOS", 36),
        ("COSMÉTICOS", 34),
        ("QUÍMICO", 32),
        ("TIC", 44),
        ("CIÊNCIAS DA SAÚDE", 38),
        ("ENERGIA E MEIO AMBIENTE", 46),
        ("BIOTECNOLOGIA", 40),
        ("ENGENHARIAS", 48),
        ("AGROPECUÁRIA", 42),
        ("INDÚSTRIA", 50),
        ("SOFTWARE", 115),
    ]
    .into_iter()
    .map(|(name, id)| Category {
        name: name.to_string(),
        id,
    })
    .collect()
}
