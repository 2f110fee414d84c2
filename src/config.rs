use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub site: SiteConfig,
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
  /// Origin the pre-cache paths resolve against. Fetched responses must
  /// share it to be cached.
  pub origin: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Cache version identifier; doubles as the live store's name.
  pub version: String,
  /// Pages to fetch and store at install time, as paths or absolute URLs.
  #[serde(default)]
  pub precache: Vec<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pagestash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pagestash/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pagestash/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pagestash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pagestash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.version.trim().is_empty() {
      return Err(eyre!("cache.version must not be empty"));
    }

    if self.site.origin.cannot_be_a_base() || !matches!(self.site.origin.scheme(), "http" | "https")
    {
      return Err(eyre!(
        "site.origin must be an absolute http(s) URL, got {}",
        self.site.origin
      ));
    }

    Ok(())
  }

  /// The configured pre-cache list, resolved to absolute URLs.
  pub fn precache_urls(&self) -> Result<Vec<String>> {
    self
      .cache
      .precache
      .iter()
      .map(|entry| {
        self
          .site
          .origin
          .join(entry)
          .map(|url| url.to_string())
          .map_err(|e| eyre!("Invalid pre-cache entry {}: {}", entry, e))
      })
      .collect()
  }

  /// Resolve a user-supplied URL or site-relative path to an absolute URL.
  pub fn resolve_url(&self, input: &str) -> Result<String> {
    match Url::parse(input) {
      Ok(url) => Ok(url.to_string()),
      Err(url::ParseError::RelativeUrlWithoutBase) => self
        .site
        .origin
        .join(input)
        .map(|url| url.to_string())
        .map_err(|e| eyre!("Invalid URL {}: {}", input, e)),
      Err(e) => Err(eyre!("Invalid URL {}: {}", input, e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EXAMPLE: &str = r#"
site:
  origin: https://doctrines.example.org
cache:
  version: doctrines-v1
  precache:
    - /complete-library-of-christian-doctrine/
    - /comprehensive-biblical-reference-guide/
"#;

  fn example_config() -> Config {
    serde_yaml::from_str(EXAMPLE).expect("example config should parse")
  }

  #[test]
  fn test_example_config_parses_and_validates() {
    let config = example_config();
    config.validate().unwrap();

    assert_eq!(config.cache.version, "doctrines-v1");
    assert_eq!(config.cache.precache.len(), 2);
    assert_eq!(config.site.origin.as_str(), "https://doctrines.example.org/");
  }

  #[test]
  fn test_empty_version_is_rejected() {
    let mut config = example_config();
    config.cache.version = "  ".to_string();

    assert!(config.validate().is_err());
  }

  #[test]
  fn test_non_http_origin_is_rejected() {
    let mut config = example_config();
    config.site.origin = Url::parse("data:text/plain,hello").unwrap();

    assert!(config.validate().is_err());
  }

  #[test]
  fn test_precache_urls_resolve_against_origin() {
    let config = example_config();
    let urls = config.precache_urls().unwrap();

    assert_eq!(
      urls,
      vec![
        "https://doctrines.example.org/complete-library-of-christian-doctrine/",
        "https://doctrines.example.org/comprehensive-biblical-reference-guide/",
      ]
    );
  }

  #[test]
  fn test_resolve_url_joins_relative_paths() {
    let config = example_config();

    assert_eq!(
      config.resolve_url("/about/").unwrap(),
      "https://doctrines.example.org/about/"
    );
    assert_eq!(
      config.resolve_url("https://other.example.net/x").unwrap(),
      "https://other.example.net/x"
    );
  }

  #[test]
  fn test_missing_precache_list_defaults_to_empty() {
    let config: Config = serde_yaml::from_str(
      "site:\n  origin: https://doctrines.example.org\ncache:\n  version: doctrines-v1\n",
    )
    .unwrap();

    assert!(config.cache.precache.is_empty());
  }
}
