use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::Context;
use chrono::Locale;
use serde::Deserialize;
use tracing::{
  debug,
  error,
  info,
  warn
};

use crate::editor::EditorSettings;
use crate::model::{
  Resource,
  WeekStart
};
use crate::resources::InitialSelection;
use crate::sources::ResourceSource;
use crate::store::ResourcePolicy;

const CONFIG_ENV_VAR: &str =
  "CLINIC_CALENDAR_CONFIG";
const CONFIG_DIR_NAME: &str =
  "clinic-calendar";
const CONFIG_FILE_NAME: &str =
  "calendar.toml";
const DEFAULT_LOCALE: Locale =
  Locale::fr_FR;

fn default_locale() -> String {
  "fr_FR".to_string()
}

fn default_week_start() -> String {
  "monday".to_string()
}

fn default_mini_week_start() -> String
{
  "sunday".to_string()
}

fn default_slot_minutes() -> u32 {
  30
}

fn default_duration_minutes() -> u32 {
  30
}

fn default_resource_policy() -> String
{
  "lenient".to_string()
}

fn default_initial_selection()
-> String {
  "first".to_string()
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
pub struct SchedulerConfig {
  #[serde(default)]
  pub version:   u32,
  #[serde(default = "default_locale")]
  pub locale:    String,
  #[serde(default)]
  pub policies:  SchedulerPolicies,
  #[serde(default)]
  pub resources: Vec<ResourceEntry>
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
pub struct SchedulerPolicies {
  #[serde(default = "default_week_start")]
  pub week_start:               String,
  #[serde(
    default = "default_mini_week_start"
  )]
  pub mini_week_start:          String,
  #[serde(
    default = "default_slot_minutes"
  )]
  pub slot_minutes:             u32,
  #[serde(
    default = "default_duration_minutes"
  )]
  pub default_duration_minutes: u32,
  #[serde(
    default = "default_resource_policy"
  )]
  pub resource_policy:          String,
  #[serde(
    default = "default_initial_selection"
  )]
  pub initial_selection:        String
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
pub struct ResourceEntry {
  pub id:           String,
  pub display_name: String,
  #[serde(default)]
  pub specialty:    String,
  pub color:        String
}

impl Default for SchedulerPolicies {
  fn default() -> Self {
    Self {
      week_start:
        default_week_start(),
      mini_week_start:
        default_mini_week_start(),
      slot_minutes:
        default_slot_minutes(),
      default_duration_minutes:
        default_duration_minutes(),
      resource_policy:
        default_resource_policy(),
      initial_selection:
        default_initial_selection()
    }
  }
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      version:   0,
      locale:    default_locale(),
      policies:  SchedulerPolicies::default(
      ),
      resources: Vec::new()
    }
  }
}

impl SchedulerConfig {
  /// Loads from `path_override`, then
  /// `$CLINIC_CALENDAR_CONFIG`, then the
  /// user config directory. A missing
  /// default file yields defaults.
  #[tracing::instrument(skip(
    path_override
  ))]
  pub fn load(
    path_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(path_override)
    else {
      warn!(
        "no config location available; \
         using defaults"
      );
      return Ok(Self::default());
    };

    if path_override.is_none()
      && !path.exists()
    {
      info!(
        file = %path.display(),
        "config file not found; using defaults"
      );
      return Ok(Self::default());
    }

    Self::load_file(&path)
  }

  #[tracing::instrument]
  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let config = Self::from_toml_str(&raw)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    info!(
      file = %path.display(),
      version = config.version,
      locale = %config.locale,
      week_start = %config.policies.week_start,
      resources = config.resources.len(),
      "loaded scheduler config"
    );
    Ok(config)
  }

  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut config =
      toml::from_str::<Self>(raw)?;
    config.sanitize();
    Ok(config)
  }

  fn sanitize(&mut self) {
    if parse_locale(&self.locale)
      .is_none()
    {
      error!(
        locale = %self.locale,
        "unknown locale; falling back to default"
      );
      self.locale = default_locale();
    }

    let policies = &mut self.policies;
    if WeekStart::from_key(
      &policies.week_start
    )
    .is_none()
    {
      warn!(
        value = %policies.week_start,
        "invalid week_start; using default"
      );
      policies.week_start =
        default_week_start();
    }
    if WeekStart::from_key(
      &policies.mini_week_start
    )
    .is_none()
    {
      warn!(
        value = %policies.mini_week_start,
        "invalid mini_week_start; using default"
      );
      policies.mini_week_start =
        default_mini_week_start();
    }

    policies.slot_minutes =
      policies.slot_minutes.clamp(1, 720);
    policies.default_duration_minutes =
      policies
        .default_duration_minutes
        .clamp(1, 1440);

    if ResourcePolicy::from_key(
      &policies.resource_policy
    )
    .is_none()
    {
      warn!(
        value = %policies.resource_policy,
        "invalid resource_policy; using default"
      );
      policies.resource_policy =
        default_resource_policy();
    }
    if InitialSelection::from_key(
      &policies.initial_selection
    )
    .is_none()
    {
      warn!(
        value = %policies.initial_selection,
        "invalid initial_selection; using default"
      );
      policies.initial_selection =
        default_initial_selection();
    }

    debug!(?policies, "sanitized scheduler policies");
  }

  pub fn locale(&self) -> Locale {
    parse_locale(&self.locale)
      .unwrap_or(DEFAULT_LOCALE)
  }

  pub fn week_start(&self) -> WeekStart {
    WeekStart::from_key(
      &self.policies.week_start
    )
    .unwrap_or_default()
  }

  pub fn mini_week_start(
    &self
  ) -> WeekStart {
    WeekStart::from_key(
      &self.policies.mini_week_start
    )
    .unwrap_or(WeekStart::Sunday)
  }

  pub fn resource_policy(
    &self
  ) -> ResourcePolicy {
    ResourcePolicy::from_key(
      &self.policies.resource_policy
    )
    .unwrap_or_default()
  }

  pub fn initial_selection(
    &self
  ) -> InitialSelection {
    InitialSelection::from_key(
      &self.policies.initial_selection
    )
    .unwrap_or_default()
  }

  pub fn editor_settings(
    &self
  ) -> EditorSettings {
    EditorSettings {
      slot_minutes:             self
        .policies
        .slot_minutes,
      default_duration_minutes: self
        .policies
        .default_duration_minutes
    }
  }
}

impl ResourceSource for SchedulerConfig {
  fn list(
    &self
  ) -> anyhow::Result<Vec<Resource>> {
    Ok(
      self
        .resources
        .iter()
        .map(|entry| {
          Resource::new(
            entry.id.clone(),
            entry.display_name.clone(),
            entry.color.clone()
          )
          .with_specialty(
            entry.specialty.clone()
          )
        })
        .collect()
    )
  }
}

pub fn parse_locale(
  raw: &str
) -> Option<Locale> {
  Locale::try_from(raw.trim()).ok()
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  dirs::config_dir().map(|dir| {
    dir
      .join(CONFIG_DIR_NAME)
      .join(CONFIG_FILE_NAME)
  })
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  const SAMPLE: &str = r##"
version = 2
locale = "en_US"

[policies]
week_start = "sunday"
slot_minutes = 15
default_duration_minutes = 45
resource_policy = "strict"
initial_selection = "all"

[[resources]]
id = "dr-martin"
display_name = "Dr Martin"
specialty = "Cardiologie"
color = "#3b82f6"

[[resources]]
id = "dr-diallo"
display_name = "Dr Diallo"
color = "#10b981"
"##;

  #[test]
  fn empty_document_uses_defaults() {
    let config =
      SchedulerConfig::from_toml_str("")
        .expect("parse empty config");
    assert_eq!(
      config,
      SchedulerConfig::default()
    );
    assert_eq!(
      config.locale(),
      Locale::fr_FR
    );
    assert_eq!(
      config.week_start(),
      WeekStart::Monday
    );
    assert_eq!(
      config.mini_week_start(),
      WeekStart::Sunday
    );
    assert_eq!(
      config.editor_settings(),
      EditorSettings::default()
    );
  }

  #[test]
  fn loads_policies_and_roster_from_file()
   {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(
      "calendar.toml"
    );
    fs::write(&path, SAMPLE)
      .expect("write config");

    let config = SchedulerConfig::load(
      Some(&path)
    )
    .expect("load config");
    assert_eq!(config.version, 2);
    assert_eq!(
      config.locale(),
      Locale::en_US
    );
    assert_eq!(
      config.week_start(),
      WeekStart::Sunday
    );
    assert_eq!(
      config.resource_policy(),
      ResourcePolicy::Strict
    );
    assert_eq!(
      config.initial_selection(),
      InitialSelection::All
    );
    assert_eq!(
      config
        .editor_settings()
        .default_duration_minutes,
      45
    );

    let roster =
      config.list().expect("roster");
    assert_eq!(roster.len(), 2);
    assert_eq!(
      roster[0].specialty,
      "Cardiologie"
    );
    assert!(roster[1].specialty.is_empty());
  }

  #[test]
  fn invalid_values_are_sanitized() {
    let config =
      SchedulerConfig::from_toml_str(
        r#"
locale = "xx_YY"

[policies]
week_start = "friday"
slot_minutes = 0
resource_policy = "paranoid"
"#
      )
      .expect("parse config");
    assert_eq!(config.locale, "fr_FR");
    assert_eq!(
      config.policies.week_start,
      "monday"
    );
    assert_eq!(
      config.policies.slot_minutes,
      1
    );
    assert_eq!(
      config.resource_policy(),
      ResourcePolicy::Lenient
    );
  }

  #[test]
  fn missing_explicit_file_is_an_error() {
    let temp = tempdir().expect("tempdir");
    let err = SchedulerConfig::load(Some(
      &temp.path().join("absent.toml")
    ))
    .expect_err("missing file");
    assert!(
      format!("{err:#}")
        .contains("failed to read")
    );
  }

  #[test]
  fn malformed_toml_is_an_error() {
    assert!(
      SchedulerConfig::from_toml_str(
        "policies = 3"
      )
      .is_err()
    );
  }
}
