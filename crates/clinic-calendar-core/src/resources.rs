use std::collections::HashSet;

use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  warn
};

use crate::model::Resource;
use crate::sources::ResourceSource;

/// Which resources start selected when the
/// roster is loaded.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InitialSelection {
  #[default]
  First,
  All,
  None,
  /// Keep the `selected` flags supplied by
  /// the source.
  Supplied
}

impl InitialSelection {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw.trim() {
      | "first" => Some(Self::First),
      | "all" => Some(Self::All),
      | "none" => Some(Self::None),
      | "supplied" => {
        Some(Self::Supplied)
      }
      | _ => None
    }
  }
}

/// Owns the resource roster and its
/// selection flags.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilterManager {
  resources: Vec<Resource>
}

impl ResourceFilterManager {
  /// Builds the manager from a roster,
  /// dropping duplicate ids (first one
  /// wins).
  pub fn new(
    resources: Vec<Resource>,
    initial: InitialSelection
  ) -> Self {
    let mut seen = HashSet::new();
    let mut kept =
      Vec::with_capacity(resources.len());
    for resource in resources {
      if !seen.insert(resource.id.clone())
      {
        warn!(
          resource_id = %resource.id,
          "duplicate resource id in roster; ignoring"
        );
        continue;
      }
      kept.push(resource);
    }

    match initial {
      | InitialSelection::First => {
        for (idx, resource) in
          kept.iter_mut().enumerate()
        {
          resource.selected = idx == 0;
        }
      }
      | InitialSelection::All => {
        for resource in &mut kept {
          resource.selected = true;
        }
      }
      | InitialSelection::None => {
        for resource in &mut kept {
          resource.selected = false;
        }
      }
      | InitialSelection::Supplied => {}
    }

    debug!(
      count = kept.len(),
      ?initial,
      "resource roster loaded"
    );
    Self {
      resources: kept
    }
  }

  #[tracing::instrument(skip(source))]
  pub fn from_source(
    source: &dyn ResourceSource,
    initial: InitialSelection
  ) -> anyhow::Result<Self> {
    Ok(Self::new(source.list()?, initial))
  }

  pub fn resources(&self) -> &[Resource] {
    &self.resources
  }

  pub fn get(
    &self,
    resource_id: &str
  ) -> Option<&Resource> {
    self
      .resources
      .iter()
      .find(|r| r.id == resource_id)
  }

  pub fn is_selected(
    &self,
    resource_id: &str
  ) -> bool {
    self
      .get(resource_id)
      .is_some_and(|r| r.selected)
  }

  pub fn color_of(
    &self,
    resource_id: &str
  ) -> Option<&str> {
    self
      .get(resource_id)
      .map(|r| r.color.as_str())
  }

  pub fn first_selected(
    &self
  ) -> Option<&Resource> {
    self
      .resources
      .iter()
      .find(|r| r.selected)
  }

  /// First selected resource, falling back
  /// to the first resource of the roster.
  pub fn default_resource(
    &self
  ) -> Option<&Resource> {
    self
      .first_selected()
      .or_else(|| self.resources.first())
  }

  /// Flips one resource's selection.
  /// Unknown ids are ignored; returns
  /// whether anything changed.
  #[tracing::instrument(skip(self))]
  pub fn toggle(
    &mut self,
    resource_id: &str
  ) -> bool {
    match self
      .resources
      .iter_mut()
      .find(|r| r.id == resource_id)
    {
      | Some(resource) => {
        resource.selected =
          !resource.selected;
        debug!(
          selected = resource.selected,
          "toggled resource"
        );
        true
      }
      | None => {
        warn!(
          "toggle for unknown resource; \
           ignoring"
        );
        false
      }
    }
  }

  pub fn select_all(&mut self) {
    for resource in &mut self.resources {
      resource.selected = true;
    }
    debug!("selected all resources");
  }

  pub fn clear_all(&mut self) {
    for resource in &mut self.resources {
      resource.selected = false;
    }
    debug!("cleared resource selection");
  }

  /// Selects exactly `ids`. Repeats are
  /// harmless; unknown ids are logged and
  /// skipped.
  #[tracing::instrument(skip(self, ids))]
  pub fn select_only<S: AsRef<str>>(
    &mut self,
    ids: &[S]
  ) {
    for resource in &mut self.resources {
      resource.selected = ids
        .iter()
        .any(|id| id.as_ref() == resource.id);
    }
    for id in ids {
      if self.get(id.as_ref()).is_none() {
        warn!(
          resource_id = id.as_ref(),
          "select for unknown resource; \
           ignoring"
        );
      }
    }
    debug!(
      selected =
        self.active_resource_ids().len(),
      "replaced resource selection"
    );
  }

  /// Selected ids in roster order.
  pub fn active_resource_ids(
    &self
  ) -> Vec<String> {
    self
      .resources
      .iter()
      .filter(|r| r.selected)
      .map(|r| r.id.clone())
      .collect()
  }
}
