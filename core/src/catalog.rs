use serde_json::{Map, Value};

/// Crafter's action vocabulary, in engine id order.
const CRAFTER_ACTIONS: &[&str] = &[
    "idle",
    "move_left",
    "move_right",
    "move_up",
    "move_down",
    "do (mine, collect, attack)",
    "sleep",
    "place_stone",
    "place_table",
    "place_furnace",
    "place_plant",
    "make_wood_pickaxe",
    "make_stone_pickaxe",
    "make_iron_pickaxe",
    "make_wood_sword",
    "make_stone_sword",
    "make_iron_sword",
];

/// The fixed set of legal actions, mapping human-readable names to engine ids.
///
/// Built once per run and shared read-only. One entry is designated as the
/// idle action: it is what the selector falls back to and what a sleeping
/// agent plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    entries: Vec<(String, u32)>,
    idle: usize,
}

impl ActionCatalog {
    /// Builds a catalog from `(name, id)` pairs. Returns `None` if `idle` is
    /// not one of the names or a name appears twice.
    pub fn new(entries: Vec<(String, u32)>, idle: &str) -> Option<Self> {
        for (i, (name, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(other, _)| other == name) {
                return None;
            }
        }
        let idle = entries.iter().position(|(name, _)| name == idle)?;
        Some(Self { entries, idle })
    }

    pub fn crafter() -> Self {
        let entries = CRAFTER_ACTIONS
            .iter()
            .zip(0u32..)
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        Self { entries, idle: 0 }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.action_id(name).is_some()
    }

    pub fn action_id(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, id)| *id)
    }

    pub fn idle_action(&self) -> &str {
        &self.entries[self.idle].0
    }

    pub fn idle_id(&self) -> u32 {
        self.entries[self.idle].1
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The catalog as a JSON object, exactly as the model is shown it.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, id)| (name.clone(), Value::from(*id)))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crafter_catalog() {
        let catalog = ActionCatalog::crafter();
        assert_eq!(catalog.len(), 17);
        assert_eq!(catalog.idle_action(), "idle");
        assert_eq!(catalog.idle_id(), 0);
        assert_eq!(catalog.action_id("move_left"), Some(1));
        assert_eq!(catalog.action_id("make_iron_sword"), Some(16));
        assert!(!catalog.contains("noop"));
    }

    #[test]
    fn test_json_keeps_catalog_order() {
        let json = ActionCatalog::crafter().to_json().to_string();
        assert!(json.starts_with("{\"idle\":0,\"move_left\":1,"));
    }

    #[test]
    fn test_custom_catalog_needs_idle_and_unique_names() {
        let entries = vec![("wait".to_string(), 3), ("go".to_string(), 1)];
        let catalog = ActionCatalog::new(entries.clone(), "wait").unwrap();
        assert_eq!(catalog.idle_id(), 3);
        assert!(ActionCatalog::new(entries, "idle").is_none());
        let dupes = vec![("go".to_string(), 1), ("go".to_string(), 2)];
        assert!(ActionCatalog::new(dupes, "go").is_none());
    }
}
