/// Evaluated coverage: which properties / items of one instance value were
/// accounted for by successfully applied keywords. Consumed by
/// `unevaluatedProperties` and `unevaluatedItems`.
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluated {
    properties: BTreeSet<String>,
    all_properties: bool,
    all_items: bool,
}

impl Evaluated {
    pub fn mark_property(&mut self, name: &str) {
        if !self.all_properties {
            self.properties.insert(name.to_string());
        }
    }

    pub fn mark_all_properties(&mut self) {
        self.all_properties = true;
        self.properties.clear();
    }

    pub fn mark_all_items(&mut self) {
        self.all_items = true;
    }

    pub fn is_property_evaluated(&self, name: &str) -> bool {
        self.all_properties || self.properties.contains(name)
    }

    pub fn items_evaluated(&self) -> bool {
        self.all_items
    }

    pub fn merge(&mut self, other: Evaluated) {
        if other.all_properties {
            self.mark_all_properties();
        } else if !self.all_properties {
            self.properties.extend(other.properties);
        }
        self.all_items |= other.all_items;
    }
}
