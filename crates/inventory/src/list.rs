//! Sorted in-memory copy of the `inventory` collection.

use serde::Serialize;

use nightstocker_core::TireId;

use crate::ordering::record_cmp;
use crate::stock::StockSummary;
use crate::tire::TireRecord;

/// The inventory as displayed: always sorted by `name ++ size`.
///
/// The list is rebuilt from every full snapshot; it is never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InventoryList {
    records: Vec<TireRecord>,
}

impl InventoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = TireRecord>) -> Self {
        let mut records: Vec<TireRecord> = records.into_iter().collect();
        records.sort_by(record_cmp);
        Self { records }
    }

    pub fn records(&self) -> &[TireRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &TireRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: &TireId) -> Option<&TireRecord> {
        self.records.iter().find(|r| r.id_typed() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived statistics; never stored.
    pub fn summary(&self) -> StockSummary {
        StockSummary::of(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(id: &str, name: &str, size: &str, qty: u64) -> TireRecord {
        TireRecord::new(id.parse().unwrap(), name, size, qty)
    }

    #[test]
    fn records_are_sorted_by_name_then_size() {
        let list = InventoryList::from_records(vec![
            rec("a", "Michelin Agilis 51", "245/70R19.5", 10),
            rec("b", "bridgestone R268", "295/75R22.5", 2),
            rec("c", "Goodyear G622", "11R22.5", 0),
            rec("d", "Michelin Agilis 51", "225/70R19.5", 1),
        ]);

        let names: Vec<&str> = list.iter().map(|r| r.id_typed().as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let list = InventoryList::from_records(vec![
            rec("f", "Falken", "", 1),
            rec("e", "Énergy", "", 1),
            rec("z", "Zeta", "", 1),
        ]);

        let names: Vec<&str> = list.iter().map(TireRecord::name).collect();
        assert_eq!(names, vec!["Énergy", "Falken", "Zeta"]);
    }

    #[test]
    fn duplicate_name_and_size_are_both_kept() {
        let list = InventoryList::from_records(vec![
            rec("z", "Michelin", "245", 1),
            rec("y", "Michelin", "245", 2),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.records()[0].id_typed().as_str(), "y");
    }

    #[test]
    fn get_finds_by_id() {
        let list = InventoryList::from_records(vec![rec("a", "Michelin", "245", 4)]);
        assert_eq!(list.get(&"a".parse().unwrap()).unwrap().quantity(), 4);
        assert!(list.get(&"missing".parse().unwrap()).is_none());
    }

    proptest! {
        #[test]
        fn list_is_always_sorted(
            entries in proptest::collection::vec(("[A-Za-zÉéèÑñÖü ]{0,8}", "[0-9/R.]{0,6}", 0u64..50), 0..20)
        ) {
            let records = entries
                .iter()
                .enumerate()
                .map(|(i, (name, size, qty))| rec(&format!("id{i}"), name, size, *qty));
            let list = InventoryList::from_records(records);

            for pair in list.records().windows(2) {
                prop_assert_ne!(record_cmp(&pair[0], &pair[1]), core::cmp::Ordering::Greater);
            }
            prop_assert_eq!(list.len(), entries.len());
        }
    }
}
