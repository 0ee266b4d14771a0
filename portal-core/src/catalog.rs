use std::collections::HashMap;

use crate::structs::{DisplayNetwork, RawNetwork};

/// Collapses raw scan observations into one entry per SSID, strongest first.
///
/// An observation replaces the one already held for its SSID only when its
/// RSSI is strictly greater, so among equally strong duplicates the earliest
/// one wins. SSIDs are compared exactly (no trimming, case-sensitive).
pub fn consolidate<I>(networks: I) -> Vec<DisplayNetwork>
where
    I: IntoIterator<Item = RawNetwork>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut list: Vec<DisplayNetwork> = Vec::new();

    for raw in networks {
        match slots.get(&raw.ssid) {
            Some(&index) => {
                if raw.rssi > list[index].rssi {
                    list[index] = raw.into();
                }
            }
            None => {
                slots.insert(raw.ssid.clone(), list.len());
                list.push(raw.into());
            }
        }
    }

    // stable: equal RSSI keeps first-seen order
    list.sort_by(|a, b| b.rssi.cmp(&a.rssi));
    list
}
