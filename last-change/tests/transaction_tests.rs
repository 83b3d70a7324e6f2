//! Property-based tests for LastChange transaction semantics

use proptest::prelude::*;
use std::collections::BTreeMap;

use last_change::document::{decode, AV_TRANSPORT_NAMESPACE};
use last_change::{ChannelSink, CollectorError, LastChangeCollector};
use state_store::{VariableContainer, VariableId, VariableSpec};

static SPECS: [VariableSpec; 5] = [
    VariableSpec::evented("TransportState", "STOPPED"),
    VariableSpec::evented("AVTransportURI", ""),
    VariableSpec::evented("CurrentTrackDuration", "0:00:00"),
    VariableSpec::silent("RelativeTimePosition", "0:00:00"),
    VariableSpec::silent("LastChange", ""),
];

fn update_strategy() -> impl Strategy<Value = Vec<(u32, String)>> {
    proptest::collection::vec((0u32..SPECS.len() as u32, "[A-Za-z0-9:/&<> ]{0,12}"), 0..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A transaction produces at most one document, holding the final value
    /// of every event-worthy variable that changed during it
    #[test]
    fn prop_commit_emits_one_document_with_final_values(updates in update_strategy()) {
        let mut vars = VariableContainer::new(&SPECS);
        let (sink, rx) = ChannelSink::new();
        let collector = LastChangeCollector::attach(&mut vars, AV_TRANSPORT_NAMESPACE, sink);

        collector.start_transaction().unwrap();
        let mut expected: BTreeMap<u32, (String, String)> = BTreeMap::new();
        for (id, value) in &updates {
            let changed = vars.set(VariableId(*id), value.clone()).unwrap();
            if changed && SPECS[*id as usize].event_worthy {
                expected.insert(*id, (SPECS[*id as usize].name.to_string(), value.clone()));
            }
        }
        prop_assert!(rx.try_recv().is_err());

        collector.commit().unwrap();

        if expected.is_empty() {
            prop_assert!(rx.try_recv().is_err());
        } else {
            let event = rx.try_recv().unwrap();
            let got = decode(&event.document).unwrap();
            let want: Vec<(String, String)> = expected.into_values().collect();
            prop_assert_eq!(got, want);
            prop_assert!(rx.try_recv().is_err());
        }
    }

    /// Starting a transaction while one is open never succeeds
    #[test]
    fn prop_nested_start_always_fails(extra_attempts in 1usize..5) {
        let mut vars = VariableContainer::new(&SPECS);
        let (sink, _rx) = ChannelSink::new();
        let collector = LastChangeCollector::attach(&mut vars, AV_TRANSPORT_NAMESPACE, sink);

        collector.start_transaction().unwrap();
        for _ in 0..extra_attempts {
            prop_assert!(matches!(
                collector.start_transaction(),
                Err(CollectorError::TransactionAlreadyOpen)
            ));
        }
        collector.commit().unwrap();
        prop_assert!(collector.start_transaction().is_ok());
    }
}

#[test]
fn test_two_collectors_on_one_container() {
    let mut vars = VariableContainer::new(&SPECS);
    let (sink_a, rx_a) = ChannelSink::new();
    let (sink_b, rx_b) = ChannelSink::new();
    let a = LastChangeCollector::attach(&mut vars, "urn:a", sink_a);
    let _b = LastChangeCollector::attach(&mut vars, "urn:b", sink_b);

    a.start_transaction().unwrap();
    vars.set(VariableId(0), "PLAYING").unwrap();

    // b has no transaction open and reports immediately
    assert_eq!(rx_b.try_recv().unwrap().namespace, "urn:b");
    assert!(rx_a.try_recv().is_err());

    a.commit().unwrap();
    assert_eq!(rx_a.try_recv().unwrap().namespace, "urn:a");
}
