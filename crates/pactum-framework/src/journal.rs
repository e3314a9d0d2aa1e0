//! Append-only event journal

use chrono::Utc;
use pactum_types::{AgreementEvent, AgreementId, EventRecord};

#[derive(Debug, Default)]
pub struct EventJournal {
    records: Vec<EventRecord>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events in order and return their records
    pub fn append(&mut self, events: Vec<AgreementEvent>) -> Vec<EventRecord> {
        let recorded_at = Utc::now();
        let start = self.records.len();
        for event in events {
            let sequence = self.records.len() as u64 + 1;
            self.records.push(EventRecord {
                sequence,
                recorded_at,
                event,
            });
        }
        self.records[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with a sequence strictly greater than `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn for_agreement(&self, id: AgreementId) -> Vec<EventRecord> {
        self.records
            .iter()
            .filter(|record| record.event.agreement_id() == id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_and_since() {
        let mut journal = EventJournal::new();
        let first = journal.append(vec![AgreementEvent::AgreementFinalized { id: AgreementId(1) }]);
        let rest = journal.append(vec![
            AgreementEvent::AgreementFinalized { id: AgreementId(2) },
            AgreementEvent::AgreementFinalized { id: AgreementId(1) },
        ]);

        assert_eq!(first[0].sequence, 1);
        assert_eq!(rest.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(journal.since(1).len(), 2);
        assert_eq!(journal.since(3).len(), 0);
        assert_eq!(journal.since(99).len(), 0);
        assert_eq!(journal.for_agreement(AgreementId(1)).len(), 2);
    }
}
